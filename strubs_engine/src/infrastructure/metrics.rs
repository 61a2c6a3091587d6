// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics
//!
//! A small `prometheus`-backed registry exposing the counters and gauges
//! named in §4.11: bytes written/read, per-volume slice checksum errors,
//! verifier progress, and in-flight write/read gauges. One registry is
//! built at bootstrap and shared (behind an `Arc`) across every request and
//! the verifier task.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use strubs_domain::error::StrubsError;

/// Process-wide metrics registry for the engine (§4.11).
pub struct EngineMetrics {
    registry: Registry,
    pub bytes_written_total: IntCounter,
    pub bytes_read_total: IntCounter,
    pub slice_checksum_errors_total: IntCounterVec,
    pub verifier_objects_verified_total: IntCounter,
    pub write_inflight: IntGauge,
    pub read_inflight: IntGauge,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, StrubsError> {
        let registry = Registry::new();

        let bytes_written_total = IntCounter::new("strubs_bytes_written_total", "total bytes accepted by the write pipeline")
            .map_err(metrics_err)?;
        let bytes_read_total =
            IntCounter::new("strubs_bytes_read_total", "total bytes emitted by the read pipeline").map_err(metrics_err)?;
        let slice_checksum_errors_total = IntCounterVec::new(
            Opts::new("strubs_slice_checksum_errors_total", "checksum failures observed per volume"),
            &["volume"],
        )
        .map_err(metrics_err)?;
        let verifier_objects_verified_total = IntCounter::new(
            "strubs_verifier_objects_verified_total",
            "objects fully verified by the background verifier",
        )
        .map_err(metrics_err)?;
        let write_inflight = IntGauge::new("strubs_write_inflight", "write pipelines currently open").map_err(metrics_err)?;
        let read_inflight = IntGauge::new("strubs_read_inflight", "read pipelines currently open").map_err(metrics_err)?;

        registry.register(Box::new(bytes_written_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(bytes_read_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(slice_checksum_errors_total.clone())).map_err(metrics_err)?;
        registry
            .register(Box::new(verifier_objects_verified_total.clone()))
            .map_err(metrics_err)?;
        registry.register(Box::new(write_inflight.clone())).map_err(metrics_err)?;
        registry.register(Box::new(read_inflight.clone())).map_err(metrics_err)?;

        Ok(Self {
            registry,
            bytes_written_total,
            bytes_read_total,
            slice_checksum_errors_total,
            verifier_objects_verified_total,
            write_inflight,
            read_inflight,
        })
    }

    /// Records one checksum failure against `volume_id`'s counter.
    pub fn record_checksum_error(&self, volume_id: u32) {
        self.slice_checksum_errors_total.with_label_values(&[&volume_id.to_string()]).inc();
    }

    /// Renders the registry in Prometheus text exposition format, for a
    /// `/metrics` endpoint front-ends may expose.
    pub fn render(&self) -> Result<String, StrubsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer).map_err(metrics_err)?;
        String::from_utf8(buffer).map_err(|e| StrubsError::internal(e.to_string()))
    }
}

fn metrics_err(err: impl std::fmt::Display) -> StrubsError {
    StrubsError::internal(format!("metrics error: {err}"))
}

pub type SharedMetrics = Arc<EngineMetrics>;
