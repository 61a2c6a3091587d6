// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Logging
//!
//! One-time `tracing_subscriber` initialization (§4.11). The engine spans
//! each write/read pipeline request and verifier run with `tracing::info_span!`
//! at the call sites in `application`; this module only owns the
//! process-wide subscriber setup, mirroring the shape of
//! `strubs_bootstrap::logger`'s `ConsoleLogger` but at the `tracing`
//! subscriber layer rather than behind a trait object.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber reading `RUST_LOG` (falling back
/// to `default_filter` when unset), emitting JSON lines in production and
/// human-readable lines when `pretty` is requested (e.g. from an
/// interactive CLI invocation).
pub fn init(default_filter: &str, pretty: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if pretty {
        let _ = subscriber.with_target(false).try_init();
    } else {
        let _ = subscriber.json().try_init();
    }
}
