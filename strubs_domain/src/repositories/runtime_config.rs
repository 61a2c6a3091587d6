// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime Config Store Port
//!
//! A tiny key/value store for the two runtime-config keys named in §6:
//! `verifyStartedAt` (the verifier's run identity, enabling resume across
//! restarts) and `lastVerify` (a summary of the most recently completed
//! run). Backed by the same metadata store engine in the reference
//! deployment, but declared as its own port since it is conceptually a
//! singleton config table, not object/volume metadata.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StrubsError;

/// Summary of the most recently completed verify run (§4.7 step 6).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LastVerifySummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checksum_errors: u64,
    pub total_errors: u64,
}

/// Runtime-config key/value port consumed by the verifier.
#[async_trait]
pub trait RuntimeConfigStore: Send + Sync {
    /// Reads the persisted `verifyStartedAt`, if a run is in progress or
    /// was interrupted before completion.
    async fn get_verify_started_at(&self) -> Result<Option<DateTime<Utc>>, StrubsError>;

    /// Persists `verifyStartedAt` at the start of a fresh run (§4.7 step 1).
    async fn set_verify_started_at(&self, started_at: DateTime<Utc>) -> Result<(), StrubsError>;

    /// Removes `verifyStartedAt` on successful run completion (§4.7 step 6);
    /// must not be called if the run was cancelled.
    async fn clear_verify_started_at(&self) -> Result<(), StrubsError>;

    /// Reads the last completed run's summary, if any.
    async fn get_last_verify(&self) -> Result<Option<LastVerifySummary>, StrubsError>;

    /// Persists a completed run's summary (§4.7 step 6).
    async fn set_last_verify(&self, summary: LastVerifySummary) -> Result<(), StrubsError>;
}
