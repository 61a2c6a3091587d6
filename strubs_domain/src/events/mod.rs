// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Events
//!
//! Plain notifications the engine raises at significant lifecycle points
//! (§3's object/FileObject lifecycles). These map to the `FileObject`
//! stream events named in §6 (`data`, `end`, `error`, `drain`, `finish`,
//! `close`) plus verifier progress, flattened into one enum so a single
//! `tokio::sync::broadcast` channel can carry them to logging/metrics
//! subscribers without those subscribers depending on the write/read
//! pipeline types directly.

use chrono::{DateTime, Utc};

use crate::value_objects::ObjectId;

/// Notable occurrences raised by the engine for observers (logging,
/// metrics, management APIs) to subscribe to.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A write pipeline finished flushing all K+M slices and computing the
    /// final MD5 (§4.4 step 6).
    ObjectWriteFinished { id: ObjectId, size: u64 },
    /// An object was committed: metadata inserted, slices renamed live
    /// (§4.5).
    ObjectCommitted { id: ObjectId },
    /// An object (and its K+M slice files) was deleted (§4.5).
    ObjectDeleted { id: ObjectId },
    /// A read or write pipeline repaired a slice via Reed-Solomon
    /// reconstruction (§4.6 step 4).
    SliceRepaired { id: ObjectId, slice_index: u16 },
    /// A verify run started, resumed, or finished (§4.7).
    VerifyRunStarted { started_at: DateTime<Utc>, resumed: bool },
    VerifyRunFinished {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        checksum_errors: u64,
        total_errors: u64,
    },
    /// Periodic progress snapshot, emitted every 5s while a verify run is
    /// active (§4.7 step 7).
    VerifyProgress { objects_verified: u64, total_errors: u64 },
}
