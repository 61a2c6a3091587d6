// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Volume Record Entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::VolumeId;

/// Lifecycle state of a configured volume (§3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeState {
    Online,
    Draining,
    Offline,
}

impl VolumeState {
    /// Only `Online` volumes are eligible for new slice placement (§4.1).
    pub fn accepts_new_slices(self) -> bool {
        matches!(self, VolumeState::Online)
    }
}

/// Cumulative verify-error counters for one volume (§3, §4.7).
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct VerifyErrors {
    pub checksum: u64,
    pub total: u64,
}

/// A configured local block-device volume root (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub id: VolumeId,
    pub uuid: Uuid,
    pub mount_path: String,
    pub priority: i32,
    pub verify_errors: VerifyErrors,
    pub state: VolumeState,
}

impl VolumeRecord {
    pub fn new(id: VolumeId, uuid: Uuid, mount_path: impl Into<String>, priority: i32) -> Self {
        Self {
            id,
            uuid,
            mount_path: mount_path.into(),
            priority,
            verify_errors: VerifyErrors::default(),
            state: VolumeState::Online,
        }
    }

    /// Appends one verify result for this volume, counting a checksum
    /// failure in both `checksum` and `total`, and any other failure in
    /// `total` only (§4.7 step 4).
    pub fn record_verify_result(&mut self, is_checksum_error: bool) {
        if is_checksum_error {
            self.verify_errors.checksum += 1;
        }
        self.verify_errors.total += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_online_accepts_new_slices() {
        assert!(VolumeState::Online.accepts_new_slices());
        assert!(!VolumeState::Draining.accepts_new_slices());
        assert!(!VolumeState::Offline.accepts_new_slices());
    }

    #[test]
    fn records_checksum_and_total_together() {
        let mut volume = VolumeRecord::new(VolumeId::new(0), Uuid::new_v4(), "/mnt/v0", 0);
        volume.record_verify_result(true);
        assert_eq!(volume.verify_errors.checksum, 1);
        assert_eq!(volume.verify_errors.total, 1);
        volume.record_verify_result(false);
        assert_eq!(volume.verify_errors.checksum, 1);
        assert_eq!(volume.verify_errors.total, 2);
    }
}
