// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object Record Entity
//!
//! The metadata-store representation of a stored object (§3). Containers
//! (directory-like path nodes) share the same record shape with
//! `is_container = true` and no slice data, per §9's note that the
//! container hierarchy is metadata-only.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ObjectId, VolumeId};

/// Per-slice error state recorded by the verifier (§3, §4.7).
///
/// `Checksum` marks a slice whose payload checksum failed to validate;
/// `Other` carries an opaque error string for I/O or header failures that
/// are not a checksum mismatch.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SliceErrorEntry {
    Checksum { checksum: bool },
    Other { err: String },
}

impl SliceErrorEntry {
    pub fn checksum() -> Self {
        Self::Checksum { checksum: true }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other { err: message.into() }
    }

    /// Whether this entry should increment a volume's `checksum` counter
    /// rather than only its `total` counter (§4.7 step 4).
    pub fn is_checksum(&self) -> bool {
        matches!(self, Self::Checksum { .. })
    }
}

/// The metadata record for a stored object or container (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub container_id: Option<ObjectId>,
    pub name: String,
    pub size: u64,
    pub mime: Option<String>,
    /// MD5 of the original plaintext byte stream (§3, invariant 4).
    pub md5: [u8; 16],
    pub chunk_size: u32,
    pub k: u16,
    pub m: u16,
    pub data_volumes: Vec<VolumeId>,
    pub parity_volumes: Vec<VolumeId>,
    /// Keyed by slice index as a string, matching the external metadata
    /// store's document shape (§3: `sliceIndex -> {...}`).
    pub slice_errors: Option<BTreeMap<u16, SliceErrorEntry>>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub is_container: bool,
    pub created_at: DateTime<Utc>,
}

impl ObjectRecord {
    /// Builds a fresh record for a just-committed object (§4.5 step 3).
    #[allow(clippy::too_many_arguments)]
    pub fn new_object(
        id: ObjectId,
        container_id: Option<ObjectId>,
        name: String,
        size: u64,
        mime: Option<String>,
        md5: [u8; 16],
        chunk_size: u32,
        k: u16,
        m: u16,
        data_volumes: Vec<VolumeId>,
        parity_volumes: Vec<VolumeId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            container_id,
            name,
            size,
            mime,
            md5,
            chunk_size,
            k,
            m,
            data_volumes,
            parity_volumes,
            slice_errors: None,
            last_verified_at: None,
            is_container: false,
            created_at,
        }
    }

    /// Builds a container record: path metadata only, no slices (§9).
    pub fn new_container(id: ObjectId, container_id: Option<ObjectId>, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            container_id,
            name,
            size: 0,
            mime: None,
            md5: [0u8; 16],
            chunk_size: 0,
            k: 0,
            m: 0,
            data_volumes: Vec::new(),
            parity_volumes: Vec::new(),
            slice_errors: None,
            last_verified_at: None,
            is_container: true,
            created_at,
        }
    }

    /// Total slice count, `K + M`.
    pub fn total_slices(&self) -> usize {
        self.k as usize + self.m as usize
    }

    /// The volume holding slice index `idx`, if this record has that many
    /// slices.
    pub fn volume_for_slice(&self, idx: u16) -> Option<VolumeId> {
        let i = idx as usize;
        if i < self.data_volumes.len() {
            self.data_volumes.get(i).copied()
        } else {
            self.parity_volumes.get(i - self.data_volumes.len()).copied()
        }
    }

    /// Hex representation of `md5`, used in HTTP `Content-MD5`/`ETag`
    /// headers by front-ends.
    pub fn md5_hex(&self) -> String {
        hex::encode(self.md5)
    }

    /// Whether this record needs (re)verification for a run started at
    /// `started_at` (§4.7 step 2: "treating null as -infinity").
    pub fn needs_verification(&self, started_at: DateTime<Utc>) -> bool {
        match self.last_verified_at {
            None => true,
            Some(t) => t < started_at,
        }
    }

    /// Records or clears a slice's error entry, merging into (or creating)
    /// `slice_errors`. A `None` entry clears that slice index on successful
    /// re-verify (§3: "cleared on successful re-verify of that slice").
    pub fn set_slice_error(&mut self, slice_index: u16, entry: Option<SliceErrorEntry>) {
        match entry {
            Some(e) => {
                self.slice_errors.get_or_insert_with(BTreeMap::new).insert(slice_index, e);
            }
            None => {
                if let Some(map) = self.slice_errors.as_mut() {
                    map.remove(&slice_index);
                    if map.is_empty() {
                        self.slice_errors = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObjectRecord {
        ObjectRecord::new_object(
            ObjectId::new(),
            None,
            "blob.bin".to_string(),
            1_000_000,
            Some("application/octet-stream".to_string()),
            [7u8; 16],
            65536,
            4,
            2,
            vec![VolumeId::new(0), VolumeId::new(1), VolumeId::new(2), VolumeId::new(3)],
            vec![VolumeId::new(4), VolumeId::new(5)],
            Utc::now(),
        )
    }

    #[test]
    fn needs_verification_when_never_verified() {
        let record = sample();
        assert!(record.needs_verification(Utc::now()));
    }

    #[test]
    fn needs_verification_compares_against_run_start() {
        let mut record = sample();
        let run_one = Utc::now();
        record.last_verified_at = Some(run_one);
        let run_two = run_one + chrono::Duration::seconds(1);
        assert!(record.needs_verification(run_two));
        assert!(!record.needs_verification(run_one - chrono::Duration::seconds(1)));
    }

    #[test]
    fn slice_error_set_and_clear() {
        let mut record = sample();
        record.set_slice_error(2, Some(SliceErrorEntry::checksum()));
        assert!(record.slice_errors.as_ref().unwrap().get(&2).unwrap().is_checksum());
        record.set_slice_error(2, None);
        assert!(record.slice_errors.is_none());
    }

    #[test]
    fn volume_for_slice_spans_data_and_parity() {
        let record = sample();
        assert_eq!(record.volume_for_slice(0), Some(VolumeId::new(0)));
        assert_eq!(record.volume_for_slice(4), Some(VolumeId::new(4)));
        assert_eq!(record.volume_for_slice(6), None);
    }

    #[test]
    fn container_has_no_slices() {
        let container = ObjectRecord::new_container(ObjectId::new(), None, "docs".to_string(), Utc::now());
        assert!(container.is_container);
        assert_eq!(container.total_slices(), 0);
    }
}
