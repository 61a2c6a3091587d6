// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Plan Value Object
//!
//! Pure computation of an object's storage shape (§4.1): given `fileSize`,
//! `K`, `M`, and `chunkSize`, derive `sliceDataSize`, `chunkCount`,
//! `sliceSize`, and the list of volumes the K+M slices will live on. A
//! `Plan` never performs I/O; volume selection is handed a pre-ranked slice
//! of candidate volume ids by the caller (the volume registry) and only
//! picks the first `K+M` of them.

use serde::{Deserialize, Serialize};

use crate::chunk_codec::{CHUNK_HEADER_SIZE, FILE_HEADER_SIZE};
use crate::error::StrubsError;
use crate::value_objects::{ChunkSize, VolumeId};

/// The computed storage shape for one object.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub file_size: u64,
    pub k: u16,
    pub m: u16,
    pub chunk_size: ChunkSize,
    pub slice_data_size: u64,
    pub chunk_count: u32,
    pub slice_size: u64,
    pub data_volumes: Vec<VolumeId>,
    pub parity_volumes: Vec<VolumeId>,
}

impl Plan {
    /// Computes the shape of an object's storage from its size and erasure
    /// parameters, then assigns it to `candidate_volumes` (already ranked by
    /// the volume registry: low queue depth, then least-full, then
    /// round-robin, per §4.1).
    ///
    /// Fails with `ENOVOLUMES` if fewer than `K+M` candidates are given.
    pub fn new(
        file_size: u64,
        k: u16,
        m: u16,
        chunk_size: ChunkSize,
        candidate_volumes: &[VolumeId],
    ) -> Result<Self, StrubsError> {
        if k == 0 {
            return Err(StrubsError::InvalidPlan("K must be at least 1".to_string()));
        }
        let needed = k as usize + m as usize;
        if candidate_volumes.len() < needed {
            return Err(StrubsError::NoVolumes {
                needed,
                available: candidate_volumes.len(),
            });
        }

        let slice_data_size = if file_size == 0 {
            0
        } else {
            file_size.div_ceil(k as u64)
        };

        let d = chunk_size.payload_capacity() as u64;
        let chunk_count = if slice_data_size == 0 {
            0
        } else {
            slice_data_size.div_ceil(d) as u32
        };

        let slice_size = FILE_HEADER_SIZE as u64
            + slice_data_size
            + chunk_count as u64 * CHUNK_HEADER_SIZE as u64;

        let data_volumes = candidate_volumes[..k as usize].to_vec();
        let parity_volumes = candidate_volumes[k as usize..needed].to_vec();

        Ok(Self {
            file_size,
            k,
            m,
            chunk_size,
            slice_data_size,
            chunk_count,
            slice_size,
            data_volumes,
            parity_volumes,
        })
    }

    /// `D`: usable payload bytes per chunk.
    pub fn d(&self) -> u64 {
        self.chunk_size.payload_capacity() as u64
    }

    /// Total slice count, `K + M`.
    pub fn total_slices(&self) -> usize {
        self.k as usize + self.m as usize
    }

    /// The volume a given slice index (0-based, data then parity) is
    /// assigned to.
    pub fn volume_for_slice(&self, slice_index: u16) -> Option<VolumeId> {
        let idx = slice_index as usize;
        if idx < self.data_volumes.len() {
            self.data_volumes.get(idx).copied()
        } else {
            self.parity_volumes.get(idx - self.data_volumes.len()).copied()
        }
    }

    /// Length in bytes of the final (possibly short) chunk's payload on a
    /// data slice, used by the write pipeline to truncate the last chunk
    /// written to disk while still zero-padding the RS stripe (§4.4 step 5).
    pub fn last_chunk_payload_len(&self) -> u64 {
        if self.chunk_count == 0 {
            return 0;
        }
        let full_chunks_bytes = (self.chunk_count as u64 - 1) * self.d();
        self.slice_data_size - full_chunks_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volumes(n: u32) -> Vec<VolumeId> {
        (0..n).map(VolumeId::new).collect()
    }

    #[test]
    fn empty_file_has_zero_shape() {
        let plan = Plan::new(0, 4, 2, ChunkSize::default_size(), &volumes(6)).unwrap();
        assert_eq!(plan.slice_data_size, 0);
        assert_eq!(plan.chunk_count, 0);
        assert_eq!(plan.slice_size, FILE_HEADER_SIZE as u64);
    }

    #[test]
    fn million_byte_file_k4_m2() {
        let plan = Plan::new(1_000_000, 4, 2, ChunkSize::default_size(), &volumes(6)).unwrap();
        assert_eq!(plan.slice_data_size, 250_000);
        let d = plan.d();
        assert_eq!(plan.chunk_count as u64, 250_000u64.div_ceil(d));
        assert_eq!(plan.data_volumes.len(), 4);
        assert_eq!(plan.parity_volumes.len(), 2);
    }

    #[test]
    fn fails_without_enough_volumes() {
        let err = Plan::new(1024, 4, 2, ChunkSize::default_size(), &volumes(5)).unwrap_err();
        assert_eq!(err.code(), "ENOVOLUMES");
    }

    #[test]
    fn volume_for_slice_maps_data_then_parity() {
        let plan = Plan::new(1024, 2, 1, ChunkSize::default_size(), &volumes(3)).unwrap();
        assert_eq!(plan.volume_for_slice(0), Some(VolumeId::new(0)));
        assert_eq!(plan.volume_for_slice(1), Some(VolumeId::new(1)));
        assert_eq!(plan.volume_for_slice(2), Some(VolumeId::new(2)));
        assert_eq!(plan.volume_for_slice(3), None);
    }

    #[test]
    fn last_chunk_payload_len_is_short_remainder() {
        let plan = Plan::new(1_000_000, 4, 2, ChunkSize::default_size(), &volumes(6)).unwrap();
        let d = plan.d();
        let expected = plan.slice_data_size - (plan.chunk_count as u64 - 1) * d;
        assert_eq!(plan.last_chunk_payload_len(), expected);
        assert!(plan.last_chunk_payload_len() <= d);
    }
}
