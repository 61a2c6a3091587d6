// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Size Value Object
//!
//! `chunkSize` bounds every chunk written to a slice file; the usable payload
//! capacity per chunk is `chunkSize - CHUNK_HEADER_SIZE` (§4.1's `D`). A
//! `ChunkSize` can never be constructed small enough to leave zero payload
//! capacity, so `Plan` and `chunk_codec` never need to re-check that
//! invariant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk_codec::CHUNK_HEADER_SIZE;
use crate::error::StrubsError;

/// Smallest chunk size that leaves at least one byte of payload capacity
/// after the chunk header.
pub const MIN_CHUNK_SIZE: usize = CHUNK_HEADER_SIZE + 1;

/// Largest chunk size accepted; bounds per-stripe memory (`K * chunkSize`)
/// at a sane ceiling for the in-memory stripe buffer.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Deployment default, matching the size used in worked examples (§8 S1).
pub const DEFAULT_CHUNK_SIZE: usize = 65_536;

/// A validated `chunkSize`, in bytes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ChunkSize(usize);

impl ChunkSize {
    /// Validates and constructs a `ChunkSize`.
    pub fn new(bytes: usize) -> Result<Self, StrubsError> {
        if bytes < MIN_CHUNK_SIZE {
            return Err(StrubsError::InvalidPlan(format!(
                "chunk size {bytes} is below the minimum of {MIN_CHUNK_SIZE} bytes"
            )));
        }
        if bytes > MAX_CHUNK_SIZE {
            return Err(StrubsError::InvalidPlan(format!(
                "chunk size {bytes} exceeds the maximum of {MAX_CHUNK_SIZE} bytes"
            )));
        }
        Ok(Self(bytes))
    }

    pub fn default_size() -> Self {
        Self(DEFAULT_CHUNK_SIZE)
    }

    pub fn as_bytes(self) -> usize {
        self.0
    }

    /// `D`: the payload capacity of one chunk.
    pub fn payload_capacity(self) -> usize {
        self.0 - CHUNK_HEADER_SIZE
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::default_size()
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = StrubsError;

    fn try_from(bytes: usize) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}
