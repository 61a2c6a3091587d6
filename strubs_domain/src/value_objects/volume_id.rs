// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Volume Identifier Value Object
//!
//! Volumes are configured once per deployment and referenced everywhere by a
//! small integer id (§3: "id (small int)"), not a ULID — there are at most a
//! few dozen volumes per host, and the id doubles as a dense array index in
//! the volume registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Small-integer volume identifier, stable for the lifetime of a
/// deployment.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct VolumeId(u32);

impl VolumeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Usable as a dense index into a `Vec` of volumes.
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for VolumeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<VolumeId> for u32 {
    fn from(id: VolumeId) -> Self {
        id.0
    }
}
