// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Volume Registry
//!
//! In-memory tracking of every configured volume's liveness, free space,
//! and I/O queue depth (§2 component 1). Block-device enumeration and
//! SMART monitoring that populate this registry are out of scope (§1); this
//! module only holds the resulting state and answers the one question the
//! rest of the engine needs from it: "give me `K+M` volumes to plan onto".
//!
//! Planning preference order, per §4.1: lowest queue depth, then
//! least-full (most free space), then round-robin among ties.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::entities::VolumeState;
use crate::error::StrubsError;
use crate::value_objects::VolumeId;

/// In-memory liveness/capacity/admission state for one volume.
#[derive(Debug, Clone)]
pub struct VolumeHandle {
    pub id: VolumeId,
    pub mount_path: String,
    pub free_bytes: u64,
    pub queue_depth: u32,
    pub state: VolumeState,
}

struct Inner {
    volumes: HashMap<VolumeId, VolumeHandle>,
    round_robin_cursor: usize,
}

/// Thread-safe registry of every configured volume.
///
/// All mutation goes through a single `parking_lot::Mutex`; the registry is
/// consulted far more often than it is updated (one plan call per write,
/// vs. periodic liveness/free-space refreshes), so a plain mutex
/// outperforms more elaborate concurrency schemes here.
pub struct VolumeRegistry {
    inner: Mutex<Inner>,
}

impl VolumeRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                volumes: HashMap::new(),
                round_robin_cursor: 0,
            }),
        }
    }

    /// Registers or replaces a volume's static identity and initial
    /// capacity, as reported by the (out-of-scope) block-device discovery
    /// collaborator.
    pub fn register(&self, id: VolumeId, mount_path: impl Into<String>, free_bytes: u64) {
        let mut inner = self.inner.lock();
        inner.volumes.insert(
            id,
            VolumeHandle {
                id,
                mount_path: mount_path.into(),
                free_bytes,
                queue_depth: 0,
                state: VolumeState::Online,
            },
        );
    }

    pub fn set_state(&self, id: VolumeId, state: VolumeState) {
        if let Some(handle) = self.inner.lock().volumes.get_mut(&id) {
            handle.state = state;
        }
    }

    pub fn set_free_bytes(&self, id: VolumeId, free_bytes: u64) {
        if let Some(handle) = self.inner.lock().volumes.get_mut(&id) {
            handle.free_bytes = free_bytes;
        }
    }

    /// Call when admitting one I/O to a volume; paired with `end_io`.
    pub fn begin_io(&self, id: VolumeId) {
        if let Some(handle) = self.inner.lock().volumes.get_mut(&id) {
            handle.queue_depth += 1;
        }
    }

    pub fn end_io(&self, id: VolumeId) {
        if let Some(handle) = self.inner.lock().volumes.get_mut(&id) {
            handle.queue_depth = handle.queue_depth.saturating_sub(1);
        }
    }

    pub fn get(&self, id: VolumeId) -> Option<VolumeHandle> {
        self.inner.lock().volumes.get(&id).cloned()
    }

    pub fn all(&self) -> Vec<VolumeHandle> {
        self.inner.lock().volumes.values().cloned().collect()
    }

    /// Selects `needed` distinct online volumes for a new plan, preferring
    /// low queue depth, then least-full (most free space), then
    /// round-robin among remaining ties (§4.1). Fails with `ENOVOLUMES` if
    /// fewer than `needed` volumes are online.
    pub fn candidate_volumes(&self, needed: usize) -> Result<Vec<VolumeId>, StrubsError> {
        let mut inner = self.inner.lock();
        let mut online: Vec<&VolumeHandle> = inner.volumes.values().filter(|v| v.state.accepts_new_slices()).collect();
        if online.len() < needed {
            return Err(StrubsError::NoVolumes {
                needed,
                available: online.len(),
            });
        }

        // Stable-sort by (queue_depth asc, free_bytes desc); ids are then
        // rotated by the round-robin cursor to break remaining ties evenly
        // across calls rather than always favoring the lowest volume id.
        online.sort_by(|a, b| a.queue_depth.cmp(&b.queue_depth).then(b.free_bytes.cmp(&a.free_bytes)));

        let len = online.len();
        let cursor = inner.round_robin_cursor % len;
        let rotated: Vec<VolumeId> = online
            .iter()
            .cycle()
            .skip(cursor)
            .take(len)
            .map(|v| v.id)
            .collect();
        inner.round_robin_cursor = (cursor + 1) % len;

        Ok(rotated.into_iter().take(needed).collect())
    }
}

impl Default for VolumeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(n: u32) -> VolumeRegistry {
        let registry = VolumeRegistry::new();
        for i in 0..n {
            registry.register(VolumeId::new(i), format!("/mnt/v{i}"), 1_000_000);
        }
        registry
    }

    #[test]
    fn fails_when_not_enough_online_volumes() {
        let registry = registry_with(3);
        let err = registry.candidate_volumes(4).unwrap_err();
        assert_eq!(err.code(), "ENOVOLUMES");
    }

    #[test]
    fn excludes_offline_volumes() {
        let registry = registry_with(4);
        registry.set_state(VolumeId::new(0), VolumeState::Offline);
        let candidates = registry.candidate_volumes(3).unwrap();
        assert!(!candidates.contains(&VolumeId::new(0)));
    }

    #[test]
    fn prefers_lower_queue_depth() {
        let registry = registry_with(4);
        registry.begin_io(VolumeId::new(0));
        registry.begin_io(VolumeId::new(0));
        let candidates = registry.candidate_volumes(4).unwrap();
        assert_eq!(candidates.last().copied(), Some(VolumeId::new(0)));
    }

    #[test]
    fn prefers_more_free_space_among_equal_queue_depth() {
        let registry = registry_with(3);
        registry.set_free_bytes(VolumeId::new(1), 5_000_000);
        let candidates = registry.candidate_volumes(3).unwrap();
        assert_eq!(candidates[0], VolumeId::new(1));
    }

    #[test]
    fn round_robins_among_full_ties() {
        let registry = registry_with(3);
        let first = registry.candidate_volumes(3).unwrap();
        let second = registry.candidate_volumes(3).unwrap();
        assert_ne!(first[0], second[0]);
    }
}
