// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metadata Store Port
//!
//! The key-value-ish document store holding `ObjectRecord`s and
//! `VolumeRecord`s (§6). Out of scope for this engine: the store's own
//! durability/replication. The engine treats it as a single serializable
//! resource and never opens a multi-object transaction against it (§5).
//!
//! # Design Principles
//!
//! - **Async-first**: every method crosses an I/O boundary.
//! - **`ENOENT` on miss**: lookups return `Option`, not an error; only
//!   commands that require an existing record (`update_object_verification_state`)
//!   surface `StrubsError::NotFound`.
//! - **No cross-object atomicity**: each method is one logical operation;
//!   callers (commit/delete, the verifier) sequence multiple calls
//!   themselves and handle partial failure per §4.5/§4.7.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{ObjectRecord, SliceErrorEntry, VolumeRecord};
use crate::error::StrubsError;
use crate::value_objects::{ObjectId, VolumeId};
use std::collections::BTreeMap;

/// Repository interface for object and volume metadata persistence.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Looks up an object (or container) record by id.
    async fn get_object_by_id(&self, id: ObjectId) -> Result<Option<ObjectRecord>, StrubsError>;

    /// Looks up a live (non-deleted) object by its full path, resolved
    /// through the container hierarchy by the caller.
    async fn get_object_by_path(&self, container_id: Option<ObjectId>, name: &str) -> Result<Option<ObjectRecord>, StrubsError>;

    /// Resolves (creating as needed) the container id for each path
    /// component in order, e.g. `["a", "b"]` ensures containers `a` then
    /// `a/b` exist and returns `b`'s id. Metadata-only; no on-disk
    /// counterpart (§9).
    async fn get_or_create_container(&self, path_components: &[String]) -> Result<ObjectId, StrubsError>;

    /// Inserts a freshly committed object record (§4.5 step 3). Fails if an
    /// object already exists at the same `(container_id, name)`.
    async fn insert_object(&self, record: &ObjectRecord) -> Result<(), StrubsError>;

    /// Removes an object record (§4.5 `delete()`). Returns `Ok(())` even if
    /// the id was already absent (delete idempotence, §8 property 5).
    async fn delete_object(&self, id: ObjectId) -> Result<(), StrubsError>;

    /// Fetches up to `limit` object records with `lastVerifiedAt < started_at`
    /// (treating `None` as `-infinity`), for one verifier batch (§4.7 step 2).
    async fn find_objects_needing_verification(&self, started_at: DateTime<Utc>, limit: usize) -> Result<Vec<ObjectRecord>, StrubsError>;

    /// Persists the result of verifying one object: its new
    /// `lastVerifiedAt` and updated `sliceErrors` map (§4.7 step 5).
    async fn update_object_verification_state(
        &self,
        id: ObjectId,
        last_verified_at: DateTime<Utc>,
        slice_errors: Option<BTreeMap<u16, SliceErrorEntry>>,
    ) -> Result<(), StrubsError>;

    /// Looks up a volume by id.
    async fn get_volume(&self, id: VolumeId) -> Result<Option<VolumeRecord>, StrubsError>;

    /// Lists every configured volume.
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, StrubsError>;

    /// Persists one volume's cumulative verify-error counters (§4.7 step 4).
    async fn set_volume_verify_errors(&self, volume_id: VolumeId, checksum: u64, total: u64) -> Result<(), StrubsError>;
}
