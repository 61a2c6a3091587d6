// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Background Verifier
//!
//! Walks every stored object's `K+M` slices independently, recomputing
//! checksums and recording failures, without attempting Reed-Solomon
//! repair — repair is the read pipeline's job; the verifier's job is
//! detection and bookkeeping (§4.7). Resumable across restarts via
//! `verifyStartedAt`; cancellable mid-run by an external `clear_verify_started_at`
//! call, checked at each batch boundary.
//!
//! Grounded on `read_pipeline`'s positional `chunk_io`/`chunk_codec` use,
//! but deliberately simpler: one slice at a time, no cross-slice repair.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use strubs_domain::entities::{ObjectRecord, SliceErrorEntry};
use strubs_domain::error::StrubsError;
use strubs_domain::io_shutdown::IoShutdownToken;
use strubs_domain::repositories::{LastVerifySummary, MetadataStore, RuntimeConfigStore};
use strubs_domain::value_objects::{ChunkSize, ObjectId, Plan, VolumeId};
use strubs_domain::volume_registry::VolumeRegistry;

use crate::infrastructure::chunk_io::{self, SliceReader};
use crate::infrastructure::metrics::SharedMetrics;
use strubs_domain::chunk_codec;

/// Outcome of one complete (possibly resumed) verify run.
#[derive(Debug, Clone, Copy)]
pub struct VerifySummary {
    pub objects_verified: u64,
    pub checksum_errors: u64,
    pub total_errors: u64,
}

pub struct Verifier {
    metadata: Arc<dyn MetadataStore + Send + Sync>,
    runtime_config: Arc<dyn RuntimeConfigStore + Send + Sync>,
    volumes: Arc<VolumeRegistry>,
    metrics: SharedMetrics,
    shutdown: IoShutdownToken,
    batch_size: usize,
    progress_interval: Duration,
}

impl Verifier {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metadata: Arc<dyn MetadataStore + Send + Sync>,
        runtime_config: Arc<dyn RuntimeConfigStore + Send + Sync>,
        volumes: Arc<VolumeRegistry>,
        metrics: SharedMetrics,
        shutdown: IoShutdownToken,
        batch_size: usize,
        progress_interval: Duration,
    ) -> Self {
        Self {
            metadata,
            runtime_config,
            volumes,
            metrics,
            shutdown,
            batch_size,
            progress_interval,
        }
    }

    /// Runs (or resumes) one verify pass to completion: batches of up to
    /// `batch_size` objects via `find_objects_needing_verification`, until
    /// a batch comes back empty or the run is externally stopped (§4.7
    /// steps 1-6).
    pub async fn run(&self) -> Result<VerifySummary, StrubsError> {
        self.shutdown.throw_if_aborted()?;
        let started_at = match self.runtime_config.get_verify_started_at().await? {
            Some(existing) => existing,
            None => {
                let now = Utc::now();
                self.runtime_config.set_verify_started_at(now).await?;
                // Fresh run, not a resume: every volume's counters start
                // from zero (§4.7 step 1), else they accumulate forever
                // across runs instead of reflecting this pass alone.
                for volume in self.metadata.list_volumes().await? {
                    self.metadata.set_volume_verify_errors(volume.id, 0, 0).await?;
                }
                now
            }
        };

        let mut objects_verified = 0u64;
        let mut checksum_errors = 0u64;
        let mut total_errors = 0u64;
        let mut last_progress = Instant::now();
        let mut stopped_early = false;

        loop {
            self.shutdown.throw_if_aborted()?;
            let batch = self
                .metadata
                .find_objects_needing_verification(started_at, self.batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            for record in &batch {
                self.shutdown.throw_if_aborted()?;
                let (obj_checksum_errors, obj_total_errors) = self.verify_object(record, started_at).await?;
                checksum_errors += obj_checksum_errors;
                total_errors += obj_total_errors;
                objects_verified += 1;
                self.metrics.verifier_objects_verified_total.inc();

                if last_progress.elapsed() >= self.progress_interval {
                    tracing::info!(objects_verified, total_errors, "verify progress");
                    last_progress = Instant::now();
                }
            }

            // An external `verify stop` clears verifyStartedAt; notice it
            // at the batch boundary and wind down gracefully (§4.7 step 7).
            if self.runtime_config.get_verify_started_at().await? != Some(started_at) {
                stopped_early = true;
                break;
            }
        }

        let finished_at = Utc::now();
        let summary = LastVerifySummary {
            started_at,
            finished_at,
            checksum_errors,
            total_errors,
        };
        self.runtime_config.set_last_verify(summary).await?;
        if !stopped_early {
            self.runtime_config.clear_verify_started_at().await?;
        }

        Ok(VerifySummary {
            objects_verified,
            checksum_errors,
            total_errors,
        })
    }

    /// Verifies every slice of one object independently, persists the
    /// object's updated `sliceErrors`, and rolls the per-volume counters
    /// forward (§4.7 steps 3-4). `started_at` is the run's `verifyStartedAt`,
    /// recorded verbatim as `lastVerifiedAt` (§4.7 step 5) so a later
    /// `needs_verification` check ties an object to the run that covered it.
    async fn verify_object(&self, record: &ObjectRecord, started_at: DateTime<Utc>) -> Result<(u64, u64), StrubsError> {
        let candidates: Vec<VolumeId> = record.data_volumes.iter().chain(record.parity_volumes.iter()).copied().collect();
        let chunk_size = ChunkSize::new(record.chunk_size as usize)?;
        let plan = Plan::new(record.size, record.k, record.m, chunk_size, &candidates)?;

        let mut slice_errors: BTreeMap<u16, SliceErrorEntry> = BTreeMap::new();
        let mut checksum_errors = 0u64;
        let mut total_errors = 0u64;
        let mut per_volume_checksum: HashMap<VolumeId, u64> = HashMap::new();
        let mut per_volume_total: HashMap<VolumeId, u64> = HashMap::new();

        for slice_index in 0..plan.total_slices() as u16 {
            self.shutdown.throw_if_aborted()?;
            let volume_id = candidates[slice_index as usize];
            let mount_path = self.volumes.get(volume_id).map(|h| PathBuf::from(h.mount_path)).unwrap_or_default();
            let path = chunk_io::slice_path(&mount_path, record.id, slice_index);

            if let Some(entry) = verify_slice(&path, record.id, slice_index, &plan).await {
                total_errors += 1;
                *per_volume_total.entry(volume_id).or_default() += 1;
                if entry.is_checksum() {
                    checksum_errors += 1;
                    *per_volume_checksum.entry(volume_id).or_default() += 1;
                }
                slice_errors.insert(slice_index, entry);
            }
        }

        self.metadata
            .update_object_verification_state(
                record.id,
                started_at,
                if slice_errors.is_empty() { None } else { Some(slice_errors) },
            )
            .await?;

        for (volume_id, total_delta) in &per_volume_total {
            let checksum_delta = per_volume_checksum.get(volume_id).copied().unwrap_or(0);
            if let Some(volume) = self.metadata.get_volume(*volume_id).await? {
                self.metadata
                    .set_volume_verify_errors(
                        *volume_id,
                        volume.verify_errors.checksum + checksum_delta,
                        volume.verify_errors.total + total_delta,
                    )
                    .await?;
            }
            if checksum_delta > 0 {
                self.metrics.record_checksum_error(volume_id.value());
            }
        }

        Ok((checksum_errors, total_errors))
    }
}

/// Opens one slice file, validates its header, and re-verifies every
/// chunk's checksum against `plan`'s layout. Returns the error entry to
/// record against this slice, or `None` if it verified clean.
async fn verify_slice(path: &Path, object_id: ObjectId, slice_index: u16, plan: &Plan) -> Option<SliceErrorEntry> {
    let mut reader = match SliceReader::open(path.to_path_buf()).await {
        Ok(reader) => reader,
        Err(err) => return Some(SliceErrorEntry::other(err.to_string())),
    };

    let header = match reader.read_header().await {
        Ok(header) => header,
        Err(err) => return Some(SliceErrorEntry::other(err.to_string())),
    };
    if header.validate_against(object_id, slice_index).is_err() {
        return Some(SliceErrorEntry::checksum());
    }

    let d = plan.d() as usize;
    let last_len = plan.last_chunk_payload_len() as usize;
    for chunk_index in 0..plan.chunk_count {
        let is_last = chunk_index + 1 == plan.chunk_count;
        let hint = if is_last { last_len } else { d };
        match reader.read_chunk(chunk_index, d, hint).await {
            Ok((chunk_header, payload)) => {
                if chunk_codec::verify_chunk(&chunk_header, &payload, d, slice_index, 0).is_err() {
                    return Some(SliceErrorEntry::checksum());
                }
            }
            Err(err) => return Some(SliceErrorEntry::other(err.to_string())),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicU64, Ordering};
    use strubs_domain::entities::VolumeRecord;
    use strubs_domain::value_objects::{ChunkSize as CS, ObjectId as OID, VolumeId as VID};
    use tempfile::tempdir;
    use tokio::sync::Mutex as AsyncMutex;

    use crate::file_object::write_pipeline::WritePipeline;
    use crate::infrastructure::metrics::EngineMetrics;

    struct FakeStore {
        objects: AsyncMutex<HashMap<OID, ObjectRecord>>,
        volumes: AsyncMutex<HashMap<VID, VolumeRecord>>,
        verify_started_at: AsyncMutex<Option<DateTime<Utc>>>,
        last_verify: AsyncMutex<Option<LastVerifySummary>>,
        stop_after: AtomicU64,
        updates_seen: AtomicU64,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                objects: AsyncMutex::new(HashMap::new()),
                volumes: AsyncMutex::new(HashMap::new()),
                verify_started_at: AsyncMutex::new(None),
                last_verify: AsyncMutex::new(None),
                stop_after: AtomicU64::new(u64::MAX),
                updates_seen: AtomicU64::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl MetadataStore for FakeStore {
        async fn get_object_by_id(&self, id: OID) -> Result<Option<ObjectRecord>, StrubsError> {
            Ok(self.objects.lock().await.get(&id).cloned())
        }
        async fn get_object_by_path(&self, _container_id: Option<OID>, _name: &str) -> Result<Option<ObjectRecord>, StrubsError> {
            Ok(None)
        }
        async fn get_or_create_container(&self, _path_components: &[String]) -> Result<OID, StrubsError> {
            Ok(OID::new())
        }
        async fn insert_object(&self, record: &ObjectRecord) -> Result<(), StrubsError> {
            self.objects.lock().await.insert(record.id, record.clone());
            Ok(())
        }
        async fn delete_object(&self, id: OID) -> Result<(), StrubsError> {
            self.objects.lock().await.remove(&id);
            Ok(())
        }
        async fn find_objects_needing_verification(&self, started_at: DateTime<Utc>, limit: usize) -> Result<Vec<ObjectRecord>, StrubsError> {
            self.updates_seen.fetch_add(1, Ordering::SeqCst);
            if self.updates_seen.load(Ordering::SeqCst) > self.stop_after.load(Ordering::SeqCst) {
                return Ok(Vec::new());
            }
            let objects = self.objects.lock().await;
            Ok(objects
                .values()
                .filter(|o| o.needs_verification(started_at))
                .take(limit)
                .cloned()
                .collect())
        }
        async fn update_object_verification_state(
            &self,
            id: OID,
            last_verified_at: DateTime<Utc>,
            slice_errors: Option<BTreeMap<u16, SliceErrorEntry>>,
        ) -> Result<(), StrubsError> {
            let mut objects = self.objects.lock().await;
            let record = objects.get_mut(&id).ok_or_else(|| StrubsError::not_found("missing"))?;
            record.last_verified_at = Some(last_verified_at);
            record.slice_errors = slice_errors;
            Ok(())
        }
        async fn get_volume(&self, id: VID) -> Result<Option<VolumeRecord>, StrubsError> {
            Ok(self.volumes.lock().await.get(&id).cloned())
        }
        async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, StrubsError> {
            Ok(self.volumes.lock().await.values().cloned().collect())
        }
        async fn set_volume_verify_errors(&self, volume_id: VID, checksum: u64, total: u64) -> Result<(), StrubsError> {
            if let Some(volume) = self.volumes.lock().await.get_mut(&volume_id) {
                volume.verify_errors.checksum = checksum;
                volume.verify_errors.total = total;
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl RuntimeConfigStore for FakeStore {
        async fn get_verify_started_at(&self) -> Result<Option<DateTime<Utc>>, StrubsError> {
            Ok(*self.verify_started_at.lock().await)
        }
        async fn set_verify_started_at(&self, started_at: DateTime<Utc>) -> Result<(), StrubsError> {
            *self.verify_started_at.lock().await = Some(started_at);
            Ok(())
        }
        async fn clear_verify_started_at(&self) -> Result<(), StrubsError> {
            *self.verify_started_at.lock().await = None;
            Ok(())
        }
        async fn get_last_verify(&self) -> Result<Option<LastVerifySummary>, StrubsError> {
            Ok(self.last_verify.lock().await.clone())
        }
        async fn set_last_verify(&self, summary: LastVerifySummary) -> Result<(), StrubsError> {
            *self.last_verify.lock().await = Some(summary);
            Ok(())
        }
    }

    async fn write_one_object(dir: &Path, data: &[u8], k: u16, m: u16) -> ObjectRecord {
        let volumes: Vec<VID> = (0..(k + m) as u32).map(VID::new).collect();
        let plan = Plan::new(data.len() as u64, k, m, CS::new(128).unwrap(), &volumes).unwrap();
        let id = OID::new();
        let dir_buf = dir.to_path_buf();
        let mut pipeline = WritePipeline::create(id, plan, move |_v| dir_buf.clone(), IoShutdownToken::new())
            .await
            .unwrap();
        pipeline.write(data).await.unwrap();
        let finish = pipeline.end().await.unwrap();
        for (temp, final_path) in pipeline.slice_paths() {
            chunk_io::commit_rename(temp, final_path).await.unwrap();
        }
        ObjectRecord::new_object(
            id,
            None,
            "obj.bin".to_string(),
            finish.size,
            None,
            finish.md5,
            128,
            k,
            m,
            volumes[..k as usize].to_vec(),
            volumes[k as usize..].to_vec(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn verifies_one_clean_object_with_no_errors() {
        let dir = tempdir().unwrap();
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let record = write_one_object(dir.path(), &data, 4, 2).await;

        let store = Arc::new(FakeStore::new());
        store.objects.lock().await.insert(record.id, record.clone());
        for i in 0..6u32 {
            store.volumes.lock().await.insert(VID::new(i), VolumeRecord::new(VID::new(i), uuid::Uuid::new_v4(), "/mnt", 0));
        }
        let registry = Arc::new(VolumeRegistry::new());
        let dir_path = dir.path().to_str().unwrap().to_string();
        for i in 0..6u32 {
            registry.register(VID::new(i), dir_path.clone(), 0);
        }

        let metrics = Arc::new(EngineMetrics::new().unwrap());
        let verifier = Verifier::new(
            store.clone(),
            store.clone(),
            registry,
            metrics,
            IoShutdownToken::new(),
            25,
            Duration::from_secs(5),
        );
        let summary = verifier.run().await.unwrap();
        assert_eq!(summary.objects_verified, 1);
        assert_eq!(summary.total_errors, 0);

        let updated = store.objects.lock().await.get(&record.id).cloned().unwrap();
        assert!(updated.last_verified_at.is_some());
        assert!(updated.slice_errors.is_none());
    }

    #[tokio::test]
    async fn records_a_checksum_error_for_a_corrupted_slice() {
        let dir = tempdir().unwrap();
        let d = 128 - strubs_domain::chunk_codec::CHUNK_HEADER_SIZE;
        let size = (d as u64) * 4 * 2 + 13;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let record = write_one_object(dir.path(), &data, 4, 2).await;

        let slice_path = chunk_io::slice_path(dir.path(), record.id, 0);
        let mut bytes = std::fs::read(&slice_path).unwrap();
        let header_size = strubs_domain::chunk_codec::FILE_HEADER_SIZE;
        bytes[header_size + strubs_domain::chunk_codec::CHUNK_HEADER_SIZE] ^= 0xFF;
        std::fs::write(&slice_path, bytes).unwrap();

        let store = Arc::new(FakeStore::new());
        store.objects.lock().await.insert(record.id, record.clone());
        for i in 0..6u32 {
            store.volumes.lock().await.insert(VID::new(i), VolumeRecord::new(VID::new(i), uuid::Uuid::new_v4(), "/mnt", 0));
        }
        let registry = Arc::new(VolumeRegistry::new());
        let dir_path = dir.path().to_str().unwrap().to_string();
        for i in 0..6u32 {
            registry.register(VID::new(i), dir_path.clone(), 0);
        }

        let metrics = Arc::new(EngineMetrics::new().unwrap());
        let verifier = Verifier::new(
            store.clone(),
            store.clone(),
            registry,
            metrics,
            IoShutdownToken::new(),
            25,
            Duration::from_secs(5),
        );
        let summary = verifier.run().await.unwrap();
        assert_eq!(summary.checksum_errors, 1);
        assert_eq!(summary.total_errors, 1);

        let volume0 = store.volumes.lock().await.get(&VID::new(0)).cloned().unwrap();
        assert_eq!(volume0.verify_errors.checksum, 1);
    }

    #[tokio::test]
    async fn needs_verification_treats_missing_timestamp_as_due() {
        let record = write_one_object(tempdir().unwrap().path(), b"x", 4, 2).await;
        assert!(record.needs_verification(Utc::now()));
        let mut verified = record.clone();
        verified.last_verified_at = Some(Utc::now() + ChronoDuration::seconds(10));
        assert!(!verified.needs_verification(Utc::now()));
    }
}
