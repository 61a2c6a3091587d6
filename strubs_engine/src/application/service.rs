// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `StrubsService`
//!
//! The single orchestrator behind `put`/`get`/`delete`/`verify` (§4.4-§4.7):
//! resolves a request path against the container hierarchy, drives
//! [`crate::file_object::write_pipeline`]/[`crate::file_object::read_pipeline`],
//! and persists the result through the `MetadataStore` port. Presentation
//! (`strubs-bootstrap`'s CLI) talks only to this type.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use strubs_domain::entities::ObjectRecord;
use strubs_domain::error::StrubsError;
use strubs_domain::io_shutdown::IoShutdownToken;
use strubs_domain::repositories::{MetadataStore, RuntimeConfigStore};
use strubs_domain::value_objects::{ChunkSize, ObjectId, Plan, VolumeId};
use strubs_domain::volume_registry::VolumeRegistry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::commands::{
    DeleteObjectCommand, DeleteObjectResult, GetObjectCommand, GetObjectResult, PutObjectCommand, PutObjectResult,
};
use super::verifier::Verifier;
use crate::file_object::read_pipeline::ReadPipeline;
use crate::file_object::write_pipeline::WritePipeline;
use crate::infrastructure::chunk_io;
use crate::infrastructure::commit;
use crate::infrastructure::metrics::SharedMetrics;

/// Read/write buffer size used when streaming a local file into the write
/// pipeline; unrelated to the slice chunk size (§4.4).
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

pub struct StrubsService {
    metadata: Arc<dyn MetadataStore + Send + Sync>,
    runtime_config: Arc<dyn RuntimeConfigStore + Send + Sync>,
    volumes: Arc<VolumeRegistry>,
    metrics: SharedMetrics,
    shutdown: IoShutdownToken,
    default_k: u16,
    default_m: u16,
    default_chunk_size: ChunkSize,
    verifier_batch_size: usize,
    verifier_progress_interval: Duration,
}

impl StrubsService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metadata: Arc<dyn MetadataStore + Send + Sync>,
        runtime_config: Arc<dyn RuntimeConfigStore + Send + Sync>,
        volumes: Arc<VolumeRegistry>,
        metrics: SharedMetrics,
        shutdown: IoShutdownToken,
        default_k: u16,
        default_m: u16,
        default_chunk_size: ChunkSize,
        verifier_batch_size: usize,
        verifier_progress_interval: Duration,
    ) -> Self {
        Self {
            metadata,
            runtime_config,
            volumes,
            metrics,
            shutdown,
            default_k,
            default_m,
            default_chunk_size,
            verifier_batch_size,
            verifier_progress_interval,
        }
    }

    /// Stores a new object at `cmd.path` (§4.4). The object's size must be
    /// known before a `Plan` can be built, so a `None` input (stdin) is
    /// buffered in full first; a file input is streamed without buffering
    /// the whole object.
    pub async fn put(&self, cmd: PutObjectCommand) -> Result<PutObjectResult, StrubsError> {
        self.shutdown.throw_if_aborted()?;
        let (components, name) = split_path(&cmd.path);
        let container_id = if components.is_empty() {
            None
        } else {
            Some(self.metadata.get_or_create_container(&components).await?)
        };

        let k = cmd.k.unwrap_or(self.default_k);
        let m = cmd.m.unwrap_or(self.default_m);
        let chunk_size = match cmd.chunk_size {
            Some(bytes) => ChunkSize::new(bytes)?,
            None => self.default_chunk_size,
        };
        let candidates = self.volumes.candidate_volumes(k as usize + m as usize)?;

        self.metrics.write_inflight.inc();
        let result = self.put_inner(cmd, container_id, name, k, m, chunk_size, candidates).await;
        self.metrics.write_inflight.dec();
        result
    }

    async fn put_inner(
        &self,
        cmd: PutObjectCommand,
        container_id: Option<ObjectId>,
        name: String,
        k: u16,
        m: u16,
        chunk_size: ChunkSize,
        candidates: Vec<VolumeId>,
    ) -> Result<PutObjectResult, StrubsError> {
        let id = ObjectId::new();

        let (plan, mut pipeline) = match cmd.input {
            Some(path) => {
                let mut file = tokio::fs::File::open(&path).await.map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
                let size = file
                    .metadata()
                    .await
                    .map_err(|e| StrubsError::io(0, 0, e.to_string()))?
                    .len();
                let plan = Plan::new(size, k, m, chunk_size, &candidates)?;
                let mut pipeline = self.open_write_pipeline(id, plan.clone()).await?;

                let mut buf = vec![0u8; STREAM_BUFFER_SIZE];
                loop {
                    let n = file.read(&mut buf).await.map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
                    if n == 0 {
                        break;
                    }
                    if !pipeline.write(&buf[..n]).await? {
                        tokio::task::yield_now().await;
                    }
                }
                (plan, pipeline)
            }
            None => {
                let mut data = Vec::new();
                tokio::io::stdin()
                    .read_to_end(&mut data)
                    .await
                    .map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
                let plan = Plan::new(data.len() as u64, k, m, chunk_size, &candidates)?;
                let mut pipeline = self.open_write_pipeline(id, plan.clone()).await?;
                for piece in data.chunks(STREAM_BUFFER_SIZE) {
                    if !pipeline.write(piece).await? {
                        tokio::task::yield_now().await;
                    }
                }
                (plan, pipeline)
            }
        };

        let finish = match pipeline.end().await {
            Ok(finish) => finish,
            Err(err) => {
                let _ = pipeline.cleanup_temp_files().await;
                return Err(err);
            }
        };

        if let Err(err) = commit::commit_slices(&pipeline.slice_paths()).await {
            return Err(err);
        }

        let record = ObjectRecord::new_object(
            id,
            container_id,
            name,
            finish.size,
            None,
            finish.md5,
            chunk_size.as_bytes() as u32,
            k,
            m,
            plan.data_volumes.clone(),
            plan.parity_volumes.clone(),
            Utc::now(),
        );

        if let Err(err) = self.metadata.insert_object(&record).await {
            let final_paths: Vec<PathBuf> = pipeline.slice_paths().into_iter().map(|(_, final_path)| final_path).collect();
            let _ = commit::delete_slices(&final_paths).await;
            return Err(err);
        }

        self.metrics.bytes_written_total.inc_by(finish.size);

        Ok(PutObjectResult {
            id: id.to_string(),
            size: finish.size,
            md5_hex: record.md5_hex(),
        })
    }

    async fn open_write_pipeline(&self, id: ObjectId, plan: Plan) -> Result<WritePipeline, StrubsError> {
        let volumes = self.volumes.clone();
        WritePipeline::create(
            id,
            plan,
            move |vol_id| volumes.get(vol_id).map(|h| PathBuf::from(h.mount_path)).unwrap_or_default(),
            self.shutdown.clone(),
        )
        .await
    }

    /// Reads a stored object, optionally restricted to a byte range, and
    /// writes the bytes to `cmd.output` or stdout (§4.6).
    pub async fn get(&self, cmd: GetObjectCommand) -> Result<GetObjectResult, StrubsError> {
        self.shutdown.throw_if_aborted()?;
        let record = self
            .lookup(&cmd.path)
            .await?
            .ok_or_else(|| StrubsError::not_found(format!("no object at {}", cmd.path)))?;

        self.metrics.read_inflight.inc();
        let result = self.get_inner(cmd, record).await;
        self.metrics.read_inflight.dec();
        result
    }

    async fn get_inner(&self, cmd: GetObjectCommand, record: ObjectRecord) -> Result<GetObjectResult, StrubsError> {
        let volumes = self.volumes.clone();
        let metrics = self.metrics.clone();
        let mut reader = ReadPipeline::open(
            &record,
            move |vol_id| volumes.get(vol_id).map(|h| PathBuf::from(h.mount_path)).unwrap_or_default(),
            self.shutdown.clone(),
            Some(metrics),
        )
        .await?;

        if let Some((lo, hi)) = cmd.range {
            reader.set_read_range(lo, hi)?;
        }
        let bytes = reader.read_range().await?;

        match cmd.output {
            Some(path) => {
                tokio::fs::write(&path, &bytes).await.map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
            }
            None => {
                tokio::io::stdout()
                    .write_all(&bytes)
                    .await
                    .map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
            }
        }

        Ok(GetObjectResult {
            bytes_written: bytes.len() as u64,
        })
    }

    /// Deletes a stored object and unlinks its `K+M` slice files (§4.5).
    /// Idempotent: deleting a path that holds no object is a no-op success,
    /// not a failure (property 5).
    pub async fn delete(&self, cmd: DeleteObjectCommand) -> Result<DeleteObjectResult, StrubsError> {
        self.shutdown.throw_if_aborted()?;
        let record = match self.lookup(&cmd.path).await? {
            Some(record) => record,
            None => return Ok(DeleteObjectResult { deleted: false }),
        };

        let candidates: Vec<VolumeId> = record.data_volumes.iter().chain(record.parity_volumes.iter()).copied().collect();
        let mut slice_paths = Vec::with_capacity(candidates.len());
        for (slice_index, volume_id) in candidates.iter().enumerate() {
            let mount_path = self.volumes.get(*volume_id).map(|h| PathBuf::from(h.mount_path)).unwrap_or_default();
            slice_paths.push(chunk_io::slice_path(&mount_path, record.id, slice_index as u16));
        }

        commit::delete_slices(&slice_paths).await?;
        self.metadata.delete_object(record.id).await?;
        Ok(DeleteObjectResult { deleted: true })
    }

    /// Runs one complete (or resumed) verify pass synchronously, returning
    /// a human-readable summary line (§4.7).
    pub async fn start_verify(&self) -> Result<String, StrubsError> {
        let verifier = self.build_verifier();
        let summary = verifier.run().await?;
        Ok(format!(
            "verified {} objects, {} checksum errors, {} total errors",
            summary.objects_verified, summary.checksum_errors, summary.total_errors
        ))
    }

    /// Clears the shared `verifyStartedAt` signal a concurrently running
    /// `start_verify` checks at each batch boundary (§4.7 step 7).
    pub async fn stop_verify(&self) -> Result<String, StrubsError> {
        self.runtime_config.clear_verify_started_at().await?;
        Ok("verify stop requested".to_string())
    }

    pub async fn verify_status(&self) -> Result<String, StrubsError> {
        let started_at = self.runtime_config.get_verify_started_at().await?;
        let last = self.runtime_config.get_last_verify().await?;

        let mut lines = Vec::new();
        match started_at {
            Some(ts) => lines.push(format!("verify running, started at {ts}")),
            None => lines.push("no verify run in progress".to_string()),
        }
        match last {
            Some(summary) => lines.push(format!(
                "last run: {} -> {}, {} checksum errors, {} total errors",
                summary.started_at, summary.finished_at, summary.checksum_errors, summary.total_errors
            )),
            None => lines.push("no completed verify run on record".to_string()),
        }
        Ok(lines.join("\n"))
    }

    pub async fn list_volumes(&self) -> Result<String, StrubsError> {
        let volumes = self.metadata.list_volumes().await?;
        if volumes.is_empty() {
            return Ok("no volumes configured".to_string());
        }
        let mut lines = Vec::with_capacity(volumes.len());
        for volume in volumes {
            lines.push(format!(
                "{} {} state={:?} priority={} checksum_errors={}/{}",
                volume.id, volume.mount_path, volume.state, volume.priority, volume.verify_errors.checksum, volume.verify_errors.total
            ));
        }
        Ok(lines.join("\n"))
    }

    fn build_verifier(&self) -> Verifier {
        Verifier::new(
            self.metadata.clone(),
            self.runtime_config.clone(),
            self.volumes.clone(),
            self.metrics.clone(),
            self.shutdown.clone(),
            self.verifier_batch_size,
            self.verifier_progress_interval,
        )
    }

    /// Resolves `path` against the container hierarchy, one component at a
    /// time, via repeated `get_object_by_path` calls.
    async fn lookup(&self, path: &str) -> Result<Option<ObjectRecord>, StrubsError> {
        let (components, name) = split_path(path);
        let mut container: Option<ObjectId> = None;
        for component in &components {
            match self.metadata.get_object_by_path(container, component).await? {
                Some(record) => container = Some(record.id),
                None => return Ok(None),
            }
        }
        self.metadata.get_object_by_path(container, &name).await
    }
}

/// Splits a `/`-separated object path into its container path components
/// and final name, tolerating leading/trailing slashes.
fn split_path(path: &str) -> (Vec<String>, String) {
    let trimmed = path.trim_matches('/');
    let mut parts: Vec<String> = trimmed.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();
    let name = parts.pop().unwrap_or_default();
    (parts, name)
}
