// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Read Pipeline
//!
//! The `FileObject` source (§4.6): opens `K+M` slice files, serves a
//! requested byte range, verifies every chunk's checksum on the way out,
//! and repairs via Reed-Solomon reconstruction when a chunk is missing or
//! fails verification. Grounded on the donor's `binary_format.rs` reader
//! side for positional reads and on `rs_engine` for repair.
//!
//! Byte layout mirrors `write_pipeline`'s contiguous partitioning: absolute
//! object offset `n` lives in data slice `floor(n / sliceDataSize)` at
//! local offset `n mod sliceDataSize`, chunk index `local_offset / D`
//! within that slice (§4.4 step 2). A requested range is served by walking
//! the data slices it overlaps in order and, within each, the chunks it
//! overlaps in order, so output bytes come out in source order without
//! needing a separate reassembly step.

use strubs_domain::chunk_codec::{self, FileHeader};
use strubs_domain::entities::ObjectRecord;
use strubs_domain::error::StrubsError;
use strubs_domain::io_shutdown::IoShutdownToken;
use strubs_domain::value_objects::{ChunkSize, Plan, VolumeId};
use strubs_domain::rs_engine;

use crate::infrastructure::chunk_io::{self, SliceReader};
use crate::infrastructure::metrics::SharedMetrics;

/// The `FileObject` source half: `load`/`openForRead` → `setReadRange` →
/// `read_range` (§4.6, §6).
pub struct ReadPipeline {
    object_id: strubs_domain::value_objects::ObjectId,
    plan: Plan,
    volume_ids: Vec<VolumeId>,
    readers: Vec<Option<SliceReader>>,
    shutdown: IoShutdownToken,
    metrics: Option<SharedMetrics>,
    start: u64,
    end: u64,
}

impl ReadPipeline {
    /// `openForRead`/`load`: recomputes the object's plan from its stored
    /// shape (without re-selecting volumes — `record.data_volumes` and
    /// `record.parity_volumes` are already fixed) and opens whichever of
    /// the `K+M` slice files are present. A missing or header-mismatched
    /// slice is recorded as absent rather than failing outright; repair
    /// happens lazily, per chunk, in `read_range` (§4.6 step 1, step 4).
    pub async fn open(
        record: &ObjectRecord,
        volume_mount_path: impl Fn(VolumeId) -> std::path::PathBuf,
        shutdown: IoShutdownToken,
        metrics: Option<SharedMetrics>,
    ) -> Result<Self, StrubsError> {
        shutdown.throw_if_aborted()?;

        let mut candidates = record.data_volumes.clone();
        candidates.extend(record.parity_volumes.iter().copied());
        let chunk_size = ChunkSize::new(record.chunk_size as usize)?;
        let plan = Plan::new(record.size, record.k, record.m, chunk_size, &candidates)?;

        let mut readers = Vec::with_capacity(plan.total_slices());
        for slice_index in 0..plan.total_slices() as u16 {
            let volume_id = candidates[slice_index as usize];
            let mount_path = volume_mount_path(volume_id);
            let path = chunk_io::slice_path(&mount_path, record.id, slice_index);
            readers.push(open_and_validate(path, record.id, slice_index).await);
        }

        Ok(Self {
            object_id: record.id,
            plan,
            volume_ids: candidates,
            readers,
            shutdown,
            metrics,
            start: 0,
            end: record.size,
        })
    }

    /// `setReadRange`: restricts subsequent `read_range` calls to
    /// `[start, end)`. Fails with `ERANGE` for an inverted or out-of-bounds
    /// range (§4.6 step 2).
    pub fn set_read_range(&mut self, start: u64, end: u64) -> Result<(), StrubsError> {
        if start > end || end > self.plan.file_size {
            return Err(StrubsError::Range(format!(
                "range [{start}, {end}) invalid for object of size {size}",
                size = self.plan.file_size
            )));
        }
        self.start = start;
        self.end = end;
        Ok(())
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Reads the currently configured range, repairing any chunk that
    /// fails verification or whose slice is unavailable. Bytes come out in
    /// source order (§4.6 step 3, step 6).
    pub async fn read_range(&mut self) -> Result<Vec<u8>, StrubsError> {
        self.shutdown.throw_if_aborted()?;
        let mut out = Vec::with_capacity((self.end - self.start) as usize);
        if self.start >= self.end {
            return Ok(out);
        }

        let k = self.plan.k as usize;
        let slice_data_size = self.plan.slice_data_size;
        let d = self.plan.d();

        for slice_j in 0..k {
            self.shutdown.throw_if_aborted()?;
            let slice_byte_lo = slice_j as u64 * slice_data_size;
            let slice_byte_hi = slice_byte_lo + slice_data_size;
            let overlap_lo = self.start.max(slice_byte_lo);
            let overlap_hi = self.end.min(slice_byte_hi);
            if overlap_lo >= overlap_hi {
                continue;
            }
            let local_lo = overlap_lo - slice_byte_lo;
            let local_hi = overlap_hi - slice_byte_lo;
            let chunk_lo = (local_lo / d) as u32;
            let chunk_hi = ((local_hi - 1) / d) as u32;

            for chunk_index in chunk_lo..=chunk_hi {
                self.shutdown.throw_if_aborted()?;
                let payload = self.read_and_repair_chunk(slice_j, chunk_index).await?;
                let chunk_byte_lo = chunk_index as u64 * d;
                let chunk_byte_hi = chunk_byte_lo + payload.len() as u64;
                let take_lo = local_lo.max(chunk_byte_lo);
                let take_hi = local_hi.min(chunk_byte_hi);
                let start_idx = (take_lo - chunk_byte_lo) as usize;
                let end_idx = (take_hi - chunk_byte_lo) as usize;
                out.extend_from_slice(&payload[start_idx..end_idx]);
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.bytes_read_total.inc_by(out.len() as u64);
        }
        Ok(out)
    }

    /// Fetches chunk `chunk_index` of slot `slot` (a data or parity slice,
    /// 0-indexed over `K+M`), verified against its checksum. Returns its
    /// real-length (unpadded) payload.
    async fn read_and_repair_chunk(&mut self, slot: usize, chunk_index: u32) -> Result<Vec<u8>, StrubsError> {
        let k = self.plan.k as usize;
        let m = self.plan.m as usize;
        let d = self.plan.d() as usize;
        let is_last = chunk_index + 1 == self.plan.chunk_count;
        let expected_len = if is_last {
            self.plan.last_chunk_payload_len() as usize
        } else {
            d
        };

        if let Some(payload) = self.try_read_slot(slot, chunk_index, expected_len).await {
            return Ok(payload);
        }

        let mut slots: Vec<Option<Vec<u8>>> = Vec::with_capacity(k + m);
        for other in 0..k + m {
            if other == slot {
                slots.push(None);
                continue;
            }
            let padded = match self.try_read_slot(other, chunk_index, expected_len).await {
                Some(mut payload) => {
                    payload.resize(d, 0);
                    Some(payload)
                }
                None => None,
            };
            slots.push(padded);
        }

        rs_engine::reconstruct(k, m, d, &mut slots)?;

        if let Some(metrics) = &self.metrics {
            if let Some(volume_id) = self.volume_ids.get(slot) {
                metrics.record_checksum_error(volume_id.value());
            }
        }

        let mut recovered = slots[slot]
            .take()
            .ok_or_else(|| StrubsError::Unrecoverable { present: 0, k })?;
        recovered.truncate(expected_len);
        Ok(recovered)
    }

    /// Reads and verifies one chunk directly from slot `slot`'s open slice
    /// file. Returns `None` on any failure (missing reader, short read,
    /// checksum mismatch, wrong chunk index) — every such case is a
    /// candidate for Reed-Solomon repair, not a hard error.
    async fn try_read_slot(&mut self, slot: usize, chunk_index: u32, expected_len: usize) -> Option<Vec<u8>> {
        let d = self.plan.d() as usize;
        let reader = self.readers.get_mut(slot)?.as_mut()?;
        let (header, payload) = reader.read_chunk(chunk_index, d, expected_len).await.ok()?;
        if header.chunk_index != chunk_index {
            return None;
        }
        let volume_id = self.volume_ids.get(slot).copied().unwrap_or(VolumeId::new(0));
        chunk_codec::verify_chunk(&header, &payload, d, slot as u16, volume_id.value()).ok()?;
        Some(payload)
    }

    pub fn object_id(&self) -> strubs_domain::value_objects::ObjectId {
        self.object_id
    }
}

/// Opens a slice file and checks its header matches the object/slice it's
/// expected to hold; returns `None` (treated as "slice unavailable, repair
/// on read") for any I/O failure or header mismatch rather than failing
/// `open` outright, since up to `M` slices may legitimately be missing.
async fn open_and_validate(
    path: std::path::PathBuf,
    object_id: strubs_domain::value_objects::ObjectId,
    slice_index: u16,
) -> Option<SliceReader> {
    let mut reader = SliceReader::open(path).await.ok()?;
    let header: FileHeader = reader.read_header().await.ok()?;
    header.validate_against(object_id, slice_index).ok()?;
    Some(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use strubs_domain::entities::ObjectRecord;
    use strubs_domain::value_objects::{ChunkSize, ObjectId};
    use tempfile::tempdir;

    use crate::file_object::write_pipeline::WritePipeline;

    async fn write_object(dir: &std::path::Path, data: &[u8], k: u16, m: u16) -> (ObjectRecord, std::path::PathBuf) {
        let volumes: Vec<VolumeId> = (0..(k + m) as u32).map(VolumeId::new).collect();
        let plan = Plan::new(data.len() as u64, k, m, ChunkSize::new(128).unwrap(), &volumes).unwrap();
        let id = ObjectId::new();
        let dir_buf = dir.to_path_buf();
        let mut pipeline = WritePipeline::create(id, plan, move |_v| dir_buf.clone(), IoShutdownToken::new())
            .await
            .unwrap();
        pipeline.write(data).await.unwrap();
        let finish = pipeline.end().await.unwrap();
        for (temp, final_path) in pipeline.slice_paths() {
            chunk_io::commit_rename(temp, final_path).await.unwrap();
        }

        let record = ObjectRecord::new_object(
            id,
            None,
            "blob.bin".to_string(),
            finish.size,
            None,
            finish.md5,
            128,
            k,
            m,
            volumes[..k as usize].to_vec(),
            volumes[k as usize..].to_vec(),
            Utc::now(),
        );
        (record, dir.to_path_buf())
    }

    #[tokio::test]
    async fn reads_back_exact_bytes_for_full_range() {
        let dir = tempdir().unwrap();
        let d = 128 - strubs_domain::chunk_codec::CHUNK_HEADER_SIZE;
        let size = (d as u64) * 4 * 2 + 37;
        let data: Vec<u8> = (0..size).map(|i| (i % 241) as u8).collect();
        let (record, root) = write_object(dir.path(), &data, 4, 2).await;

        let root2 = root.clone();
        let mut reader = ReadPipeline::open(&record, move |_v| root2.clone(), IoShutdownToken::new(), None)
            .await
            .unwrap();
        let out = reader.read_range().await.unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn reads_back_a_sub_range_spanning_a_slice_boundary() {
        let dir = tempdir().unwrap();
        let d = 128 - strubs_domain::chunk_codec::CHUNK_HEADER_SIZE;
        let slice_data_size = (d as u64) * 2;
        let size = slice_data_size * 3;
        let data: Vec<u8> = (0..size).map(|i| (i % 197) as u8).collect();
        let (record, root) = write_object(dir.path(), &data, 3, 2).await;

        let root2 = root.clone();
        let mut reader = ReadPipeline::open(&record, move |_v| root2.clone(), IoShutdownToken::new(), None)
            .await
            .unwrap();
        let lo = slice_data_size - 5;
        let hi = slice_data_size + 5;
        reader.set_read_range(lo, hi).unwrap();
        let out = reader.read_range().await.unwrap();
        assert_eq!(out, data[lo as usize..hi as usize]);
    }

    #[tokio::test]
    async fn repairs_a_missing_data_slice_via_parity() {
        let dir = tempdir().unwrap();
        let d = 128 - strubs_domain::chunk_codec::CHUNK_HEADER_SIZE;
        let size = (d as u64) * 4 * 3 + 11;
        let data: Vec<u8> = (0..size).map(|i| (i % 223) as u8).collect();
        let (record, root) = write_object(dir.path(), &data, 4, 2).await;

        let missing_path = chunk_io::slice_path(&root, record.id, 1);
        std::fs::remove_file(&missing_path).unwrap();

        let root2 = root.clone();
        let mut reader = ReadPipeline::open(&record, move |_v| root2.clone(), IoShutdownToken::new(), None)
            .await
            .unwrap();
        let out = reader.read_range().await.unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn rejects_an_out_of_bounds_range() {
        let dir = tempdir().unwrap();
        let data = b"small object".to_vec();
        let (record, root) = write_object(dir.path(), &data, 4, 2).await;

        let mut reader = ReadPipeline::open(&record, move |_v| root.clone(), IoShutdownToken::new(), None)
            .await
            .unwrap();
        let err = reader.set_read_range(0, data.len() as u64 + 1).unwrap_err();
        assert_eq!(err.code(), "ERANGE");
    }
}
