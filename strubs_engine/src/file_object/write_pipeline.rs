// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Write Pipeline
//!
//! The `FileObject` sink (§4.4): ingests bytes, partitions them contiguously
//! across the K data slices, computes Reed-Solomon parity, and issues
//! writes to `K+M` slice files. Grounded on the donor's `binary_format.rs`
//! writer side plus `file_io_service.rs`'s `WriteOptions`/`WriteResult`
//! shape; backpressure is modeled after a bounded `tokio::sync::mpsc`
//! channel (a full channel makes `write` return `false`).
//!
//! Byte layout follows §4.4 step 2 literally: byte `n` of the source goes
//! to data slice `floor(n / sliceDataSize)` at offset `n mod sliceDataSize`.
//! Each data slice is filled to its full `sliceDataSize` (zero-padded on the
//! last slice that runs out of real bytes, and on any slice after it) before
//! the next slice starts, so every data slice ends up the same size,
//! matching invariant 1 (`slice_size` is the same for all `K+M` files) and
//! invariant 2 (`sliceDataSize = ceil(size/K)`, last slice zero-padded).
//!
//! A strictly streaming stripe-at-a-time parity encode (reading one `D`-byte
//! row from each of the K data slices as they arrive) is not reachable under
//! contiguous partitioning: slice `K-1`'s first chunk isn't known until
//! slice `K-2` is entirely full, which for a literal per-slice contiguous
//! layout means waiting for almost the whole object. Parity is instead
//! computed in a second pass at `end()`, re-reading each data slice's
//! already-flushed chunks one stripe (one chunk index across all K slices)
//! at a time and writing the M parity chunks for that stripe immediately,
//! bounding memory to one stripe rather than the whole object. See
//! `DESIGN.md`'s note on this resolved tension.

use std::path::PathBuf;

use md5::{Digest, Md5};
use strubs_domain::chunk_codec::{FileHeader, CHUNK_HEADER_SIZE};
use strubs_domain::error::StrubsError;
use strubs_domain::value_objects::{ObjectId, Plan, SliceKind};
use strubs_domain::{io_shutdown::IoShutdownToken, rs_engine};

use crate::infrastructure::chunk_io::{self, SliceReader, SliceWriter};

/// High-watermark (bytes buffered in the slice currently being written)
/// above which `write` reports backpressure (§4.4 step 4).
const BACKPRESSURE_STRIPES: u64 = 4;

struct SliceInFlight {
    writer: SliceWriter,
    temp_path: PathBuf,
    final_path: PathBuf,
    kind: SliceKind,
    chunks_flushed: u32,
    /// Partial (< D bytes) row accumulating for this slice's next chunk.
    /// Only used while this slice is `current_slice` (data slices) or
    /// during the `end()` parity pass (parity slices never buffer here).
    row_buf: Vec<u8>,
    /// Bytes accepted toward `sliceDataSize`, including zero padding
    /// written during `end()`. Data slices only.
    bytes_written: u64,
}

/// Outcome of a successful write pipeline run, ready for `commit()` (§6:
/// "Fields readable after finish").
pub struct WriteFinish {
    pub id: ObjectId,
    pub size: u64,
    pub md5: [u8; 16],
}

/// The `FileObject` sink half: `createWithSize` → repeated `write` →
/// `end()` → `finish` (§4.4, §6).
pub struct WritePipeline {
    id: ObjectId,
    plan: Plan,
    slices: Vec<SliceInFlight>,
    /// Which data slice the next incoming byte goes to.
    current_slice: usize,
    total_bytes_written: u64,
    hasher: Md5,
    shutdown: IoShutdownToken,
    backpressured: bool,
}

impl WritePipeline {
    /// `createWithSize`: obtains a plan, pre-creates `K+M` temp slice files,
    /// and writes their file headers (§4.4 step 1).
    pub async fn create(
        id: ObjectId,
        plan: Plan,
        volume_mount_paths: impl Fn(strubs_domain::value_objects::VolumeId) -> PathBuf,
        shutdown: IoShutdownToken,
    ) -> Result<Self, StrubsError> {
        shutdown.throw_if_aborted()?;

        let total = plan.total_slices();
        let mut slices = Vec::with_capacity(total);
        for slice_index in 0..total as u16 {
            let volume_id = plan
                .volume_for_slice(slice_index)
                .ok_or_else(|| StrubsError::internal("plan missing volume for slice"))?;
            let kind = if (slice_index as usize) < plan.k as usize {
                SliceKind::Data
            } else {
                SliceKind::Parity
            };
            let mount_path = volume_mount_paths(volume_id);
            let final_path = chunk_io::slice_path(&mount_path, id, slice_index);
            let temp_path = chunk_io::temp_slice_path(&final_path);
            let header = FileHeader {
                version: strubs_domain::chunk_codec::HEADER_FORMAT_VERSION,
                object_id: id,
                slice_index,
                slice_kind: kind,
                k: plan.k,
                m: plan.m,
                chunk_size: plan.chunk_size.as_bytes() as u32,
                slice_data_size: plan.slice_data_size,
            };
            let writer = SliceWriter::create(temp_path.clone(), &header).await?;
            slices.push(SliceInFlight {
                writer,
                temp_path,
                final_path,
                kind,
                chunks_flushed: 0,
                row_buf: Vec::new(),
                bytes_written: 0,
            });
        }

        Ok(Self {
            id,
            plan,
            slices,
            current_slice: 0,
            total_bytes_written: 0,
            hasher: Md5::new(),
            shutdown,
            backpressured: false,
        })
    }

    /// Ingests bytes, filling the current data slice to `sliceDataSize`
    /// before advancing to the next one (§4.4 step 2, §3 invariant 2).
    /// Returns `false` if the pipeline is now backpressured.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<bool, StrubsError> {
        self.shutdown.throw_if_aborted()?;
        self.hasher.update(bytes);
        self.total_bytes_written += bytes.len() as u64;
        self.feed(bytes).await?;
        Ok(!self.backpressured)
    }

    /// Routes `remaining` into the K data slices in contiguous order,
    /// flushing each full `D`-byte row as a chunk as soon as it fills.
    async fn feed(&mut self, mut remaining: &[u8]) -> Result<(), StrubsError> {
        let k = self.plan.k as usize;
        let target = self.plan.slice_data_size;

        while !remaining.is_empty() {
            if self.current_slice >= k {
                return Err(StrubsError::internal("write() received more bytes than the declared object size"));
            }
            let room = (target - self.slices[self.current_slice].bytes_written) as usize;
            if room == 0 {
                self.current_slice += 1;
                continue;
            }
            let take = room.min(remaining.len());
            let slice_idx = self.current_slice;
            self.feed_into_slice(slice_idx, &remaining[..take]).await?;
            remaining = &remaining[take..];
        }

        let d_and_header = self.plan.d() as u64 + CHUNK_HEADER_SIZE as u64;
        self.backpressured = self
            .slices
            .get(self.current_slice)
            .is_some_and(|s| s.writer.bytes_written() >= d_and_header * BACKPRESSURE_STRIPES);
        Ok(())
    }

    /// Feeds raw bytes (real data or zero padding) into one data slice's
    /// row buffer, flushing full `D`-byte chunks as they complete.
    async fn feed_into_slice(&mut self, slice_idx: usize, bytes: &[u8]) -> Result<(), StrubsError> {
        let d = self.plan.d() as usize;
        let mut offset = 0;
        while offset < bytes.len() {
            let room = d - self.slices[slice_idx].row_buf.len();
            let take = room.min(bytes.len() - offset);
            self.slices[slice_idx].row_buf.extend_from_slice(&bytes[offset..offset + take]);
            self.slices[slice_idx].bytes_written += take as u64;
            offset += take;

            if self.slices[slice_idx].row_buf.len() == d {
                let row = std::mem::take(&mut self.slices[slice_idx].row_buf);
                let chunk_index = self.slices[slice_idx].chunks_flushed;
                self.slices[slice_idx].writer.append_chunk(chunk_index, row).await?;
                self.slices[slice_idx].chunks_flushed += 1;
            }
        }
        Ok(())
    }

    /// `end()`: zero-pads every data slice up to `sliceDataSize`, flushes
    /// each slice's final (possibly short) chunk, computes and writes
    /// parity one stripe at a time, syncs every slice file, and returns
    /// the final size and MD5 (§4.4 steps 5-6).
    pub async fn end(&mut self) -> Result<WriteFinish, StrubsError> {
        self.shutdown.throw_if_aborted()?;
        let k = self.plan.k as usize;
        let target = self.plan.slice_data_size;

        while self.current_slice < k {
            let room = (target - self.slices[self.current_slice].bytes_written) as usize;
            if room == 0 {
                self.current_slice += 1;
                continue;
            }
            let slice_idx = self.current_slice;
            let zeros = vec![0u8; room];
            self.feed_into_slice(slice_idx, &zeros).await?;
        }

        for slice_idx in 0..k {
            if !self.slices[slice_idx].row_buf.is_empty() {
                let row = std::mem::take(&mut self.slices[slice_idx].row_buf);
                let chunk_index = self.slices[slice_idx].chunks_flushed;
                self.slices[slice_idx].writer.append_chunk(chunk_index, row).await?;
                self.slices[slice_idx].chunks_flushed += 1;
            }
        }

        self.compute_parity().await?;

        for slice in &mut self.slices {
            slice.writer.sync().await?;
        }

        let digest = self.hasher.clone().finalize();
        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&digest);

        Ok(WriteFinish {
            id: self.id,
            size: self.total_bytes_written,
            md5,
        })
    }

    /// Re-reads each data slice's just-written chunks, one stripe (one
    /// chunk index across all K data slices) at a time, and writes the M
    /// parity chunks for that stripe (§4.4 step 2, step 5: "parity is
    /// always computed over the zero-padded stripe"). The parity slices'
    /// own final chunk is truncated to `last_chunk_payload_len()` to match
    /// invariant 1 (every one of the `K+M` files is the same `sliceSize`),
    /// even though §4.4 step 5 describes parity chunks as "always full" —
    /// see `DESIGN.md`.
    async fn compute_parity(&mut self) -> Result<(), StrubsError> {
        let k = self.plan.k as usize;
        let m = self.plan.m as usize;
        let d = self.plan.d() as usize;
        let chunk_count = self.plan.chunk_count;
        if chunk_count == 0 || m == 0 {
            return Ok(());
        }
        let last_chunk_len = self.plan.last_chunk_payload_len() as usize;

        let mut readers = Vec::with_capacity(k);
        for slice in &self.slices[..k] {
            readers.push(SliceReader::open(slice.temp_path.clone()).await?);
        }

        for chunk_index in 0..chunk_count {
            let is_last = chunk_index + 1 == chunk_count;
            let hint = if is_last { last_chunk_len } else { d };
            let mut rows = Vec::with_capacity(k);
            for reader in &mut readers {
                let (_, mut payload) = reader.read_chunk(chunk_index, d, hint).await?;
                payload.resize(d, 0);
                rows.push(payload);
            }
            let parity_rows = rs_engine::encode(&rows, m)?;
            let parity_len = if is_last { last_chunk_len } else { d };
            for (parity_idx, mut row) in parity_rows.into_iter().enumerate() {
                row.truncate(parity_len);
                let slice_idx = k + parity_idx;
                let slice_chunk_index = self.slices[slice_idx].chunks_flushed;
                self.slices[slice_idx].writer.append_chunk(slice_chunk_index, row).await?;
                self.slices[slice_idx].chunks_flushed += 1;
            }
        }
        Ok(())
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn total_bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    /// Temp and final paths for every slice, in slice-index order; used by
    /// the commit protocol (§4.5) and by `delete()` on an errored upload.
    pub fn slice_paths(&self) -> Vec<(PathBuf, PathBuf)> {
        self.slices.iter().map(|s| (s.temp_path.clone(), s.final_path.clone())).collect()
    }

    pub fn slice_kind(&self, index: usize) -> SliceKind {
        self.slices[index].kind
    }

    /// Removes every temp file. Called on any slice-write error before
    /// commit (§4.4 step 7) or on an explicit `delete()` of an in-progress
    /// upload (§4.5).
    pub async fn cleanup_temp_files(&self) -> Result<(), StrubsError> {
        for slice in &self.slices {
            chunk_io::remove_if_exists(slice.temp_path.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strubs_domain::value_objects::{ChunkSize, VolumeId};
    use tempfile::tempdir;

    async fn make_pipeline(dir: &std::path::Path, size: u64, k: u16, m: u16) -> WritePipeline {
        let volumes: Vec<VolumeId> = (0..(k + m) as u32).map(VolumeId::new).collect();
        let plan = Plan::new(size, k, m, ChunkSize::new(128).unwrap(), &volumes).unwrap();
        let dir = dir.to_path_buf();
        WritePipeline::create(ObjectId::new(), plan, move |_vol| dir.clone(), IoShutdownToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn small_write_then_end_tracks_size_and_md5() {
        let dir = tempdir().unwrap();
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let mut pipeline = make_pipeline(dir.path(), data.len() as u64, 4, 2).await;
        let ok = pipeline.write(&data).await.unwrap();
        assert!(ok);
        let finish = pipeline.end().await.unwrap();
        assert_eq!(finish.size, data.len() as u64);

        let mut hasher = Md5::new();
        hasher.update(&data);
        let expected: [u8; 16] = hasher.finalize().into();
        assert_eq!(finish.md5, expected);
    }

    #[tokio::test]
    async fn data_slices_are_all_the_same_size_on_disk() {
        let dir = tempdir().unwrap();
        let k = 4u16;
        let d = 128 - strubs_domain::chunk_codec::CHUNK_HEADER_SIZE;
        let size = (d as u64) * (k as u64) * 3 + 17;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let mut pipeline = make_pipeline(dir.path(), size, k, 2).await;
        pipeline.write(&data).await.unwrap();
        let finish = pipeline.end().await.unwrap();
        assert_eq!(finish.size, size);

        let slice_size = pipeline.plan().slice_size;
        for (temp, _final) in pipeline.slice_paths() {
            let metadata = std::fs::metadata(&temp).unwrap();
            assert_eq!(metadata.len(), slice_size);
        }
    }

    #[tokio::test]
    async fn write_in_many_small_chunks_matches_single_write() {
        let dir = tempdir().unwrap();
        let k = 3u16;
        let d = 128 - strubs_domain::chunk_codec::CHUNK_HEADER_SIZE;
        let size = (d as u64) * (k as u64) + 5;
        let data: Vec<u8> = (0..size).map(|i| (i % 199) as u8).collect();
        let mut pipeline = make_pipeline(dir.path(), size, k, 1).await;
        for byte_chunk in data.chunks(7) {
            pipeline.write(byte_chunk).await.unwrap();
        }
        let finish = pipeline.end().await.unwrap();
        assert_eq!(finish.size, size);

        let mut hasher = Md5::new();
        hasher.update(&data);
        let expected: [u8; 16] = hasher.finalize().into();
        assert_eq!(finish.md5, expected);
    }

    #[tokio::test]
    async fn empty_object_ends_cleanly() {
        let dir = tempdir().unwrap();
        let mut pipeline = make_pipeline(dir.path(), 0, 4, 2).await;
        let finish = pipeline.end().await.unwrap();
        assert_eq!(finish.size, 0);
    }

    #[tokio::test]
    async fn cleanup_removes_temp_files_after_abort() {
        let dir = tempdir().unwrap();
        let pipeline = make_pipeline(dir.path(), 1024, 4, 2).await;
        pipeline.cleanup_temp_files().await.unwrap();
        for (temp, _) in pipeline.slice_paths() {
            assert!(!temp.exists());
        }
    }
}
