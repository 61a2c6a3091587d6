// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Slice File I/O
//!
//! Positional reads and appends against one slice file on disk (§3). This
//! module owns path layout (`{mountPath}/{obj[0:2]}/{obj[2:4]}/{obj}.{idx}`)
//! and the crash-safe temp-name scheme (§6: `{final}.tmp-{random}`); the
//! byte layout itself (headers, checksums) is `strubs_domain::chunk_codec`'s
//! concern, not this module's.
//!
//! Grounded on `infrastructure/services/binary_format.rs`'s
//! `StreamingBinaryWriter`/`StreamingBinaryReader`, which perform positional
//! I/O via `tokio::task::spawn_blocking` over a `std::fs::File`; this module
//! keeps that shape but drops the single-stream framing in favor of
//! `strubs_domain::chunk_codec`'s file-header + chunk-sequence layout.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use strubs_domain::chunk_codec::{self, ChunkHeader, FileHeader, CHUNK_HEADER_SIZE, FILE_HEADER_SIZE};
use strubs_domain::error::StrubsError;
use strubs_domain::value_objects::ObjectId;

/// Computes the final on-disk path for one slice (§3).
pub fn slice_path(mount_path: &Path, object_id: ObjectId, slice_index: u16) -> PathBuf {
    let (p0, p1) = object_id.shard_prefix();
    mount_path.join(p0).join(p1).join(format!("{object_id}.{slice_index}"))
}

/// Computes a crash-safe temp path for a slice being written (§6).
pub fn temp_slice_path(final_path: &Path) -> PathBuf {
    let suffix: u64 = rand::rng().random();
    let mut name = final_path.as_os_str().to_owned();
    name.push(format!(".tmp-{suffix:016x}"));
    PathBuf::from(name)
}

/// A slice file open for append-only writing.
pub struct SliceWriter {
    file: std::fs::File,
    bytes_written: u64,
}

impl SliceWriter {
    /// Creates the parent directories and the temp-named file, then writes
    /// the file header (§4.4 step 1).
    pub async fn create(temp_path: PathBuf, header: &FileHeader) -> Result<Self, StrubsError> {
        let header_bytes = header.encode();
        tokio::task::spawn_blocking(move || -> Result<Self, StrubsError> {
            if let Some(parent) = temp_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new().create(true).write(true).truncate(true).open(&temp_path)?;
            file.write_all(&header_bytes)?;
            Ok(Self {
                file,
                bytes_written: header_bytes.len() as u64,
            })
        })
        .await
        .map_err(|e| StrubsError::internal(format!("join error: {e}")))?
    }

    /// Appends one fully-framed chunk (header + payload) to the slice file
    /// (§4.4: "writes to any slice file are append-only").
    pub async fn append_chunk(&mut self, chunk_index: u32, payload: Vec<u8>) -> Result<(), StrubsError> {
        let frame = chunk_codec::encode_chunk(chunk_index, &payload);
        let len = frame.len() as u64;
        let mut file = self.file.try_clone()?;
        tokio::task::spawn_blocking(move || file.write_all(&frame))
            .await
            .map_err(|e| StrubsError::internal(format!("join error: {e}")))??;
        self.bytes_written += len;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flushes the slice file durably to disk (§4.5 step 1).
    pub async fn sync(&mut self) -> Result<(), StrubsError> {
        let mut file = self.file.try_clone()?;
        tokio::task::spawn_blocking(move || file.sync_all())
            .await
            .map_err(|e| StrubsError::internal(format!("join error: {e}")))??;
        Ok(())
    }
}

/// A slice file open for positional reads, used by the read pipeline and
/// the verifier's per-slice walk.
pub struct SliceReader {
    file: std::fs::File,
}

impl SliceReader {
    pub async fn open(path: PathBuf) -> Result<Self, StrubsError> {
        let file = tokio::task::spawn_blocking(move || std::fs::File::open(&path))
            .await
            .map_err(|e| StrubsError::internal(format!("join error: {e}")))??;
        Ok(Self { file })
    }

    /// Reads and decodes the file header at offset 0 (§4.2 `readFrame`).
    pub async fn read_header(&mut self) -> Result<FileHeader, StrubsError> {
        let mut file = self.file.try_clone()?;
        let bytes = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut buf = vec![0u8; FILE_HEADER_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut buf)?;
            Ok(buf)
        })
        .await
        .map_err(|e| StrubsError::internal(format!("join error: {e}")))??;
        FileHeader::decode(&bytes)
    }

    /// Reads one chunk (header + payload) at the byte offset for
    /// `chunk_index`, given the slice's chunk stride `d + CHUNK_HEADER_SIZE`.
    pub async fn read_chunk(&mut self, chunk_index: u32, d: usize, payload_len_hint: usize) -> Result<(ChunkHeader, Vec<u8>), StrubsError> {
        let stride = d + CHUNK_HEADER_SIZE;
        let offset = FILE_HEADER_SIZE as u64 + chunk_index as u64 * stride as u64;
        let to_read = CHUNK_HEADER_SIZE + payload_len_hint.min(d);
        let mut file = self.file.try_clone()?;
        let bytes = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut buf = vec![0u8; to_read];
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
            Ok(buf)
        })
        .await
        .map_err(|e| StrubsError::internal(format!("join error: {e}")))?
        .map_err(|e| StrubsError::io(0, 0, e.to_string()))?;

        let (head, body) = bytes.split_at(CHUNK_HEADER_SIZE);
        let header = chunk_codec::decode_chunk_header(head)?;
        let body = body[..header.length as usize].to_vec();
        Ok((header, body))
    }
}

/// Renames a temp slice file to its final path (§4.5 step 2).
pub async fn commit_rename(temp_path: PathBuf, final_path: PathBuf) -> std::io::Result<()> {
    if let Some(parent) = final_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(temp_path, final_path).await
}

/// Unlinks a slice file; a missing file is not an error (§4.5 `delete()`).
pub async fn remove_if_exists(path: PathBuf) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strubs_domain::value_objects::SliceKind;
    use tempfile::tempdir;

    fn header(object_id: ObjectId) -> FileHeader {
        FileHeader {
            version: chunk_codec::HEADER_FORMAT_VERSION,
            object_id,
            slice_index: 0,
            slice_kind: SliceKind::Data,
            k: 4,
            m: 2,
            chunk_size: 65536,
            slice_data_size: 100,
        }
    }

    #[tokio::test]
    async fn write_then_read_roundtrips_header_and_chunk() {
        let dir = tempdir().unwrap();
        let object_id = ObjectId::new();
        let final_path = slice_path(dir.path(), object_id, 0);
        let temp_path = temp_slice_path(&final_path);
        let head = header(object_id);

        let mut writer = SliceWriter::create(temp_path.clone(), &head).await.unwrap();
        writer.append_chunk(0, b"hello world".to_vec()).await.unwrap();
        writer.sync().await.unwrap();
        commit_rename(temp_path, final_path.clone()).await.unwrap();

        let mut reader = SliceReader::open(final_path).await.unwrap();
        let decoded = reader.read_header().await.unwrap();
        assert_eq!(decoded.object_id, object_id);

        let d = strubs_domain::value_objects::ChunkSize::default_size().payload_capacity();
        let (chunk_header, payload) = reader.read_chunk(0, d, b"hello world".len()).await.unwrap();
        assert_eq!(chunk_header.chunk_index, 0);
        assert_eq!(payload, b"hello world");
    }

    #[tokio::test]
    async fn remove_if_exists_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope");
        remove_if_exists(path).await.unwrap();
    }
}
