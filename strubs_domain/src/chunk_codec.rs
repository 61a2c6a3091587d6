// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Codec
//!
//! Encodes and decodes the on-disk slice frame: one fixed-size file header
//! followed by a sequence of chunks, each a fixed-size chunk header plus up
//! to `D = chunkSize - CHUNK_HEADER_SIZE` payload bytes (§4.2).
//!
//! This module only deals in byte buffers; the actual positional reads and
//! writes against slice files live in the engine crate's `chunk_io` module,
//! which calls `encode_chunk`/`decode_chunk_header` per chunk.

use crate::error::StrubsError;
use crate::value_objects::{ObjectId, SliceKind};

/// `magic, version, objectId(16), sliceIndex(2), sliceKind(1), K(2), M(2),
/// chunkSize(4), sliceDataSize(8), reserved(8)`.
pub const FILE_HEADER_SIZE: usize = 4 + 1 + 16 + 2 + 1 + 2 + 2 + 4 + 8 + 8;

/// `magic, chunkIndex(4), length(4), checksum(4)`.
pub const CHUNK_HEADER_SIZE: usize = 4 + 4 + 4 + 4;

const FILE_MAGIC: [u8; 4] = *b"STRB";
const CHUNK_MAGIC: [u8; 4] = *b"STRC";

/// File header format version. This deployment places the file header
/// outside the first chunk (every chunk, including the first, has the full
/// `D` bytes of payload capacity); a future version that colocates the
/// header with slice 0's first chunk would bump this.
pub const HEADER_FORMAT_VERSION: u8 = 1;

/// Parsed slice file header.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FileHeader {
    pub version: u8,
    pub object_id: ObjectId,
    pub slice_index: u16,
    pub slice_kind: SliceKind,
    pub k: u16,
    pub m: u16,
    pub chunk_size: u32,
    pub slice_data_size: u64,
}

impl FileHeader {
    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        let mut pos = 0;
        buf[pos..pos + 4].copy_from_slice(&FILE_MAGIC);
        pos += 4;
        buf[pos] = self.version;
        pos += 1;
        buf[pos..pos + 16].copy_from_slice(&self.object_id.to_header_bytes());
        pos += 16;
        buf[pos..pos + 2].copy_from_slice(&self.slice_index.to_be_bytes());
        pos += 2;
        buf[pos] = self.slice_kind.to_header_byte();
        pos += 1;
        buf[pos..pos + 2].copy_from_slice(&self.k.to_be_bytes());
        pos += 2;
        buf[pos..pos + 2].copy_from_slice(&self.m.to_be_bytes());
        pos += 2;
        buf[pos..pos + 4].copy_from_slice(&self.chunk_size.to_be_bytes());
        pos += 4;
        buf[pos..pos + 8].copy_from_slice(&self.slice_data_size.to_be_bytes());
        pos += 8;
        // reserved 8 bytes left zeroed
        debug_assert_eq!(pos + 8, FILE_HEADER_SIZE);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StrubsError> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(StrubsError::short_read(0, 0, 0, FILE_HEADER_SIZE, bytes.len()));
        }
        let mut pos = 0;
        if bytes[pos..pos + 4] != FILE_MAGIC {
            return Err(StrubsError::internal("bad file header magic"));
        }
        pos += 4;
        let version = bytes[pos];
        pos += 1;
        let mut object_id_bytes = [0u8; 16];
        object_id_bytes.copy_from_slice(&bytes[pos..pos + 16]);
        let object_id = ObjectId::from_header_bytes(&object_id_bytes);
        pos += 16;
        let slice_index = u16::from_be_bytes(bytes[pos..pos + 2].try_into().unwrap());
        pos += 2;
        let slice_kind = SliceKind::from_header_byte(bytes[pos])?;
        pos += 1;
        let k = u16::from_be_bytes(bytes[pos..pos + 2].try_into().unwrap());
        pos += 2;
        let m = u16::from_be_bytes(bytes[pos..pos + 2].try_into().unwrap());
        pos += 2;
        let chunk_size = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap());
        pos += 4;
        let slice_data_size = u64::from_be_bytes(bytes[pos..pos + 8].try_into().unwrap());

        Ok(Self {
            version,
            object_id,
            slice_index,
            slice_kind,
            k,
            m,
            chunk_size,
            slice_data_size,
        })
    }

    /// Validates this header against the plan the caller expects, per
    /// `readFrame`'s stated checks (§4.2).
    pub fn validate_against(&self, object_id: ObjectId, slice_index: u16) -> Result<(), StrubsError> {
        if self.version != HEADER_FORMAT_VERSION {
            return Err(StrubsError::internal(format!(
                "unsupported file header version {}",
                self.version
            )));
        }
        if self.object_id != object_id || self.slice_index != slice_index {
            return Err(StrubsError::checksum(slice_index, 0, 0));
        }
        Ok(())
    }
}

/// Parsed chunk header (without payload).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ChunkHeader {
    pub chunk_index: u32,
    pub length: u32,
    pub checksum: u32,
}

/// CRC32 of a chunk payload, per §4.2's "CRC/checksum of the payload".
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Encodes one chunk (header + payload) ready to append to a slice file.
///
/// `payload.len()` must be `<= D`; the caller (the write pipeline) is
/// responsible for splitting the stripe into `D`-sized rows before calling
/// this function.
pub fn encode_chunk(chunk_index: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + payload.len());
    out.extend_from_slice(&CHUNK_MAGIC);
    out.extend_from_slice(&chunk_index.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&checksum(payload).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Decodes a chunk header from exactly `CHUNK_HEADER_SIZE` bytes.
pub fn decode_chunk_header(bytes: &[u8]) -> Result<ChunkHeader, StrubsError> {
    if bytes.len() != CHUNK_HEADER_SIZE {
        return Err(StrubsError::short_read(0, 0, 0, CHUNK_HEADER_SIZE, bytes.len()));
    }
    if bytes[0..4] != CHUNK_MAGIC {
        return Err(StrubsError::internal("bad chunk header magic"));
    }
    let chunk_index = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
    let length = u32::from_be_bytes(bytes[8..12].try_into().unwrap());
    let checksum = u32::from_be_bytes(bytes[12..16].try_into().unwrap());
    Ok(ChunkHeader {
        chunk_index,
        length,
        checksum,
    })
}

/// Verifies a decoded chunk's payload against its header's checksum and
/// capacity bound `D`, surfacing `ECHECKSUM` with the context `readFrame`
/// promises (§4.2).
pub fn verify_chunk(
    header: &ChunkHeader,
    payload: &[u8],
    d: usize,
    slice_index: u16,
    volume_id: u32,
) -> Result<(), StrubsError> {
    if header.length as usize > d {
        return Err(StrubsError::checksum(slice_index, volume_id, header.chunk_index));
    }
    if payload.len() != header.length as usize {
        return Err(StrubsError::short_read(
            slice_index,
            volume_id,
            header.chunk_index,
            header.length as usize,
            payload.len(),
        ));
    }
    if checksum(payload) != header.checksum {
        return Err(StrubsError::checksum(slice_index, volume_id, header.chunk_index));
    }
    Ok(())
}
