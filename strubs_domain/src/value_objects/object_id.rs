// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object Identifier Value Object
//!
//! A type-safe identifier for a stored object, rendered as a 24-character
//! hex string (12 random bytes) at the API/metadata-store boundary. The
//! on-disk slice file header stores this id in a fixed 16-byte field
//! (zero-padded), matching the `objectId (16 bytes)` layout named in the
//! slice file header.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StrubsError;

/// 12-byte object identifier, displayed/parsed as 24 lowercase hex
/// characters.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a fresh random object id.
    pub fn new() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 12];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parses a 24-character hex string into an `ObjectId`.
    pub fn from_hex(s: &str) -> Result<Self, StrubsError> {
        if s.len() != 24 {
            return Err(StrubsError::internal(format!(
                "object id must be 24 hex characters, got {} characters",
                s.len()
            )));
        }
        let raw = hex::decode(s).map_err(|e| StrubsError::internal(format!("invalid object id hex: {e}")))?;
        let mut bytes = [0u8; 12];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    /// The raw 12 id bytes.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Zero-padded 16-byte on-disk encoding used in the slice file header.
    pub fn to_header_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..12].copy_from_slice(&self.0);
        out
    }

    /// Parses the on-disk 16-byte header encoding back into an `ObjectId`.
    pub fn from_header_bytes(bytes: &[u8; 16]) -> Self {
        let mut id = [0u8; 12];
        id.copy_from_slice(&bytes[..12]);
        Self(id)
    }

    /// The first two hex characters, used as the first path-sharding level
    /// on disk (`{objectId[0:2]}/{objectId[2:4]}/...`).
    pub fn shard_prefix(&self) -> (String, String) {
        let hex = self.to_string();
        (hex[0..2].to_string(), hex[2..4].to_string())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for ObjectId {
    type Err = StrubsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 24);
        assert_eq!(ObjectId::from_hex(&s).unwrap(), id);
    }

    #[test]
    fn header_bytes_roundtrip() {
        let id = ObjectId::new();
        let header = id.to_header_bytes();
        assert_eq!(header.len(), 16);
        assert_eq!(ObjectId::from_header_bytes(&header), id);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(ObjectId::from_hex("deadbeef").is_err());
    }

    #[test]
    fn shard_prefix_matches_path_convention() {
        let id = ObjectId::from_hex("0123456789abcdef01234567").unwrap();
        assert_eq!(id.shard_prefix(), ("01".to_string(), "23".to_string()));
    }
}
