// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Slice Kind
//!
//! Each slice file header records whether the slice holds original (data)
//! content or Reed-Solomon parity, so the read pipeline and verifier can
//! reason about a slice without consulting the plan.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StrubsError;

/// Discriminates a slice as carrying data or parity bytes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SliceKind {
    Data,
    Parity,
}

impl SliceKind {
    /// Single-byte on-disk encoding used in the slice file header.
    pub fn to_header_byte(self) -> u8 {
        match self {
            SliceKind::Data => 0,
            SliceKind::Parity => 1,
        }
    }

    pub fn from_header_byte(byte: u8) -> Result<Self, StrubsError> {
        match byte {
            0 => Ok(SliceKind::Data),
            1 => Ok(SliceKind::Parity),
            other => Err(StrubsError::internal(format!(
                "invalid slice kind byte: {other}"
            ))),
        }
    }

    /// True for `Data`, the kind assigned to the first `K` slices of a plan.
    pub fn is_data(self) -> bool {
        matches!(self, SliceKind::Data)
    }
}

impl fmt::Display for SliceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceKind::Data => write!(f, "data"),
            SliceKind::Parity => write!(f, "parity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_byte_roundtrip() {
        assert_eq!(SliceKind::from_header_byte(0).unwrap(), SliceKind::Data);
        assert_eq!(SliceKind::from_header_byte(1).unwrap(), SliceKind::Parity);
        assert!(SliceKind::from_header_byte(2).is_err());
    }

    #[test]
    fn is_data_only_true_for_data() {
        assert!(SliceKind::Data.is_data());
        assert!(!SliceKind::Parity.is_data());
    }
}
