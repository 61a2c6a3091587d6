// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A unified error type for the STRUBS object storage engine. Every variant
//! maps to one of the error codes emitted at the engine boundary
//! (`ECHECKSUM`, `EIOSHORT`, `EIO`, `ENOVOLUMES`, `EUNRECOVERABLE`, `ENOENT`,
//! `ECOMMIT`, `IOABORT`, `ERANGE`) and carries whatever slice/volume/chunk
//! context is available at the point of failure.
//!
//! ## Error Categories
//!
//! - *Transient I/O* (`Io`, `ShortRead`): retried at the slice level by the
//!   read pipeline via Reed-Solomon reconstruction.
//! - *Data corruption* (`Checksum`): never retried blindly; recovered via RS
//!   on read; always counted per volume.
//! - *Planning / resource* (`NoVolumes`, resource exhaustion): fatal for the
//!   current request.
//! - *Invariant violation* (`Unrecoverable`, `Commit`, header mismatch):
//!   fatal; object marked in `sliceErrors` if partial.
//! - *Cancellation* (`Aborted`): not logged as an error; used to unwind
//!   resources.

use thiserror::Error;

/// Errors raised anywhere in the STRUBS engine.
///
/// Every variant exposes a stable [`StrubsError::code`] matching the error
/// codes named at the engine boundary, a [`StrubsError::category`], and an
/// [`StrubsError::is_recoverable`] classification, mirroring the domain
/// error conventions this engine was built from.
#[derive(Error, Debug, Clone)]
pub enum StrubsError {
    /// Chunk checksum or file header mismatch detected while reading a slice.
    #[error("checksum mismatch: slice {slice_index} (volume {volume_id}), chunk {chunk_index}")]
    Checksum {
        slice_index: u16,
        volume_id: u32,
        chunk_index: u32,
    },

    /// A slice read returned fewer bytes than the chunk header promised.
    #[error("short read: slice {slice_index} (volume {volume_id}), chunk {chunk_index}: expected {expected} bytes, got {actual}")]
    ShortRead {
        slice_index: u16,
        volume_id: u32,
        chunk_index: u32,
        expected: usize,
        actual: usize,
    },

    /// A transient I/O failure (not a checksum mismatch) on a slice file.
    #[error("io error on slice {slice_index} (volume {volume_id}): {message}")]
    Io {
        slice_index: u16,
        volume_id: u32,
        message: String,
    },

    /// Fewer than K+M online volumes were available during planning.
    #[error("not enough online volumes: need {needed}, found {available}")]
    NoVolumes { needed: usize, available: usize },

    /// Fewer than K of K+M slices survived; Reed-Solomon cannot reconstruct.
    #[error("unrecoverable: only {present} of {k} required slices present")]
    Unrecoverable { present: usize, k: usize },

    /// The requested object/volume/config key does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Commit failed after fsync/rename; all temp and renamed files were
    /// rolled back.
    #[error("commit failed: {0}")]
    Commit(String),

    /// The I/O shutdown token was aborted; operation unwound without error
    /// side effects.
    #[error("aborted: {0}")]
    Aborted(String),

    /// An invalid byte range was requested of the read pipeline.
    #[error("invalid range: {0}")]
    Range(String),

    /// The plan or slice layout violates an engine invariant.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StrubsError {
    pub fn checksum(slice_index: u16, volume_id: u32, chunk_index: u32) -> Self {
        Self::Checksum {
            slice_index,
            volume_id,
            chunk_index,
        }
    }

    pub fn short_read(slice_index: u16, volume_id: u32, chunk_index: u32, expected: usize, actual: usize) -> Self {
        Self::ShortRead {
            slice_index,
            volume_id,
            chunk_index,
            expected,
            actual,
        }
    }

    pub fn io(slice_index: u16, volume_id: u32, message: impl Into<String>) -> Self {
        Self::Io {
            slice_index,
            volume_id,
            message: message.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn commit(msg: impl Into<String>) -> Self {
        Self::Commit(msg.into())
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable error code emitted at the engine boundary (§6).
    pub fn code(&self) -> &'static str {
        match self {
            StrubsError::Checksum { .. } => "ECHECKSUM",
            StrubsError::ShortRead { .. } => "EIOSHORT",
            StrubsError::Io { .. } => "EIO",
            StrubsError::NoVolumes { .. } => "ENOVOLUMES",
            StrubsError::Unrecoverable { .. } => "EUNRECOVERABLE",
            StrubsError::NotFound(_) => "ENOENT",
            StrubsError::Commit(_) => "ECOMMIT",
            StrubsError::Aborted(_) => "IOABORT",
            StrubsError::Range(_) => "ERANGE",
            StrubsError::InvalidPlan(_) => "ENOVOLUMES",
            StrubsError::Database(_) => "EIO",
            StrubsError::Serialization(_) => "EIO",
            StrubsError::Internal(_) => "EIO",
        }
    }

    /// Broad category for logging/metrics grouping.
    pub fn category(&self) -> &'static str {
        match self {
            StrubsError::Checksum { .. } => "integrity",
            StrubsError::ShortRead { .. } | StrubsError::Io { .. } => "io",
            StrubsError::NoVolumes { .. } | StrubsError::InvalidPlan(_) => "planning",
            StrubsError::Unrecoverable { .. } | StrubsError::Commit(_) => "invariant",
            StrubsError::NotFound(_) => "lookup",
            StrubsError::Aborted(_) => "cancellation",
            StrubsError::Range(_) => "request",
            StrubsError::Database(_) => "database",
            StrubsError::Serialization(_) => "serialization",
            StrubsError::Internal(_) => "internal",
        }
    }

    /// Whether a caller may retry the same operation without changing
    /// anything (true only for transient I/O, never for checksum/invariant
    /// failures).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StrubsError::ShortRead { .. } | StrubsError::Io { .. })
    }

    /// Whether this error represents a shutdown-token abort rather than a
    /// real failure; callers should not log these as errors (§7).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StrubsError::Aborted(_))
    }
}

impl From<std::io::Error> for StrubsError {
    fn from(err: std::io::Error) -> Self {
        StrubsError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for StrubsError {
    fn from(err: serde_json::Error) -> Self {
        StrubsError::Serialization(err.to_string())
    }
}

pub type StrubsResult<T> = Result<T, StrubsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_error_carries_context_and_code() {
        let err = StrubsError::checksum(2, 7, 41);
        assert_eq!(err.code(), "ECHECKSUM");
        assert_eq!(err.category(), "integrity");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("slice 2"));
        assert!(err.to_string().contains("volume 7"));
    }

    #[test]
    fn short_read_is_recoverable() {
        let err = StrubsError::short_read(0, 1, 3, 4096, 100);
        assert!(err.is_recoverable());
        assert_eq!(err.code(), "EIOSHORT");
    }

    #[test]
    fn no_volumes_is_not_recoverable() {
        let err = StrubsError::NoVolumes {
            needed: 6,
            available: 4,
        };
        assert_eq!(err.code(), "ENOVOLUMES");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn aborted_is_cancellation_not_error() {
        let err = StrubsError::aborted("shutdown requested");
        assert!(err.is_cancellation());
        assert_eq!(err.code(), "IOABORT");
    }
}
