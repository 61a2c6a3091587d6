// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Commands
//!
//! Plain data carried from the presentation layer into [`super::service`]
//! (§4.4, §4.6, §4.5). These are independent of `strubs-bootstrap`'s
//! `ValidatedCommand` — the presentation layer translates one into the
//! other — so the service has no dependency on CLI parsing concerns.

use std::path::PathBuf;

/// Store a new object at `path` (§4.4). `input` is a local filesystem path;
/// `None` reads from stdin. `k`/`m`/`chunk_size` override the engine's
/// configured defaults for this object only.
#[derive(Debug, Clone)]
pub struct PutObjectCommand {
    pub path: String,
    pub input: Option<PathBuf>,
    pub k: Option<u16>,
    pub m: Option<u16>,
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PutObjectResult {
    pub id: String,
    pub size: u64,
    pub md5_hex: String,
}

/// Reads a stored object's bytes, optionally restricted to `range` (§4.6).
/// `output` is a local filesystem path; `None` writes to stdout.
#[derive(Debug, Clone)]
pub struct GetObjectCommand {
    pub path: String,
    pub output: Option<PathBuf>,
    pub range: Option<(u64, u64)>,
}

#[derive(Debug, Clone)]
pub struct GetObjectResult {
    pub bytes_written: u64,
}

/// Deletes a stored object and its `K+M` slice files (§4.5 `delete()`).
#[derive(Debug, Clone)]
pub struct DeleteObjectCommand {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct DeleteObjectResult {
    pub deleted: bool,
}
