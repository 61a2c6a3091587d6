// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # STRUBS Engine
//!
//! The object storage engine: erasure-coded write/read pipelines over a
//! fleet of local volumes, the commit/delete protocol that keeps the
//! metadata store and on-disk slice files consistent, and the background
//! integrity verifier.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Presentation                                │
//! │  (CLI adapter: ValidatedCommand -> application commands)     │
//! └───────────────────────────┬───────────────────────────────────┘
//! ┌───────────────────────────┴───────────────────────────────────┐
//! │                  Application                                  │
//! │  (StrubsService: put/get/delete, Verifier)                    │
//! └───────────────────────────┬───────────────────────────────────┘
//! ┌───────────────────────────┴───────────────────────────────────┐
//! │            FileObject pipelines                              │
//! │  (write_pipeline sink, read_pipeline source)                  │
//! └───────────────────────────┬───────────────────────────────────┘
//! ┌───────────────────────────┴───────────────────────────────────┐
//! │                 Infrastructure                               │
//! │  (chunk_io, commit, sqlx metadata store, config,              │
//! │   logging, metrics)                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pure domain logic (the `Plan`, the chunk codec, the Reed-Solomon
//! wrapper, the volume registry, repository ports) lives in
//! `strubs-domain`; this crate only adapts it to real I/O and exposes it
//! to `strubs-bootstrap`'s composition root.
//!
//! ## Module Structure
//!
//! - [`file_object`] — the write/read pipeline pair (§4.4, §4.6)
//! - [`application`] — `StrubsService` orchestration and the verifier job
//! - [`infrastructure`] — sqlx metadata store, positional slice I/O,
//!   commit/delete, config, logging, metrics
//! - [`presentation`] — translates a validated CLI command into an
//!   application command and formats the result back to text

pub mod application;
pub mod file_object;
pub mod infrastructure;
pub mod presentation;

// Tests are organized as:
// - Unit tests: #[cfg(test)] modules within each source file
// - Integration tests: separate files in tests/ directory

pub use application::commands::{
    DeleteObjectCommand, DeleteObjectResult, GetObjectCommand, GetObjectResult, PutObjectCommand, PutObjectResult,
};
pub use application::service::StrubsService;
pub use application::verifier::{VerifySummary, Verifier};
