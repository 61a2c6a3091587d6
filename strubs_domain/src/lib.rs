// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # STRUBS Domain
//!
//! Pure, reusable business logic for the STRUBS erasure-coded object storage
//! engine, following Domain-Driven Design principles.
//!
//! ## Module Structure
//!
//! - [`value_objects`] — `ObjectId`, `VolumeId`, `ChunkSize`, `Plan`
//! - [`entities`] — `ObjectRecord`, `VolumeRecord`
//! - [`chunk_codec`] — on-disk slice frame encode/decode
//! - [`rs_engine`] — Reed-Solomon encode/reconstruct wrapper
//! - [`volume_registry`] — volume liveness, free space, admission queue
//! - [`io_shutdown`] — process-wide I/O cancellation token
//! - [`repositories`] — `MetadataStore` / `VolumeRepository` ports
//! - [`events`] — domain events raised by the engine
//! - [`error`] — `StrubsError`, the engine's unified error type
//!
//! ## Design Principles
//!
//! - **Storage independence**: this crate knows nothing about SQLite, the
//!   filesystem backend, or any wire protocol. Infrastructure adapters in
//!   `strubs-engine` implement the ports declared here.
//! - **Determinism**: [`rs_engine`] and [`value_objects::plan`] are pure
//!   functions of their inputs; no hidden global state.
//! - **Async at the I/O seam only**: [`repositories`] traits are `async`
//!   because they cross an I/O boundary; [`chunk_codec`] and [`rs_engine`]
//!   stay synchronous because they are CPU-bound.

pub mod chunk_codec;
pub mod entities;
pub mod error;
pub mod events;
pub mod io_shutdown;
pub mod repositories;
pub mod rs_engine;
pub mod value_objects;
pub mod volume_registry;

pub use entities::{ObjectRecord, SliceErrorEntry, VolumeRecord, VolumeState};
pub use error::StrubsError;
pub use events::DomainEvent;
pub use io_shutdown::IoShutdownToken;
pub use value_objects::{ChunkSize, ObjectId, Plan, SliceKind, VolumeId};
