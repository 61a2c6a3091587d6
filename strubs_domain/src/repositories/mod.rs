// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Repository Ports
//!
//! Async trait boundaries between the pure engine and its external
//! collaborators (§6): the metadata store and the runtime-config key/value
//! store it shares with the verifier. Concrete adapters live in
//! `strubs-engine::infrastructure`; this crate only declares the contract.

mod metadata_store;
mod runtime_config;

pub use metadata_store::MetadataStore;
pub use runtime_config::{LastVerifySummary, RuntimeConfigStore};
