// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Entities
//!
//! `ObjectRecord` and `VolumeRecord` are the two entities with identity that
//! persist across process restarts (§3: "Data Model"). Both are plain data
//! carried between the engine and its `MetadataStore`/`VolumeRepository`
//! ports; neither owns any I/O.

mod object_record;
mod volume_record;

pub use object_record::{ObjectRecord, SliceErrorEntry};
pub use volume_record::{VolumeRecord, VolumeState};
