// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Raw Command-Line Parsing
//!
//! The `clap`-derived argument grammar. This layer only describes shape
//! (flags, subcommands, types); [`crate::cli::validator`] is where path and
//! range arguments get checked against the filesystem and engine limits.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// STRUBS object storage command-line interface.
#[derive(Parser, Debug)]
#[command(name = "strubs", version, about = "Erasure-coded object storage over local volumes")]
pub struct Cli {
    /// Increase logging verbosity; repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the engine configuration file.
    #[arg(short, long, global = true, default_value = "strubs.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store an object, reading its bytes from a file or stdin.
    Put {
        /// Logical path the object is stored under.
        path: String,
        /// Source file to read; omit to read from stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Data shard count K (overrides the configured default).
        #[arg(short = 'k', long)]
        k: Option<usize>,
        /// Parity shard count M (overrides the configured default).
        #[arg(short = 'm', long)]
        m: Option<usize>,
        /// Chunk size in MiB (overrides the configured default).
        #[arg(long)]
        chunk_size_mb: Option<usize>,
    },

    /// Retrieve an object, writing its bytes to a file or stdout.
    Get {
        /// Logical path of the object to retrieve.
        path: String,
        /// Destination file to write; omit to write to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Inclusive byte range "start-end"; omit to read the whole object.
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Delete an object and reclaim its slices.
    Delete {
        /// Logical path of the object to delete.
        path: String,
    },

    /// Control and inspect the background integrity verifier.
    Verify {
        #[command(subcommand)]
        action: VerifyAction,
    },

    /// Inspect registered volumes.
    Volumes {
        #[command(subcommand)]
        action: VolumesAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum VerifyAction {
    /// Start (or resume) a verification run.
    Start,
    /// Request cancellation of the running verification pass.
    Stop,
    /// Report current progress counters.
    Status,
}

#[derive(Subcommand, Debug)]
pub enum VolumesAction {
    /// List registered volumes and their liveness/free-space state.
    List,
}

/// Parses `argv` into a [`Cli`]. Kept separate from [`Cli::parse`] so tests
/// can exercise parsing with an explicit argument vector.
pub fn parse_cli<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
