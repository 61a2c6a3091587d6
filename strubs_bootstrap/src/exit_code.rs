// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! Maps a top-level `Result` from the composition root to a `sysexits.h`-style
//! process exit code, so shell callers and orchestration scripts can branch on
//! failure class without parsing stderr.

use strubs_domain::error::StrubsError;

/// Exit code returned by the `strubs` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Ok = 0,
    /// Command-line usage error (EX_USAGE).
    Usage = 64,
    /// Requested object/volume/config key not found (EX_NOINPUT-ish).
    NotFound = 66,
    /// I/O error talking to a volume (EX_IOERR).
    IoError = 74,
    /// Data corruption that could not be reconstructed (EX_DATAERR).
    DataError = 65,
    /// Insufficient online volumes to satisfy the requested layout (EX_UNAVAILABLE).
    Unavailable = 69,
    /// The operation was cancelled by a shutdown signal, not a failure.
    Aborted = 130,
    /// Anything else.
    Software = 70,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Converts a top-level engine error into the process exit code that best
/// describes it, by matching the stable `.code()` string from
/// [`StrubsError`].
pub fn from_error(err: &StrubsError) -> ExitCode {
    if err.is_cancellation() {
        return ExitCode::Aborted;
    }
    match err.code() {
        "ENOENT" => ExitCode::NotFound,
        "ECHECKSUM" | "EUNRECOVERABLE" => ExitCode::DataError,
        "ENOVOLUMES" => ExitCode::Unavailable,
        "EIO" | "EIOSHORT" | "ECOMMIT" => ExitCode::IoError,
        "ERANGE" => ExitCode::Usage,
        _ => ExitCode::Software,
    }
}

/// Converts a bootstrap-phase `anyhow::Error` (config loading, CLI parsing)
/// into an exit code, falling back to [`ExitCode::Usage`] since these
/// failures happen before any engine call.
pub fn from_bootstrap_error(_err: &anyhow::Error) -> ExitCode {
    ExitCode::Usage
}

/// Runs the composition root's top-level result through [`from_error`] and
/// returns the process exit code, logging the failure unless it was a
/// cancellation.
pub fn result_to_exit_code(result: Result<(), StrubsError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::Ok,
        Err(err) => {
            let code = from_error(&err);
            if !err.is_cancellation() {
                tracing::error!(error_code = err.code(), "{err}");
            } else {
                tracing::info!("shutting down: {err}");
            }
            code
        }
    }
}
