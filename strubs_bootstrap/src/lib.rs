// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The composition root for the STRUBS object storage engine. It sits
//! **outside** the domain and engine crates and provides:
//!
//! - **Entry point** - Process lifecycle management
//! - **Signal handling** - Graceful shutdown (SIGTERM, SIGINT)
//! - **Argument parsing** - Secure CLI argument validation
//! - **Error handling** - Exit code mapping from `strubs_domain::error::StrubsError`
//! - **Async coordination** - Forwarding OS signals into the shared shutdown token
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (This Crate)              │
//! │  - Entry Point / main()                      │
//! │  - Signal Handling -> IoShutdownToken         │
//! │  - Secure Arg Parsing                         │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │              strubs-engine                    │
//! │  - Application use cases                      │
//! │  - Infrastructure adapters                    │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │              strubs-domain                    │
//! │  - Plan, chunk codec, Reed-Solomon engine     │
//! │  - Volume registry, shutdown token            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Key Design Principles
//!
//! 1. **Separation from engine layers** - enterprise crates never depend on
//!    this one; only `strubs-domain`'s shutdown token is shared downward.
//! 2. **Graceful shutdown** - one signal handler turns SIGTERM/SIGINT/Ctrl-C
//!    into an `IoShutdownToken::abort`.
//! 3. **Security first** - CLI paths and numeric arguments are validated
//!    before they reach the engine.
//!
//! ## Usage Example
//!
//! ```rust
//! use strubs_bootstrap::bootstrap_cli;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let _cli = bootstrap_cli()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - `signals` - Signal handling, forwarding into `IoShutdownToken`
//! - `cli` - Secure argument parsing
//! - `config` - Bootstrap-phase configuration
//! - `exit_code` - Process exit code mapping
//! - `shutdown` - Default shutdown grace period

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ParseError, ValidatedCli, ValidatedCommand};
pub use config::BootstrapConfig;
pub use exit_code::{from_bootstrap_error, from_error, result_to_exit_code, ExitCode};

/// Parses and validates CLI arguments from the process's `argv`.
///
/// This is the main entry point for the bootstrap layer. The caller is
/// responsible for running the application logic and mapping its result to
/// an exit code with [`result_to_exit_code`].
///
/// # Errors
///
/// Returns [`cli::ParseError`] if CLI parsing or validation fails. Clap
/// handles `--help`/`--version` on its own and exits the process.
///
/// # Example
///
/// ```no_run
/// use strubs_bootstrap::{bootstrap_cli, result_to_exit_code};
///
/// #[tokio::main]
/// async fn main() -> std::process::ExitCode {
///     let validated_cli = match bootstrap_cli() {
///         Ok(cli) => cli,
///         Err(e) => {
///             eprintln!("CLI error: {e}");
///             return std::process::ExitCode::from(64); // EX_USAGE
///         }
///     };
///
///     let result = run_application(validated_cli).await;
///     std::process::ExitCode::from(result_to_exit_code(result).as_i32() as u8)
/// }
///
/// async fn run_application(
///     _cli: strubs_bootstrap::ValidatedCli,
/// ) -> Result<(), strubs_domain::error::StrubsError> {
///     Ok(())
/// }
/// ```
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate(std::env::args())
}
