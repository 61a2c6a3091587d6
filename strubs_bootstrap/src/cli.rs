// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_command()              │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

use std::path::PathBuf;

pub use parser::{parse_cli, Cli, Commands, VerifyAction, VolumesAction};
pub use validator::{ParseError, SecureArgParser};

/// A fully parsed and validated invocation, safe to hand to the engine.
#[derive(Debug)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: u8,
    pub config: PathBuf,
}

#[derive(Debug)]
pub enum ValidatedCommand {
    Put {
        path: String,
        input: Option<PathBuf>,
        k: Option<usize>,
        m: Option<usize>,
        chunk_size_mb: Option<usize>,
    },
    Get {
        path: String,
        output: Option<PathBuf>,
        range: Option<(u64, u64)>,
    },
    Delete {
        path: String,
    },
    VerifyStart,
    VerifyStop,
    VerifyStatus,
    VolumesList,
}

/// Parses `argv` and validates every argument, producing a [`ValidatedCli`]
/// or a human-readable [`ParseError`].
///
/// # Errors
///
/// Returns `ParseError` if clap rejects the arguments or any value fails
/// security/range validation.
pub fn parse_and_validate<I, T>(args: I) -> Result<ValidatedCli, ParseError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = parse_cli(args).map_err(|e| ParseError::Empty { name: Box::leak(e.to_string().into_boxed_str()) })?;
    let command = validate_command(cli.command)?;
    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config: SecureArgParser::validate_path("config", &cli.config)?,
    })
}

fn validate_command(command: Commands) -> Result<ValidatedCommand, ParseError> {
    match command {
        Commands::Put {
            path,
            input,
            k,
            m,
            chunk_size_mb,
        } => {
            SecureArgParser::validate_argument("path", &path)?;
            if let Some(ref input) = input {
                SecureArgParser::validate_path("input", input)?;
            }
            let k = k.map(SecureArgParser::validate_k).transpose()?;
            let m = m.map(SecureArgParser::validate_m).transpose()?;
            let chunk_size_mb = chunk_size_mb.map(SecureArgParser::validate_chunk_size_mb).transpose()?;
            Ok(ValidatedCommand::Put {
                path,
                input,
                k,
                m,
                chunk_size_mb,
            })
        }
        Commands::Get { path, output, range } => {
            SecureArgParser::validate_argument("path", &path)?;
            if let Some(ref output) = output {
                SecureArgParser::validate_path("output", output)?;
            }
            let range = range.map(|r| SecureArgParser::validate_range(&r)).transpose()?;
            Ok(ValidatedCommand::Get { path, output, range })
        }
        Commands::Delete { path } => {
            SecureArgParser::validate_argument("path", &path)?;
            Ok(ValidatedCommand::Delete { path })
        }
        Commands::Verify { action } => Ok(match action {
            VerifyAction::Start => ValidatedCommand::VerifyStart,
            VerifyAction::Stop => ValidatedCommand::VerifyStop,
            VerifyAction::Status => ValidatedCommand::VerifyStatus,
        }),
        Commands::Volumes { action } => Ok(match action {
            VolumesAction::List => ValidatedCommand::VolumesList,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_validates_put() {
        let cli = parse_and_validate(["strubs", "put", "/a/b", "-k", "4", "-m", "2"]).unwrap();
        match cli.command {
            ValidatedCommand::Put { path, k, m, .. } => {
                assert_eq!(path, "/a/b");
                assert_eq!(k, Some(4));
                assert_eq!(m, Some(2));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_k() {
        assert!(parse_and_validate(["strubs", "put", "/a/b", "-k", "0"]).is_err());
    }

    #[test]
    fn rejects_path_traversal_in_input() {
        assert!(parse_and_validate(["strubs", "put", "/a/b", "--input", "../../etc/passwd"]).is_err());
    }

    #[test]
    fn parses_range_on_get() {
        let cli = parse_and_validate(["strubs", "get", "/a/b", "--range", "0-99"]).unwrap();
        match cli.command {
            ValidatedCommand::Get { range, .. } => assert_eq!(range, Some((0, 99))),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_volumes_list() {
        let cli = parse_and_validate(["strubs", "volumes", "list"]).unwrap();
        assert!(matches!(cli.command, ValidatedCommand::VolumesList));
    }
}
