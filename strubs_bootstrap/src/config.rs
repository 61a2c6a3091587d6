// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration
//!
//! The handful of settings needed before the engine's own configuration
//! layer (`strubs_engine::infrastructure::config::EngineConfig`) can be
//! loaded: where the engine config file lives, and how verbose to be before
//! a logger exists. Deliberately small; everything else is the engine's
//! concern.

use std::path::PathBuf;

/// Settings resolved from CLI flags before any engine service starts.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Path to the engine's TOML config file.
    pub config_path: PathBuf,
    /// Verbosity requested on the command line (`-v`, `-vv`, ...).
    pub verbose: u8,
}

impl BootstrapConfig {
    pub fn new(config_path: PathBuf, verbose: u8) -> Self {
        Self { config_path, verbose }
    }

    /// Maps verbosity flag count to a `tracing` filter directive, used to
    /// configure logging before the engine's richer config is available.
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("strubs.toml"), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_strubs_toml() {
        let cfg = BootstrapConfig::default();
        assert_eq!(cfg.config_path, PathBuf::from("strubs.toml"));
        assert_eq!(cfg.verbose, 0);
    }

    #[test]
    fn verbosity_maps_to_filter_directives() {
        assert_eq!(BootstrapConfig::new("x.toml".into(), 0).default_log_filter(), "warn");
        assert_eq!(BootstrapConfig::new("x.toml".into(), 1).default_log_filter(), "info");
        assert_eq!(BootstrapConfig::new("x.toml".into(), 2).default_log_filter(), "debug");
        assert_eq!(BootstrapConfig::new("x.toml".into(), 5).default_log_filter(), "trace");
    }
}
