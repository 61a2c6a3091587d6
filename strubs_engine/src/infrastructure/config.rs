// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! Resolves [`EngineConfig`] from an optional TOML file plus `STRUBS_*`
//! environment variable overrides, using the `config` crate the way the
//! donor's own `infrastructure::config` module was scaffolded for (§4.10).
//! Immutable once built; [`EngineConfigBuilder`] validates required fields
//! at `build()` time rather than leaving partially-constructed state
//! reachable.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use strubs_domain::error::StrubsError;
use strubs_domain::value_objects::chunk_size::DEFAULT_CHUNK_SIZE;

/// One configured volume mount point (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub mount_path: PathBuf,
    #[serde(default)]
    pub priority: i32,
}

/// Default erasure parameter `K` when a request doesn't override it.
pub const DEFAULT_K: usize = 4;
/// Default erasure parameter `M` when a request doesn't override it.
pub const DEFAULT_M: usize = 2;
pub const DEFAULT_VERIFIER_BATCH_SIZE: usize = 25;
pub const DEFAULT_VERIFIER_PROGRESS_INTERVAL_SECS: u64 = 5;

/// Fully resolved, immutable engine configuration (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub k: usize,
    pub m: usize,
    pub chunk_size: usize,
    pub volumes: Vec<VolumeConfig>,
    pub run_dir: PathBuf,
    pub identity_file: PathBuf,
    pub database_url: String,
    pub verifier_batch_size: usize,
    #[serde(with = "duration_secs")]
    pub verifier_progress_interval: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

impl EngineConfig {
    /// Loads configuration from an optional TOML file at `path`, overlaid
    /// with `STRUBS_*` environment variables (e.g. `STRUBS__DATABASE_URL`),
    /// using the `config` crate's layered builder.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, StrubsError> {
        let mut builder = config::Config::builder()
            .set_default("k", DEFAULT_K as i64)
            .map_err(config_err)?
            .set_default("m", DEFAULT_M as i64)
            .map_err(config_err)?
            .set_default("chunk_size", DEFAULT_CHUNK_SIZE as i64)
            .map_err(config_err)?
            .set_default("run_dir", "/var/run/strubs")
            .map_err(config_err)?
            .set_default("identity_file", "/var/lib/strubs/identity")
            .map_err(config_err)?
            .set_default("database_url", "sqlite:///var/lib/strubs/metadata.db")
            .map_err(config_err)?
            .set_default("verifier_batch_size", DEFAULT_VERIFIER_BATCH_SIZE as i64)
            .map_err(config_err)?
            .set_default("verifier_progress_interval", DEFAULT_VERIFIER_PROGRESS_INTERVAL_SECS as i64)
            .map_err(config_err)?
            .set_default("volumes", Vec::<String>::new())
            .map_err(config_err)?;

        if let Some(path) = path {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            }
        }
        builder = builder.add_source(config::Environment::with_prefix("STRUBS").separator("__"));

        let resolved = builder.build().map_err(config_err)?;
        resolved.try_deserialize().map_err(config_err)
    }

    pub fn chunk_size(&self) -> Result<strubs_domain::value_objects::ChunkSize, StrubsError> {
        strubs_domain::value_objects::ChunkSize::new(self.chunk_size)
    }
}

fn config_err(err: config::ConfigError) -> StrubsError {
    StrubsError::internal(format!("configuration error: {err}"))
}

/// Validating builder for [`EngineConfig`], for callers constructing it
/// programmatically (tests, `strubs volumes` bootstrapping) rather than
/// from a file.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    k: Option<usize>,
    m: Option<usize>,
    chunk_size: Option<usize>,
    volumes: Vec<VolumeConfig>,
    run_dir: Option<PathBuf>,
    identity_file: Option<PathBuf>,
    database_url: Option<String>,
    verifier_batch_size: usize,
    verifier_progress_interval: Duration,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            verifier_batch_size: DEFAULT_VERIFIER_BATCH_SIZE,
            verifier_progress_interval: Duration::from_secs(DEFAULT_VERIFIER_PROGRESS_INTERVAL_SECS),
            ..Default::default()
        }
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn m(mut self, m: usize) -> Self {
        self.m = Some(m);
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    pub fn volume(mut self, mount_path: impl Into<PathBuf>, priority: i32) -> Self {
        self.volumes.push(VolumeConfig {
            mount_path: mount_path.into(),
            priority,
        });
        self
    }

    pub fn run_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(path.into());
        self
    }

    pub fn identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn try_build(self) -> Result<EngineConfig, StrubsError> {
        if self.volumes.len() < 2 {
            return Err(StrubsError::internal("at least 2 volumes must be configured"));
        }
        let k = self.k.unwrap_or(DEFAULT_K);
        let m = self.m.unwrap_or(DEFAULT_M);
        if self.volumes.len() < k + m {
            return Err(StrubsError::internal(format!(
                "{} volumes configured, need at least k+m = {}",
                self.volumes.len(),
                k + m
            )));
        }
        Ok(EngineConfig {
            k,
            m,
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            volumes: self.volumes,
            run_dir: self.run_dir.unwrap_or_else(|| PathBuf::from("/var/run/strubs")),
            identity_file: self.identity_file.unwrap_or_else(|| PathBuf::from("/var/lib/strubs/identity")),
            database_url: self.database_url.unwrap_or_else(|| "sqlite::memory:".to_string()),
            verifier_batch_size: self.verifier_batch_size,
            verifier_progress_interval: self.verifier_progress_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_fewer_than_two_volumes() {
        let err = EngineConfigBuilder::new().volume("/mnt/v0", 0).try_build().unwrap_err();
        assert!(err.to_string().contains("at least 2 volumes"));
    }

    #[test]
    fn builder_rejects_fewer_volumes_than_k_plus_m() {
        let err = EngineConfigBuilder::new()
            .k(4)
            .m(2)
            .volume("/mnt/v0", 0)
            .volume("/mnt/v1", 0)
            .try_build()
            .unwrap_err();
        assert!(err.to_string().contains("k+m"));
    }

    #[test]
    fn builder_succeeds_with_enough_volumes() {
        let config = EngineConfigBuilder::new()
            .k(2)
            .m(1)
            .volume("/mnt/v0", 0)
            .volume("/mnt/v1", 0)
            .volume("/mnt/v2", 0)
            .try_build()
            .unwrap();
        assert_eq!(config.volumes.len(), 3);
        assert_eq!(config.verifier_batch_size, DEFAULT_VERIFIER_BATCH_SIZE);
    }

    #[test]
    fn load_applies_defaults_with_no_file() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.k, DEFAULT_K);
        assert_eq!(config.m, DEFAULT_M);
        assert_eq!(config.verifier_batch_size, DEFAULT_VERIFIER_BATCH_SIZE);
    }
}
