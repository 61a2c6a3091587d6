// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `strubs` binary
//!
//! The composition root: parses and validates CLI arguments
//! (`strubs-bootstrap`), resolves engine configuration, wires the
//! infrastructure adapters to the domain ports, runs the startup orphan
//! temp-file sweep (§6), installs signal handling into the process-wide
//! `IoShutdownToken` (§4.8), dispatches the one requested command, and maps
//! the result to a process exit code (§7).

use std::process::ExitCode;
use std::sync::Arc;

use strubs_bootstrap::{bootstrap_cli, exit_code, BootstrapConfig, ValidatedCli};
use strubs_domain::error::StrubsError;
use strubs_domain::io_shutdown::IoShutdownToken;
use strubs_domain::value_objects::VolumeId;
use strubs_domain::volume_registry::VolumeRegistry;

use strubs_engine::application::service::StrubsService;
use strubs_engine::infrastructure::config::EngineConfig;
use strubs_engine::infrastructure::metadata_store::{initialize_database, SqliteMetadataStore};
use strubs_engine::infrastructure::metrics::EngineMetrics;
use strubs_engine::infrastructure::{commit, logging};
use strubs_engine::presentation;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(exit_code::ExitCode::Usage.as_i32() as u8);
        }
    };

    let bootstrap_config = BootstrapConfig::new(cli.config.clone(), cli.verbose);
    logging::init(bootstrap_config.default_log_filter(), true);

    let result = run(cli).await;
    ExitCode::from(exit_code::result_to_exit_code(result).as_i32() as u8)
}

async fn run(cli: ValidatedCli) -> Result<(), StrubsError> {
    let config = EngineConfig::load(Some(&cli.config))?;

    tokio::fs::create_dir_all(&config.run_dir)
        .await
        .map_err(|e| StrubsError::io(0, 0, format!("creating run dir {}: {e}", config.run_dir.display())))?;

    let host_id = load_or_create_identity(&config.identity_file).await?;
    tracing::info!(host_id = %host_id, "loaded host identity");

    let pool = initialize_database(&config.database_url).await?;
    let metadata = Arc::new(SqliteMetadataStore::new(pool));

    let registry = Arc::new(VolumeRegistry::new());
    let volume_roots: Vec<std::path::PathBuf> = config.volumes.iter().map(|v| v.mount_path.clone()).collect();
    for (index, volume) in config.volumes.iter().enumerate() {
        let id = VolumeId::new(index as u32);
        let mount_path = volume.mount_path.to_string_lossy().to_string();
        registry.register(id, mount_path.clone(), 0);
        metadata.upsert_volume(id, uuid::Uuid::new_v4(), &mount_path, volume.priority).await?;
    }

    commit::sweep_orphan_temp_files(&volume_roots).await?;

    let metrics = Arc::new(EngineMetrics::new()?);
    let shutdown = IoShutdownToken::new();
    strubs_bootstrap::signals::install_signal_handlers(shutdown.clone());

    let service = StrubsService::new(
        metadata.clone(),
        metadata,
        registry,
        metrics,
        shutdown,
        config.k as u16,
        config.m as u16,
        config.chunk_size()?,
        config.verifier_batch_size,
        config.verifier_progress_interval,
    );

    let output = presentation::dispatch(&service, cli.command).await?;
    println!("{output}");
    Ok(())
}

/// Loads the 24-hex host identity string from `path`, generating and
/// persisting a fresh one on first run (§6 "Identity file").
async fn load_or_create_identity(path: &std::path::Path) -> Result<String, StrubsError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents.trim().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            use rand::RngCore;
            let mut bytes = [0u8; 12];
            rand::rng().fill_bytes(&mut bytes);
            let id = hex::encode(bytes);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StrubsError::io(0, 0, format!("creating identity dir: {e}")))?;
            }
            tokio::fs::write(path, &id)
                .await
                .map_err(|e| StrubsError::io(0, 0, format!("writing identity file: {e}")))?;
            Ok(id)
        }
        Err(e) => Err(StrubsError::io(0, 0, format!("reading identity file: {e}"))),
    }
}
