// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Presentation Layer
//!
//! The thin adapter between `strubs-bootstrap`'s CLI parsing
//! (`ValidatedCommand`) and `application::service::StrubsService`. This is
//! the only place the two crates' command shapes meet: bootstrap knows
//! nothing about `PutObjectCommand`/`GetObjectCommand`/etc., and the
//! service knows nothing about `clap` or megabyte-denominated CLI flags.
//!
//! One public entry point, [`dispatch`], takes a validated command and
//! returns the line(s) of text the binary prints to stdout.

use strubs_bootstrap::ValidatedCommand;
use strubs_domain::error::StrubsError;

use crate::application::commands::{DeleteObjectCommand, GetObjectCommand, PutObjectCommand};
use crate::application::service::StrubsService;

/// Runs one validated CLI command against `service`, returning the text to
/// print on success.
pub async fn dispatch(service: &StrubsService, command: ValidatedCommand) -> Result<String, StrubsError> {
    match command {
        ValidatedCommand::Put {
            path,
            input,
            k,
            m,
            chunk_size_mb,
        } => {
            let result = service
                .put(PutObjectCommand {
                    path,
                    input,
                    k: k.map(|v| v as u16),
                    m: m.map(|v| v as u16),
                    chunk_size: chunk_size_mb.map(|mb| mb * 1024 * 1024),
                })
                .await?;
            Ok(format!("id={} size={} md5={}", result.id, result.size, result.md5_hex))
        }
        ValidatedCommand::Get { path, output, range } => {
            let result = service.get(GetObjectCommand { path, output, range }).await?;
            Ok(format!("bytes_written={}", result.bytes_written))
        }
        ValidatedCommand::Delete { path } => {
            let result = service.delete(DeleteObjectCommand { path }).await?;
            Ok(format!("deleted={}", result.deleted))
        }
        ValidatedCommand::VerifyStart => service.start_verify().await,
        ValidatedCommand::VerifyStop => service.stop_verify().await,
        ValidatedCommand::VerifyStatus => service.verify_status().await,
        ValidatedCommand::VolumesList => service.list_volumes().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use strubs_domain::io_shutdown::IoShutdownToken;
    use strubs_domain::value_objects::{ChunkSize, VolumeId};
    use strubs_domain::volume_registry::VolumeRegistry;
    use tempfile::tempdir;

    use super::*;
    use crate::infrastructure::metadata_store::SqliteMetadataStore;
    use crate::infrastructure::metrics::EngineMetrics;

    async fn make_service(dir: &std::path::Path) -> StrubsService {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("../migrations").run(&pool).await.unwrap();
        let store = Arc::new(SqliteMetadataStore::new(pool));

        let registry = Arc::new(VolumeRegistry::new());
        let dir_path = dir.to_str().unwrap().to_string();
        for i in 0..6u32 {
            registry.register(VolumeId::new(i), dir_path.clone(), 1 << 30);
        }

        StrubsService::new(
            store.clone(),
            store,
            registry,
            Arc::new(EngineMetrics::new().unwrap()),
            IoShutdownToken::new(),
            4,
            2,
            ChunkSize::new(4096).unwrap(),
            25,
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn dispatch_put_then_get_round_trips_via_the_cli_shape() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("in.bin");
        tokio::fs::write(&input_path, b"hello strubs").await.unwrap();

        let service = make_service(dir.path()).await;
        let put_output = dispatch(
            &service,
            ValidatedCommand::Put {
                path: "file.bin".to_string(),
                input: Some(input_path),
                k: None,
                m: None,
                chunk_size_mb: None,
            },
        )
        .await
        .unwrap();
        assert!(put_output.contains("size=12"));

        let get_output = dispatch(
            &service,
            ValidatedCommand::Get {
                path: "file.bin".to_string(),
                output: None,
                range: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(get_output, "bytes_written=12");
    }

    #[tokio::test]
    async fn dispatch_volumes_list_reports_configured_volumes() {
        let dir = tempdir().unwrap();
        let service = make_service(dir.path()).await;
        let output = dispatch(&service, ValidatedCommand::VolumesList).await.unwrap();
        assert_eq!(output, "no volumes configured");
    }

    #[tokio::test]
    async fn dispatch_verify_status_reports_no_run() {
        let dir = tempdir().unwrap();
        let service = make_service(dir.path()).await;
        let output = dispatch(&service, ValidatedCommand::VerifyStatus).await.unwrap();
        assert!(output.contains("no verify run in progress"));
    }
}
