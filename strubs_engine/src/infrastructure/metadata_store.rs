// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Metadata Store Adapter
//!
//! Implements `strubs_domain`'s [`MetadataStore`] and [`RuntimeConfigStore`]
//! ports against a local SQLite database (§4.9), migrated via
//! `sqlx::migrate!` against `../migrations` on start-up. Object and volume
//! rows are plain columns; the handful of structured fields that don't map
//! to SQL scalars (`data_volumes`, `slice_errors`) are stored as JSON text,
//! since the metadata store is explicitly out of scope for its own query
//! language (§1 Non-goals).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::{Row, Sqlite, SqlitePool};

use strubs_domain::entities::{ObjectRecord, SliceErrorEntry, VolumeRecord, VolumeState};
use strubs_domain::error::StrubsError;
use strubs_domain::repositories::metadata_store::MetadataStore;
use strubs_domain::repositories::runtime_config::{LastVerifySummary, RuntimeConfigStore};
use strubs_domain::value_objects::{ObjectId, VolumeId};

fn db_err(err: sqlx::Error) -> StrubsError {
    StrubsError::database(err.to_string())
}

/// Creates the SQLite database file at `database_url` if missing, connects
/// a pool, and runs every pending migration under `../migrations` (§4.9).
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, StrubsError> {
    if !Sqlite::database_exists(database_url).await.map_err(db_err)? {
        Sqlite::create_database(database_url).await.map_err(db_err)?;
    }
    let pool = SqlitePool::connect(database_url).await.map_err(db_err)?;
    sqlx::migrate!("../migrations").run(&pool).await.map_err(|e| StrubsError::database(e.to_string()))?;
    Ok(pool)
}

fn container_id_to_column(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

fn container_id_from_column(value: &str) -> Option<ObjectId> {
    if value.is_empty() {
        None
    } else {
        ObjectId::from_hex(value).ok()
    }
}

fn volume_state_to_column(state: VolumeState) -> &'static str {
    match state {
        VolumeState::Online => "online",
        VolumeState::Draining => "draining",
        VolumeState::Offline => "offline",
    }
}

fn volume_state_from_column(value: &str) -> Result<VolumeState, StrubsError> {
    match value {
        "online" => Ok(VolumeState::Online),
        "draining" => Ok(VolumeState::Draining),
        "offline" => Ok(VolumeState::Offline),
        other => Err(StrubsError::internal(format!("invalid volume state: {other}"))),
    }
}

fn row_to_object(row: &sqlx::sqlite::SqliteRow) -> Result<ObjectRecord, StrubsError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let container_id: String = row.try_get("container_id").map_err(db_err)?;
    let md5: Vec<u8> = row.try_get("md5").map_err(db_err)?;
    let mut md5_arr = [0u8; 16];
    md5_arr.copy_from_slice(&md5);

    let data_volumes: String = row.try_get("data_volumes").map_err(db_err)?;
    let parity_volumes: String = row.try_get("parity_volumes").map_err(db_err)?;
    let slice_errors: Option<String> = row.try_get("slice_errors").map_err(db_err)?;
    let last_verified_at: Option<String> = row.try_get("last_verified_at").map_err(db_err)?;
    let created_at: String = row.try_get("created_at").map_err(db_err)?;

    Ok(ObjectRecord {
        id: ObjectId::from_hex(&id)?,
        container_id: container_id_from_column(&container_id),
        name: row.try_get("name").map_err(db_err)?,
        size: row.try_get::<i64, _>("size").map_err(db_err)? as u64,
        mime: row.try_get("mime").map_err(db_err)?,
        md5: md5_arr,
        chunk_size: row.try_get::<i64, _>("chunk_size").map_err(db_err)? as u32,
        k: row.try_get::<i64, _>("k").map_err(db_err)? as u16,
        m: row.try_get::<i64, _>("m").map_err(db_err)? as u16,
        data_volumes: serde_json::from_str(&data_volumes)?,
        parity_volumes: serde_json::from_str(&parity_volumes)?,
        slice_errors: slice_errors.map(|s| serde_json::from_str::<BTreeMap<u16, SliceErrorEntry>>(&s)).transpose()?,
        last_verified_at: last_verified_at.map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc))).transpose().map_err(|e| StrubsError::internal(e.to_string()))?,
        is_container: row.try_get::<i64, _>("is_container").map_err(db_err)? != 0,
        created_at: DateTime::parse_from_rfc3339(&created_at).map_err(|e| StrubsError::internal(e.to_string()))?.with_timezone(&Utc),
    })
}

fn row_to_volume(row: &sqlx::sqlite::SqliteRow) -> Result<VolumeRecord, StrubsError> {
    let id: i64 = row.try_get("id").map_err(db_err)?;
    let uuid: String = row.try_get("uuid").map_err(db_err)?;
    let state: String = row.try_get("state").map_err(db_err)?;
    let mut record = VolumeRecord::new(
        VolumeId::new(id as u32),
        uuid::Uuid::parse_str(&uuid).map_err(|e| StrubsError::internal(e.to_string()))?,
        row.try_get::<String, _>("mount_path").map_err(db_err)?,
        row.try_get::<i64, _>("priority").map_err(db_err)? as i32,
    );
    record.state = volume_state_from_column(&state)?;
    record.verify_errors.checksum = row.try_get::<i64, _>("verify_checksum_errors").map_err(db_err)? as u64;
    record.verify_errors.total = row.try_get::<i64, _>("verify_total_errors").map_err(db_err)? as u64;
    Ok(record)
}

/// SQLite-backed implementation of both metadata ports.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn get_object_by_id(&self, id: ObjectId) -> Result<Option<ObjectRecord>, StrubsError> {
        let row = sqlx::query("SELECT * FROM objects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_object).transpose()
    }

    async fn get_object_by_path(&self, container_id: Option<ObjectId>, name: &str) -> Result<Option<ObjectRecord>, StrubsError> {
        let row = sqlx::query("SELECT * FROM objects WHERE container_id = ? AND name = ?")
            .bind(container_id_to_column(container_id))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_object).transpose()
    }

    async fn get_or_create_container(&self, path_components: &[String]) -> Result<ObjectId, StrubsError> {
        let mut parent: Option<ObjectId> = None;
        let mut current = ObjectId::new();
        for name in path_components {
            if let Some(existing) = self.get_object_by_path(parent, name).await? {
                current = existing.id;
            } else {
                current = ObjectId::new();
                let record = ObjectRecord::new_container(current, parent, name.clone(), Utc::now());
                self.insert_object(&record).await?;
            }
            parent = Some(current);
        }
        Ok(current)
    }

    async fn insert_object(&self, record: &ObjectRecord) -> Result<(), StrubsError> {
        let data_volumes = serde_json::to_string(&record.data_volumes)?;
        let parity_volumes = serde_json::to_string(&record.parity_volumes)?;
        let slice_errors = record.slice_errors.as_ref().map(serde_json::to_string).transpose()?;
        let last_verified_at = record.last_verified_at.map(|t| t.to_rfc3339());

        sqlx::query(
            "INSERT INTO objects (id, container_id, name, size, mime, md5, chunk_size, k, m, data_volumes, parity_volumes, slice_errors, last_verified_at, is_container, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(container_id_to_column(record.container_id))
        .bind(&record.name)
        .bind(record.size as i64)
        .bind(&record.mime)
        .bind(record.md5.to_vec())
        .bind(record.chunk_size as i64)
        .bind(record.k as i64)
        .bind(record.m as i64)
        .bind(data_volumes)
        .bind(parity_volumes)
        .bind(slice_errors)
        .bind(last_verified_at)
        .bind(record.is_container as i64)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_object(&self, id: ObjectId) -> Result<(), StrubsError> {
        sqlx::query("DELETE FROM objects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_objects_needing_verification(&self, started_at: DateTime<Utc>, limit: usize) -> Result<Vec<ObjectRecord>, StrubsError> {
        let rows = sqlx::query(
            "SELECT * FROM objects WHERE is_container = 0 AND (last_verified_at IS NULL OR last_verified_at < ?) ORDER BY id LIMIT ?",
        )
        .bind(started_at.to_rfc3339())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_object).collect()
    }

    async fn update_object_verification_state(
        &self,
        id: ObjectId,
        last_verified_at: DateTime<Utc>,
        slice_errors: Option<BTreeMap<u16, SliceErrorEntry>>,
    ) -> Result<(), StrubsError> {
        let slice_errors_json = slice_errors.as_ref().map(serde_json::to_string).transpose()?;
        let result = sqlx::query("UPDATE objects SET last_verified_at = ?, slice_errors = ? WHERE id = ?")
            .bind(last_verified_at.to_rfc3339())
            .bind(slice_errors_json)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StrubsError::not_found(format!("object {id} not found")));
        }
        Ok(())
    }

    async fn get_volume(&self, id: VolumeId) -> Result<Option<VolumeRecord>, StrubsError> {
        let row = sqlx::query("SELECT * FROM volumes WHERE id = ?")
            .bind(id.value() as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_volume).transpose()
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, StrubsError> {
        let rows = sqlx::query("SELECT * FROM volumes ORDER BY id").fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(row_to_volume).collect()
    }

    async fn set_volume_verify_errors(&self, volume_id: VolumeId, checksum: u64, total: u64) -> Result<(), StrubsError> {
        sqlx::query("UPDATE volumes SET verify_checksum_errors = ?, verify_total_errors = ? WHERE id = ?")
            .bind(checksum as i64)
            .bind(total as i64)
            .bind(volume_id.value() as i64)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

impl SqliteMetadataStore {
    /// Inserts (or replaces) a configured volume's static row. Called once
    /// per volume at start-up from the engine's configuration, not part of
    /// the `MetadataStore` port since volume configuration is out of scope
    /// for per-request code paths.
    pub async fn upsert_volume(&self, id: VolumeId, uuid: uuid::Uuid, mount_path: &str, priority: i32) -> Result<(), StrubsError> {
        sqlx::query(
            "INSERT INTO volumes (id, uuid, mount_path, priority, verify_checksum_errors, verify_total_errors, state) \
             VALUES (?, ?, ?, ?, 0, 0, 'online') \
             ON CONFLICT(id) DO UPDATE SET uuid = excluded.uuid, mount_path = excluded.mount_path, priority = excluded.priority",
        )
        .bind(id.value() as i64)
        .bind(uuid.to_string())
        .bind(mount_path)
        .bind(priority)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

const VERIFY_STARTED_AT_KEY: &str = "verify_started_at";
const LAST_VERIFY_KEY: &str = "last_verify";

#[async_trait]
impl RuntimeConfigStore for SqliteMetadataStore {
    async fn get_verify_started_at(&self) -> Result<Option<DateTime<Utc>>, StrubsError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM runtime_config WHERE key = ?")
            .bind(VERIFY_STARTED_AT_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        value
            .map(|v| DateTime::parse_from_rfc3339(&v).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| StrubsError::internal(e.to_string()))
    }

    async fn set_verify_started_at(&self, started_at: DateTime<Utc>) -> Result<(), StrubsError> {
        sqlx::query("INSERT INTO runtime_config (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value")
            .bind(VERIFY_STARTED_AT_KEY)
            .bind(started_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn clear_verify_started_at(&self) -> Result<(), StrubsError> {
        sqlx::query("DELETE FROM runtime_config WHERE key = ?")
            .bind(VERIFY_STARTED_AT_KEY)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_last_verify(&self) -> Result<Option<LastVerifySummary>, StrubsError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM runtime_config WHERE key = ?")
            .bind(LAST_VERIFY_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        value.map(|v| serde_json::from_str(&v)).transpose().map_err(StrubsError::from)
    }

    async fn set_last_verify(&self, summary: LastVerifySummary) -> Result<(), StrubsError> {
        let value = serde_json::to_string(&summary)?;
        sqlx::query("INSERT INTO runtime_config (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value")
            .bind(LAST_VERIFY_KEY)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
