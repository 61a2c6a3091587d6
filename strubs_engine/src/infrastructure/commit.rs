// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Commit / Delete Protocol
//!
//! The two-step commit sequence for a just-written object (§4.5 step 1-2):
//! every slice file was already `fsync`'d by `WritePipeline::end`, so this
//! module only renames `K+M` temp files to their final paths, rolling back
//! (deleting temps and any already-renamed finals) if any single rename
//! fails. `delete_slices` is the symmetric tolerant unlink used both by
//! `delete()` and by rollback paths elsewhere in the application layer.

use std::path::{Path, PathBuf};

use strubs_domain::error::StrubsError;

use crate::infrastructure::chunk_io;

/// Removes every orphan `*.tmp-*` slice file under `volume_roots`, run once
/// at process start-up before any write is admitted (§6, §8 property 4:
/// "startup sweep removes all temp files"). A temp file can only exist if
/// the process died between `WritePipeline::create` and `commit()`, so any
/// match here is safe to delete unconditionally; no metadata record can
/// reference a temp-named path.
pub async fn sweep_orphan_temp_files(volume_roots: &[PathBuf]) -> Result<usize, StrubsError> {
    let mut removed = 0usize;
    for root in volume_roots {
        removed += sweep_dir(root.clone()).await?;
    }
    Ok(removed)
}

async fn sweep_dir(dir: PathBuf) -> Result<usize, StrubsError> {
    let mut removed = 0usize;
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(StrubsError::io(0, 0, e.to_string())),
    };
    while let Some(entry) = entries.next_entry().await.map_err(|e| StrubsError::io(0, 0, e.to_string()))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
        if file_type.is_dir() {
            removed += Box::pin(sweep_dir(path)).await?;
        } else if is_orphan_temp_name(&path) {
            chunk_io::remove_if_exists(path).await.map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn is_orphan_temp_name(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.contains(".tmp-"))
}

/// Renames every `(temp, final)` pair in order. On the first failure,
/// removes the temp files that hadn't renamed yet and the final files that
/// already had, leaving no partially-committed object behind (§4.5 step 2:
/// "all-or-nothing rename").
pub async fn commit_slices(slice_paths: &[(PathBuf, PathBuf)]) -> Result<(), StrubsError> {
    let mut renamed: Vec<&Path> = Vec::with_capacity(slice_paths.len());
    for (temp, final_path) in slice_paths {
        match chunk_io::commit_rename(temp.clone(), final_path.clone()).await {
            Ok(()) => renamed.push(final_path.as_path()),
            Err(err) => {
                for done in &renamed {
                    let _ = chunk_io::remove_if_exists(done.to_path_buf()).await;
                }
                for (t, _) in slice_paths {
                    let _ = chunk_io::remove_if_exists(t.clone()).await;
                }
                return Err(StrubsError::commit(format!("slice rename failed: {err}")));
            }
        }
    }
    Ok(())
}

/// Unlinks every slice file, tolerating already-missing ones (§4.5
/// `delete()`, §8 property 5: delete is idempotent).
pub async fn delete_slices(slice_paths: &[PathBuf]) -> Result<(), StrubsError> {
    for path in slice_paths {
        chunk_io::remove_if_exists(path.clone())
            .await
            .map_err(|e| StrubsError::io(0, 0, e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn touch(path: &Path) {
        tokio::fs::write(path, b"x").await.unwrap();
    }

    #[tokio::test]
    async fn commits_every_slice_on_success() {
        let dir = tempdir().unwrap();
        let mut pairs = Vec::new();
        for i in 0..3 {
            let temp = dir.path().join(format!("s{i}.tmp"));
            let final_path = dir.path().join(format!("s{i}"));
            touch(&temp).await;
            pairs.push((temp, final_path));
        }
        commit_slices(&pairs).await.unwrap();
        for (temp, final_path) in &pairs {
            assert!(!temp.exists());
            assert!(final_path.exists());
        }
    }

    #[tokio::test]
    async fn rolls_back_renamed_slices_when_one_rename_fails() {
        let dir = tempdir().unwrap();
        let temp0 = dir.path().join("s0.tmp");
        let final0 = dir.path().join("s0");
        touch(&temp0).await;

        // s1's temp file is deliberately missing, so its rename fails.
        let temp1 = dir.path().join("s1.tmp");
        let final1 = dir.path().join("s1");

        let pairs = vec![(temp0.clone(), final0.clone()), (temp1, final1.clone())];
        let err = commit_slices(&pairs).await.unwrap_err();
        assert_eq!(err.code(), "ECOMMIT");
        assert!(!final0.exists());
        assert!(!final1.exists());
    }

    #[tokio::test]
    async fn delete_slices_tolerates_missing_files() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present");
        touch(&present).await;
        let missing = dir.path().join("missing");
        delete_slices(&[present.clone(), missing]).await.unwrap();
        assert!(!present.exists());
    }

    #[tokio::test]
    async fn sweep_removes_nested_orphan_temp_files_but_keeps_final_ones() {
        let dir = tempdir().unwrap();
        let shard = dir.path().join("ab").join("cd");
        tokio::fs::create_dir_all(&shard).await.unwrap();
        let orphan = shard.join("deadbeef.0.tmp-00112233");
        let committed = shard.join("deadbeef.0");
        touch(&orphan).await;
        touch(&committed).await;

        let removed = sweep_orphan_temp_files(&[dir.path().to_path_buf()]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!orphan.exists());
        assert!(committed.exists());
    }

    #[tokio::test]
    async fn sweep_tolerates_a_missing_volume_root() {
        let dir = tempdir().unwrap();
        let missing_root = dir.path().join("does-not-exist");
        let removed = sweep_orphan_temp_files(&[missing_root]).await.unwrap();
        assert_eq!(removed, 0);
    }
}
