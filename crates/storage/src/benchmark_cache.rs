// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable on-disk persistence for benchmark rows (§4.D).
//!
//! `Save` is atomic: write to `<path>.tmp`, fsync, rename, fsync the parent
//! directory. A crash mid-write leaves the previous version intact and
//! never leaves a stray `.tmp` file on success.

use crate::error::BenchmarkCacheError;
use agent_core::BenchmarkRow;
use std::path::{Path, PathBuf};

/// Abstracts the filesystem operations behind `Save`/`Load`/`Clear` so the
/// atomicity sequence can be exercised (and fault-injected) without real
/// disk I/O.
pub trait CacheWriter: Send + Sync + 'static {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), BenchmarkCacheError>;
    fn fsync_file(&self, path: &Path) -> Result<(), BenchmarkCacheError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), BenchmarkCacheError>;
    fn fsync_dir(&self, path: &Path) -> Result<(), BenchmarkCacheError>;
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, BenchmarkCacheError>;
    fn remove(&self, path: &Path) -> Result<(), BenchmarkCacheError>;
}

#[derive(Clone, Default)]
pub struct FsCacheWriter;

impl CacheWriter for FsCacheWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), BenchmarkCacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), BenchmarkCacheError> {
        std::fs::File::open(path)?.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), BenchmarkCacheError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), BenchmarkCacheError> {
        // Not every platform allows opening a directory for fsync (notably
        // Windows); treat that failure as best-effort rather than fatal.
        match std::fs::File::open(path) {
            Ok(dir) => {
                let _ = dir.sync_all();
                Ok(())
            }
            Err(_) => Ok(()),
        }
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, BenchmarkCacheError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, path: &Path) -> Result<(), BenchmarkCacheError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Atomic JSON-array persistence for [`BenchmarkRow`]s.
pub struct BenchmarkCache<W: CacheWriter = FsCacheWriter> {
    writer: W,
    path: Option<PathBuf>,
}

impl BenchmarkCache<FsCacheWriter> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_writer(FsCacheWriter, Some(path.into()))
    }
}

impl<W: CacheWriter + Clone> BenchmarkCache<W> {
    pub fn with_writer(writer: W, path: Option<PathBuf>) -> Self {
        Self { writer, path }
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Write `rows` atomically. An empty configured path is an error (§4.D).
    pub async fn save(&self, rows: &[BenchmarkRow]) -> Result<(), BenchmarkCacheError> {
        let path = self.path.clone().ok_or(BenchmarkCacheError::EmptyPath)?;
        let data = serde_json::to_vec(rows)?;
        let writer = self.writer.clone();

        tokio::task::spawn_blocking(move || -> Result<(), BenchmarkCacheError> {
            save_blocking(&writer, &path, &data)
        })
        .await??;
        Ok(())
    }

    /// Returns `None` when the file is absent, an empty array, or contains
    /// malformed JSON — the caller re-runs benchmarks in all three cases.
    /// Unknown fields are ignored and a missing `submitted` defaults to
    /// `false` (handled by `BenchmarkRow`'s own `Deserialize`).
    pub fn load(&self) -> Option<Vec<BenchmarkRow>> {
        let path = self.path.as_ref()?;
        let bytes = self.writer.read(path).ok().flatten()?;
        let rows: Vec<BenchmarkRow> = serde_json::from_slice(&bytes).ok()?;
        if rows.is_empty() {
            None
        } else {
            Some(rows)
        }
    }

    /// Idempotent removal. A `None` path is a no-op.
    pub fn clear(&self) -> Result<(), BenchmarkCacheError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        self.writer.remove(path)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn save_blocking(
    writer: &impl CacheWriter,
    path: &Path,
    data: &[u8],
) -> Result<(), BenchmarkCacheError> {
    let tmp_path = BenchmarkCache::<FsCacheWriter>::tmp_path(path);
    writer.write_tmp(&tmp_path, data)?;
    writer.fsync_file(&tmp_path)?;
    writer.rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        writer.fsync_dir(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_rows() -> Vec<BenchmarkRow> {
        vec![
            BenchmarkRow {
                device: "1".into(),
                hash_type: "0".into(),
                runtime_ms: "100".into(),
                hash_time_ms: "50".into(),
                speed_hs: "12345.67".into(),
                submitted: false,
            },
            BenchmarkRow {
                device: "2".into(),
                hash_type: "100".into(),
                runtime_ms: "200".into(),
                hash_time_ms: "100".into(),
                speed_hs: "54321.09".into(),
                submitted: false,
            },
        ]
    }

    #[tokio::test]
    async fn round_trips_rows_through_save_and_load() {
        let dir = tempdir().unwrap();
        let cache = BenchmarkCache::new(dir.path().join("benchmark_cache.json"));
        let rows = sample_rows();
        cache.save(&rows).await.unwrap();
        assert_eq!(cache.load(), Some(rows));
    }

    #[tokio::test]
    async fn save_never_leaves_tmp_file_on_success() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("benchmark_cache.json");
        let cache = BenchmarkCache::new(&path);
        cache.save(&sample_rows()).await.unwrap();
        let tmp = BenchmarkCache::<FsCacheWriter>::tmp_path(&path);
        assert!(!tmp.exists());
    }

    #[test]
    fn load_on_absent_file_returns_none() {
        let dir = tempdir().unwrap();
        let cache = BenchmarkCache::new(dir.path().join("missing.json"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn load_on_empty_array_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("benchmark_cache.json");
        std::fs::write(&path, b"[]").unwrap();
        let cache = BenchmarkCache::new(path);
        assert!(cache.load().is_none());
    }

    #[test]
    fn load_on_corrupt_json_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("benchmark_cache.json");
        std::fs::write(&path, b"{not valid json").unwrap();
        let cache = BenchmarkCache::new(path);
        assert!(cache.load().is_none());
    }

    #[test]
    fn load_ignores_unknown_fields_and_defaults_missing_submitted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("benchmark_cache.json");
        std::fs::write(
            &path,
            br#"[{"device":"1","hash_type":"0","runtime_ms":"1","hash_time_ms":"1","speed_hs":"1","extra_future_field":true}]"#,
        )
        .unwrap();
        let cache = BenchmarkCache::new(path);
        let rows = cache.load().unwrap();
        assert!(!rows[0].submitted);
    }

    #[test]
    fn clear_on_none_path_is_a_no_op() {
        let cache: BenchmarkCache = BenchmarkCache::with_writer(FsCacheWriter, None);
        assert!(cache.clear().is_ok());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = BenchmarkCache::new(dir.path().join("benchmark_cache.json"));
        cache.save(&sample_rows()).await.unwrap();
        cache.clear().unwrap();
        cache.clear().unwrap();
        assert!(cache.load().is_none());
    }

    #[tokio::test]
    async fn empty_path_is_an_error() {
        let cache: BenchmarkCache = BenchmarkCache::with_writer(FsCacheWriter, None);
        let err = cache.save(&sample_rows()).await.unwrap_err();
        assert!(matches!(err, BenchmarkCacheError::EmptyPath));
    }

    /// This crate has no notion of a downstream submit failure — that's
    /// `BenchmarkManager`'s concern in `agent-runner`, exercised there by
    /// `submit_failure_after_successful_save_preserves_the_cache` against a
    /// `FakeApiClient`. What this crate can guarantee on its own is that
    /// nothing short of `save`/`clear` ever touches the file, which the
    /// repeated read below checks.
    #[tokio::test]
    async fn reads_between_saves_never_mutate_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("benchmark_cache.json");
        let cache = BenchmarkCache::new(&path);
        cache.save(&sample_rows()).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        assert_eq!(cache.load(), Some(sample_rows()));
        assert_eq!(cache.load(), Some(sample_rows()));

        let after = std::fs::read(&path).unwrap();
        assert_eq!(before, after);
    }
}
