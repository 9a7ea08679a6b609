//! File storage: one file per entry at `{root}/{key}.{ext}`.
//!
//! No manifest is written. After a restart the engine's index starts empty
//! and files left behind by a previous process are orphans until a new store
//! for the same key overwrites them or the directory is cleaned externally.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::StorageBackend;
use crate::cache::{CacheKey, ContentKind};
use crate::error::Result;

/// Default root directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "./tresor_cache";

/// File-per-entry storage rooted under a directory.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    /// Paths created by this process, for `clear_all`
    files: Mutex<HashSet<PathBuf>>,
}

impl FileBackend {
    // == Constructor ==
    /// Creates the backend, creating `root` and its parents if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!(root = ?root, "File cache backend initialized");

        Ok(Self {
            root,
            files: Mutex::new(HashSet::new()),
        })
    }

    /// Location of the payload file for a key.
    pub fn file_path(&self, key: &CacheKey, kind: ContentKind) -> PathBuf {
        self.root.join(format!("{}.{}", key, kind.extension()))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn store(&self, key: &CacheKey, kind: ContentKind, value: &str) -> Result<()> {
        let path = self.file_path(key, kind);
        fs::write(&path, value).await?;
        debug!(path = ?path, bytes = value.len(), "Wrote cache file");

        self.files.lock().await.insert(path);
        Ok(())
    }

    async fn retrieve(&self, key: &CacheKey, kind: ContentKind) -> Result<Option<String>> {
        let path = self.file_path(key, kind);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            // Removed between the existence check and the read
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &CacheKey, kind: ContentKind) -> Result<()> {
        let path = self.file_path(key, kind);
        match fs::remove_file(&path).await {
            Ok(()) => debug!(path = ?path, "Removed cache file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.files.lock().await.remove(&path);
        Ok(())
    }

    async fn clear_all(&self) -> usize {
        let files: Vec<PathBuf> = self.files.lock().await.drain().collect();
        let mut failures = 0;

        for path in files {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    failures += 1;
                    warn!(path = ?path, error = %e, "Failed to remove cache file during clear");
                }
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::derive_key;
    use tempfile::tempdir;

    async fn tracked_files(backend: &FileBackend) -> usize {
        backend.files.lock().await.len()
    }

    #[tokio::test]
    async fn test_file_new_creates_root_idempotently() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("a").join("b");

        FileBackend::new(&root).unwrap();
        FileBackend::new(&root).unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_file_path_uses_key_and_extension() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let key = derive_key("/page", None);

        let path = backend.file_path(&key, ContentKind::Html);
        assert_eq!(path, dir.path().join(format!("{}.html", key)));
    }

    #[tokio::test]
    async fn test_file_store_and_retrieve() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let key = derive_key("/a", Some("token"));

        backend
            .store(&key, ContentKind::Json, r#"{"hello":"world"}"#)
            .await
            .unwrap();

        assert!(backend.file_path(&key, ContentKind::Json).exists());
        let value = backend.retrieve(&key, ContentKind::Json).await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"hello":"world"}"#));
        assert_eq!(tracked_files(&backend).await, 1);
    }

    #[tokio::test]
    async fn test_file_retrieve_missing() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();

        let value = backend
            .retrieve(&derive_key("/nope", None), ContentKind::Json)
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_file_kind_selects_file() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let key = derive_key("/a", None);

        backend.store(&key, ContentKind::Html, "<p>hi</p>").await.unwrap();

        let as_json = backend.retrieve(&key, ContentKind::Json).await.unwrap();
        assert!(as_json.is_none());
    }

    #[tokio::test]
    async fn test_file_remove() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let key = derive_key("/a", None);

        backend.store(&key, ContentKind::Json, "1").await.unwrap();
        backend.remove(&key, ContentKind::Json).await.unwrap();

        assert!(!backend.file_path(&key, ContentKind::Json).exists());
        assert_eq!(tracked_files(&backend).await, 0);

        // Removing again is a no-op
        backend.remove(&key, ContentKind::Json).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_fails_without_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cache");
        let backend = FileBackend::new(&root).unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        let result = backend
            .store(&derive_key("/a", None), ContentKind::Json, "1")
            .await;
        assert!(result.is_err());
        assert_eq!(tracked_files(&backend).await, 0);
    }

    #[tokio::test]
    async fn test_file_retrieve_surfaces_read_errors() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let key = derive_key("/a", None);

        // A directory where the payload file should be cannot be read as text.
        std::fs::create_dir(backend.file_path(&key, ContentKind::Json)).unwrap();

        assert!(backend.retrieve(&key, ContentKind::Json).await.is_err());
    }

    #[tokio::test]
    async fn test_file_clear_all_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let first = derive_key("/a", None);
        let second = derive_key("/b", None);

        backend.store(&first, ContentKind::Json, "1").await.unwrap();
        backend.store(&second, ContentKind::Html, "2").await.unwrap();

        // Deleted behind the backend's back
        std::fs::remove_file(backend.file_path(&first, ContentKind::Json)).unwrap();

        assert_eq!(backend.clear_all().await, 0);
        assert!(!backend.file_path(&second, ContentKind::Html).exists());
        assert_eq!(tracked_files(&backend).await, 0);
    }

    #[tokio::test]
    async fn test_file_clear_all_counts_failures_and_continues() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let bad = derive_key("/bad", None);
        let good = derive_key("/good", None);

        backend.store(&bad, ContentKind::Json, "1").await.unwrap();
        backend.store(&good, ContentKind::Json, "2").await.unwrap();

        // Replace one tracked file with a non-empty directory so unlinking fails.
        let bad_path = backend.file_path(&bad, ContentKind::Json);
        std::fs::remove_file(&bad_path).unwrap();
        std::fs::create_dir(&bad_path).unwrap();
        std::fs::write(bad_path.join("inner"), "x").unwrap();

        assert_eq!(backend.clear_all().await, 1);
        assert!(!backend.file_path(&good, ContentKind::Json).exists());
    }
}
