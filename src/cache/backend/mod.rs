//! Storage Backends
//!
//! Where cached payloads actually live. The engine keeps the index; a backend
//! only stores, retrieves and removes strings by key.

mod file;
mod memory;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{CacheKey, ContentKind};
use crate::error::{CacheError, Result};

pub use file::{FileBackend, DEFAULT_CACHE_DIR};
pub use memory::MemoryBackend;

// == Storage Backend ==
/// Persistence abstraction for cached payloads.
///
/// `kind` is the payload kind declared by the caller at store time and is
/// passed back on every later call for the same key.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Creates or overwrites the payload for `key`.
    async fn store(&self, key: &CacheKey, kind: ContentKind, value: &str) -> Result<()>;

    /// Reads the payload for `key`. A missing payload is `Ok(None)`.
    async fn retrieve(&self, key: &CacheKey, kind: ContentKind) -> Result<Option<String>>;

    /// Deletes the payload for `key`. Absent payloads are not an error.
    async fn remove(&self, key: &CacheKey, kind: ContentKind) -> Result<()>;

    /// Removes everything this backend holds, best-effort.
    ///
    /// Returns the number of payloads that could not be removed.
    async fn clear_all(&self) -> usize;
}

// == Backend Kind ==
/// Named built-in backends, for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

impl BackendKind {
    /// Builds the backend; `root` is only used by file storage.
    pub fn build(&self, root: impl Into<PathBuf>) -> Result<Arc<dyn StorageBackend>> {
        Ok(match self {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File => Arc::new(FileBackend::new(root)?),
        })
    }
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown storage backend '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("Memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("file".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_build_file_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("cache");

        BackendKind::File.build(&root).unwrap();
        assert!(root.is_dir());
    }
}
