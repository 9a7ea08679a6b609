//! In-memory storage: a process-local map, gone when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StorageBackend;
use crate::cache::{CacheKey, ContentKind};
use crate::error::Result;

/// Process-local key to payload map.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<CacheKey, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads currently held.
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn store(&self, key: &CacheKey, _kind: ContentKind, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.clone(), value.to_string());
        Ok(())
    }

    async fn retrieve(&self, key: &CacheKey, _kind: ContentKind) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &CacheKey, _kind: ContentKind) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn clear_all(&self) -> usize {
        self.values.write().await.clear();
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::derive_key;

    #[tokio::test]
    async fn test_memory_store_and_retrieve() {
        let backend = MemoryBackend::new();
        let key = derive_key("/a", None);

        backend.store(&key, ContentKind::Json, "{}").await.unwrap();
        let value = backend.retrieve(&key, ContentKind::Json).await.unwrap();

        assert_eq!(value.as_deref(), Some("{}"));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_retrieve_missing() {
        let backend = MemoryBackend::new();
        let value = backend
            .retrieve(&derive_key("/nope", None), ContentKind::Html)
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let backend = MemoryBackend::new();
        let key = derive_key("/a", None);

        backend.store(&key, ContentKind::Html, "one").await.unwrap();
        backend.store(&key, ContentKind::Html, "two").await.unwrap();

        let value = backend.retrieve(&key, ContentKind::Html).await.unwrap();
        assert_eq!(value.as_deref(), Some("two"));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_empty_payload_is_a_hit() {
        let backend = MemoryBackend::new();
        let key = derive_key("/empty", None);

        backend.store(&key, ContentKind::Html, "").await.unwrap();
        let value = backend.retrieve(&key, ContentKind::Html).await.unwrap();
        assert_eq!(value.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_memory_remove_is_idempotent() {
        let backend = MemoryBackend::new();
        let key = derive_key("/a", None);

        backend.store(&key, ContentKind::Json, "x").await.unwrap();
        backend.remove(&key, ContentKind::Json).await.unwrap();
        backend.remove(&key, ContentKind::Json).await.unwrap();

        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_clear_all() {
        let backend = MemoryBackend::new();
        for path in ["/a", "/b", "/c"] {
            backend
                .store(&derive_key(path, None), ContentKind::Json, "x")
                .await
                .unwrap();
        }

        assert_eq!(backend.clear_all().await, 0);
        assert!(backend.is_empty().await);
    }
}
