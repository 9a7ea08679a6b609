//! Cache Module
//!
//! Response cache engine with pluggable discard strategies and storage
//! backends, lazy or eager expiration, and lifecycle hooks.

mod backend;
mod engine;
mod entry;
mod index;
mod key;
mod stats;
mod strategy;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::{BackendKind, FileBackend, MemoryBackend, StorageBackend, DEFAULT_CACHE_DIR};
pub use engine::{
    CacheEngine, CacheHooks, CacheOptions, ExpiryMode, FullHook, KeyContext, LookupHook,
    StoreHook, DEFAULT_MAX_AGE_MS, DEFAULT_MAX_SIZE,
};
pub use entry::{CacheEntry, ContentKind};
pub use index::Index;
pub use key::{derive_key, CacheKey};
pub use stats::CacheStats;
pub use strategy::{DiscardStrategy, Fifo, Lifo, StrategyKind};
