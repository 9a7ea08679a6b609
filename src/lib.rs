//! Tresor - a response cache for axum services
//!
//! Caches rendered response bodies keyed by request path and an optional
//! auth token, with FIFO or LIFO eviction, lazy or eager expiry, and an
//! in-memory or on-disk payload store.

pub mod api;
pub mod cache;
pub mod config;
pub mod duration;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{cache_responses, AppState, CachedResponse, ResponseCache};
pub use cache::{CacheEngine, CacheOptions};
pub use config::Config;
pub use duration::{parse_duration, MaxAge};
pub use error::{CacheError, Result};
