//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{
    BackendKind, CacheOptions, ContentKind, ExpiryMode, StrategyKind, DEFAULT_CACHE_DIR,
    DEFAULT_MAX_SIZE,
};
use crate::duration::MaxAge;
use crate::error::Result;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// Stale entries are still served at or below this size
    pub min_size: usize,
    /// Entry lifetime, as milliseconds or a duration string like "5 min"
    pub max_age: String,
    /// Discard strategy name (fifo, lifo)
    pub strategy: String,
    /// Storage backend name (memory, file)
    pub backend: String,
    /// Root directory for the file backend
    pub cache_dir: PathBuf,
    /// Expiry mode name (lazy, eager)
    pub expiry: String,
    /// Whether a put on an existing key restarts its lifetime
    pub refresh_on_put: bool,
    /// Kind of the cached responses (json, html)
    pub response_type: String,
    /// HTTP server port
    pub server_port: u16,
    /// Simulated render time of the demo endpoints, in milliseconds
    pub render_delay_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TRESOR_MAX_SIZE` - Maximum cache entries (default: 100)
    /// - `TRESOR_MIN_SIZE` - Size at or below which stale entries are served (default: 0)
    /// - `TRESOR_MAX_AGE` - Entry lifetime (default: "5 min")
    /// - `TRESOR_STRATEGY` - `fifo` or `lifo` (default: fifo)
    /// - `TRESOR_BACKEND` - `memory` or `file` (default: memory)
    /// - `TRESOR_CACHE_DIR` - File backend root (default: ./tresor_cache)
    /// - `TRESOR_EXPIRY` - `lazy` or `eager` (default: lazy)
    /// - `TRESOR_REFRESH_ON_PUT` - Refresh existing entries on put (default: false)
    /// - `TRESOR_RESPONSE_TYPE` - `json` or `html` (default: json)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `RENDER_DELAY_MS` - Demo render delay (default: 500)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_size: parsed("TRESOR_MAX_SIZE").unwrap_or(defaults.max_size),
            min_size: parsed("TRESOR_MIN_SIZE").unwrap_or(defaults.min_size),
            max_age: env::var("TRESOR_MAX_AGE").unwrap_or(defaults.max_age),
            strategy: env::var("TRESOR_STRATEGY").unwrap_or(defaults.strategy),
            backend: env::var("TRESOR_BACKEND").unwrap_or(defaults.backend),
            cache_dir: env::var("TRESOR_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            expiry: env::var("TRESOR_EXPIRY").unwrap_or(defaults.expiry),
            refresh_on_put: parsed("TRESOR_REFRESH_ON_PUT").unwrap_or(defaults.refresh_on_put),
            response_type: env::var("TRESOR_RESPONSE_TYPE").unwrap_or(defaults.response_type),
            server_port: parsed("SERVER_PORT").unwrap_or(defaults.server_port),
            render_delay_ms: parsed("RENDER_DELAY_MS").unwrap_or(defaults.render_delay_ms),
        }
    }

    /// Builds engine options from this configuration.
    ///
    /// Fails on unknown strategy, backend, expiry or response type names, or
    /// if the file backend's directory cannot be created. Size and age bounds
    /// are checked later by the engine itself.
    pub fn cache_options(&self) -> Result<CacheOptions> {
        let strategy = StrategyKind::from_str(&self.strategy)?;
        let backend = BackendKind::from_str(&self.backend)?;
        let expiry = ExpiryMode::from_str(&self.expiry)?;
        let kind = ContentKind::from_str(&self.response_type)?;

        // Plain digits are milliseconds, anything else a duration string.
        let max_age = match self.max_age.trim().parse::<u64>() {
            Ok(ms) => MaxAge::Millis(ms),
            Err(_) => MaxAge::Text(self.max_age.clone()),
        };

        Ok(CacheOptions::new()
            .with_max_size(self.max_size)
            .with_min_size(self.min_size)
            .with_max_age(max_age)
            .with_shared_strategy(strategy.build())
            .with_backend(backend.build(&self.cache_dir)?)
            .with_expiry(expiry)
            .with_refresh_on_put(self.refresh_on_put)
            .with_content_kind(kind))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            min_size: 0,
            max_age: "5 min".to_string(),
            strategy: "fifo".to_string(),
            backend: "memory".to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            expiry: "lazy".to_string(),
            refresh_on_put: false,
            response_type: "json".to_string(),
            server_port: 3000,
            render_delay_ms: 500,
        }
    }
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
