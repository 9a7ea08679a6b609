//! Cache Engine Module
//!
//! Main cache engine combining the entry index with a pluggable discard
//! strategy and storage backend, plus lazy or eager expiration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{
    derive_key, CacheEntry, CacheKey, CacheStats, ContentKind, DiscardStrategy, Fifo, Index,
    MemoryBackend, StorageBackend,
};
use crate::duration::MaxAge;
use crate::error::{CacheError, Result};
use crate::tasks::ExpiryTimers;

/// Default capacity.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default max age: five minutes.
pub const DEFAULT_MAX_AGE_MS: u64 = 5 * 60 * 1000;

// == Expiry Mode ==
/// When stale entries are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryMode {
    /// Only when a lookup finds them
    #[default]
    Lazy,
    /// Additionally by a per-entry timer, independent of lookups
    Eager,
}

impl FromStr for ExpiryMode {
    type Err = CacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lazy" => Ok(ExpiryMode::Lazy),
            "eager" => Ok(ExpiryMode::Eager),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown expiry mode '{}'",
                other
            ))),
        }
    }
}

// == Hooks ==
/// Request identity handed to lifecycle hooks.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub path: &'a str,
    pub auth: Option<&'a str>,
    pub key: &'a CacheKey,
}

pub type StoreHook = Arc<dyn Fn(&KeyContext<'_>, usize) + Send + Sync>;
pub type LookupHook = Arc<dyn Fn(&KeyContext<'_>, Duration) + Send + Sync>;
pub type FullHook = Arc<dyn Fn() + Send + Sync>;

/// Optional lifecycle callbacks.
#[derive(Clone, Default)]
pub struct CacheHooks {
    /// New entry stored; receives the new total size
    pub on_store: Option<StoreHook>,
    /// Lookup served from cache; receives the lookup time
    pub on_cache_hit: Option<LookupHook>,
    /// Lookup found nothing usable; receives the lookup time
    pub on_cache_miss: Option<LookupHook>,
    /// An entry was evicted to make room
    pub on_cache_full: Option<FullHook>,
}

impl fmt::Debug for CacheHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHooks")
            .field("on_store", &self.on_store.is_some())
            .field("on_cache_hit", &self.on_cache_hit.is_some())
            .field("on_cache_miss", &self.on_cache_miss.is_some())
            .field("on_cache_full", &self.on_cache_full.is_some())
            .finish()
    }
}

// == Cache Options ==
/// Engine construction options. Validated by [`CacheEngine::new`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Maximum number of live entries, at least 1
    pub max_size: usize,
    /// Stale entries are still served while the size is at or below this
    pub min_size: usize,
    /// Entry lifetime, at least 1ms
    pub max_age: MaxAge,
    pub discard_strategy: Arc<dyn DiscardStrategy>,
    pub backend: Arc<dyn StorageBackend>,
    pub expiry: ExpiryMode,
    /// Whether a put on an existing key replaces it and restarts its lifetime
    pub refresh_on_put: bool,
    /// Kind used by [`CacheEngine::put`]
    pub content_kind: ContentKind,
    pub hooks: CacheHooks,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            min_size: 0,
            max_age: MaxAge::Millis(DEFAULT_MAX_AGE_MS),
            discard_strategy: Arc::new(Fifo),
            backend: Arc::new(MemoryBackend::new()),
            expiry: ExpiryMode::Lazy,
            refresh_on_put: false,
            content_kind: ContentKind::Json,
            hooks: CacheHooks::default(),
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_max_age(mut self, max_age: impl Into<MaxAge>) -> Self {
        self.max_age = max_age.into();
        self
    }

    pub fn with_strategy(mut self, strategy: impl DiscardStrategy + 'static) -> Self {
        self.discard_strategy = Arc::new(strategy);
        self
    }

    pub fn with_shared_strategy(mut self, strategy: Arc<dyn DiscardStrategy>) -> Self {
        self.discard_strategy = strategy;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_expiry(mut self, expiry: ExpiryMode) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_refresh_on_put(mut self, refresh: bool) -> Self {
        self.refresh_on_put = refresh;
        self
    }

    pub fn with_content_kind(mut self, kind: ContentKind) -> Self {
        self.content_kind = kind;
        self
    }

    pub fn on_store(mut self, hook: impl Fn(&KeyContext<'_>, usize) + Send + Sync + 'static) -> Self {
        self.hooks.on_store = Some(Arc::new(hook));
        self
    }

    pub fn on_cache_hit(
        mut self,
        hook: impl Fn(&KeyContext<'_>, Duration) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.on_cache_hit = Some(Arc::new(hook));
        self
    }

    pub fn on_cache_miss(
        mut self,
        hook: impl Fn(&KeyContext<'_>, Duration) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.on_cache_miss = Some(Arc::new(hook));
        self
    }

    pub fn on_cache_full(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_cache_full = Some(Arc::new(hook));
        self
    }
}

// == Cache Engine ==
/// Response cache with bounded size and entry lifetime.
///
/// Cloning is cheap and every clone shares the same cache. All index work
/// runs under one async mutex that is held across backend I/O, so operations
/// on one engine are serialized and a check-then-insert on a key cannot race.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    max_size: usize,
    min_size: usize,
    max_age: Duration,
    expiry: ExpiryMode,
    refresh_on_put: bool,
    content_kind: ContentKind,
    strategy: Arc<dyn DiscardStrategy>,
    backend: Arc<dyn StorageBackend>,
    hooks: CacheHooks,
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    index: Index,
    next_sequence: u64,
    stats: CacheStats,
    timers: ExpiryTimers,
}

enum PutOutcome {
    Skipped,
    Stored { evicted: bool, size: usize },
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an engine after validating `options`.
    pub fn new(options: CacheOptions) -> Result<Self> {
        if options.max_size < 1 {
            return Err(CacheError::InvalidConfig(
                "max_size needs to be 1 or higher".to_string(),
            ));
        }
        if options.min_size >= options.max_size {
            return Err(CacheError::InvalidConfig(format!(
                "min_size ({}) must be lower than max_size ({})",
                options.min_size, options.max_size
            )));
        }
        let max_age_ms = options.max_age.to_millis()?;
        if max_age_ms < 1 {
            return Err(CacheError::InvalidConfig(
                "max_age needs to be 1ms or higher".to_string(),
            ));
        }

        info!(
            max_size = options.max_size,
            min_size = options.min_size,
            max_age_ms,
            expiry = ?options.expiry,
            strategy = ?options.discard_strategy,
            "Cache engine initialized"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                max_size: options.max_size,
                min_size: options.min_size,
                max_age: Duration::from_millis(max_age_ms),
                expiry: options.expiry,
                refresh_on_put: options.refresh_on_put,
                content_kind: options.content_kind,
                strategy: options.discard_strategy,
                backend: options.backend,
                hooks: options.hooks,
                state: Mutex::new(EngineState::default()),
            }),
        })
    }

    // == Get ==
    /// Looks up the cached payload for a request identity.
    ///
    /// Absent and expired entries are `Ok(None)`; backend read failures are
    /// errors, not misses.
    pub async fn get(&self, path: &str, auth: Option<&str>) -> Result<Option<String>> {
        let started = Instant::now();
        let key = derive_key(path, auth);
        let value = self.inner.lookup(&key).await?;

        let elapsed = started.elapsed();
        let ctx = KeyContext {
            path,
            auth,
            key: &key,
        };
        let hooks = &self.inner.hooks;
        if value.is_some() {
            debug!(key = %key, path, "Cache hit");
            if let Some(hook) = &hooks.on_cache_hit {
                hook(&ctx, elapsed);
            }
        } else {
            debug!(key = %key, path, "Cache miss");
            if let Some(hook) = &hooks.on_cache_miss {
                hook(&ctx, elapsed);
            }
        }

        Ok(value)
    }

    // == Put ==
    /// Stores a payload of the engine's default content kind.
    pub async fn put(&self, path: &str, auth: Option<&str>, value: &str) -> Result<()> {
        self.put_as(path, auth, value, self.inner.content_kind).await
    }

    /// Stores a payload of an explicit content kind.
    ///
    /// If the key is already cached this is a no-op unless the engine was
    /// built with `refresh_on_put`. When full, the discard strategy's victim
    /// is removed first. If the backend write fails the index is untouched.
    pub async fn put_as(
        &self,
        path: &str,
        auth: Option<&str>,
        value: &str,
        kind: ContentKind,
    ) -> Result<()> {
        let key = derive_key(path, auth);
        let outcome = self.inner.insert(&key, value, kind).await?;

        if let PutOutcome::Stored { evicted, size } = outcome {
            debug!(key = %key, path, size, "Stored entry");
            let hooks = &self.inner.hooks;
            if evicted {
                if let Some(hook) = &hooks.on_cache_full {
                    hook();
                }
            }
            if let Some(hook) = &hooks.on_store {
                let ctx = KeyContext {
                    path,
                    auth,
                    key: &key,
                };
                hook(&ctx, size);
            }
        }

        Ok(())
    }

    // == Remove ==
    /// Removes the entry for a request identity, if present.
    pub async fn remove(&self, path: &str, auth: Option<&str>) -> Result<()> {
        let key = derive_key(path, auth);
        let mut state = self.inner.state.lock().await;

        if let Some(entry) = state.index.get(&key).cloned() {
            self.inner.discard(&mut state, &entry).await?;
            debug!(key = %key, path, "Removed entry");
        }
        Ok(())
    }

    // == Clear ==
    /// Empties the cache.
    ///
    /// Backend cleanup is best-effort; the index is always reset and every
    /// pending expiry timer is cancelled. Returns how many entries were dropped.
    pub async fn clear(&self) -> usize {
        let mut state = self.inner.state.lock().await;

        state.timers.cancel_all();
        let failures = self.inner.backend.clear_all().await;
        let removed = state.index.len();
        state.index.clear();
        state.stats.set_total_entries(0);

        if failures > 0 {
            warn!(failures, "Some payloads could not be removed while clearing");
        }
        info!(removed, "Cache cleared");
        removed
    }

    // == Size ==
    /// Current number of live entries.
    pub async fn size(&self) -> usize {
        self.inner.state.lock().await.index.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock().await;
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.index.len());
        stats
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    pub fn max_age(&self) -> Duration {
        self.inner.max_age
    }

    pub fn content_kind(&self) -> ContentKind {
        self.inner.content_kind
    }
}

impl fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("max_size", &self.inner.max_size)
            .field("min_size", &self.inner.min_size)
            .field("max_age", &self.inner.max_age)
            .field("expiry", &self.inner.expiry)
            .field("strategy", &self.inner.strategy)
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut state = self.state.lock().await;

        let Some(entry) = state.index.get(key).cloned() else {
            state.stats.record_miss();
            return Ok(None);
        };

        if entry.is_expired(self.max_age) && state.index.len() > self.min_size {
            self.discard(&mut state, &entry).await?;
            state.stats.record_expiration();
            state.stats.record_miss();
            debug!(key = %key, age_ms = entry.age().as_millis() as u64, "Entry expired");
            return Ok(None);
        }

        match self.backend.retrieve(key, entry.kind).await? {
            Some(value) => {
                state.stats.record_hit();
                debug!(
                    key = %key,
                    ttl_ms = entry.ttl_remaining(self.max_age).as_millis() as u64,
                    "Serving cached payload"
                );
                Ok(Some(value))
            }
            None => {
                // Payload vanished underneath us; drop the orphaned record.
                warn!(key = %key, "Backend payload missing for indexed entry");
                state.timers.cancel(key);
                state.index.remove(key);
                let size = state.index.len();
                state.stats.set_total_entries(size);
                state.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn insert(
        self: &Arc<Self>,
        key: &CacheKey,
        value: &str,
        kind: ContentKind,
    ) -> Result<PutOutcome> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.index.get(key).cloned() {
            if !self.refresh_on_put {
                debug!(key = %key, "Key already cached, skipping put");
                return Ok(PutOutcome::Skipped);
            }
            self.discard(&mut state, &existing).await?;
        }

        let mut evicted = false;
        if state.index.len() >= self.max_size {
            let entries = state.index.entries();
            let position = self.strategy.choose(entries);
            let victim = entries
                .get(position)
                .cloned()
                .ok_or(CacheError::InvalidVictim {
                    index: position,
                    len: entries.len(),
                })?;

            self.discard(&mut state, &victim).await?;
            state.stats.record_eviction();
            evicted = true;
            debug!(key = %victim.key, sequence = victim.sequence, "Evicted entry to make room");
        }

        self.backend.store(key, kind, value).await?;

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.index.push(CacheEntry::new(key.clone(), sequence, kind));
        if self.expiry == ExpiryMode::Eager {
            self.schedule_expiry(&mut state, key.clone(), sequence);
        }

        state.stats.record_store();
        let size = state.index.len();
        state.stats.set_total_entries(size);

        Ok(PutOutcome::Stored { evicted, size })
    }

    /// Removes an entry from the backend, then from the index.
    ///
    /// On backend failure nothing in the index changes.
    async fn discard(&self, state: &mut EngineState, entry: &CacheEntry) -> Result<()> {
        self.backend.remove(&entry.key, entry.kind).await?;
        state.timers.cancel(&entry.key);
        state.index.remove(&entry.key);
        let size = state.index.len();
        state.stats.set_total_entries(size);
        Ok(())
    }

    fn schedule_expiry(self: &Arc<Self>, state: &mut EngineState, key: CacheKey, sequence: u64) {
        let engine = Arc::downgrade(self);
        let max_age = self.max_age;
        let timer_key = key.clone();

        state.timers.schedule(key, sequence, async move {
            tokio::time::sleep(max_age).await;
            if let Some(engine) = engine.upgrade() {
                engine.expire(&timer_key, sequence).await;
            }
        });
    }

    /// Body of an eager expiry timer.
    async fn expire(&self, key: &CacheKey, sequence: u64) {
        let mut state = self.state.lock().await;

        if !state.timers.forget(key, sequence) {
            return;
        }
        let Some(entry) = state.index.get(key).cloned() else {
            return;
        };
        if entry.sequence != sequence {
            return;
        }
        if state.index.len() <= self.min_size {
            debug!(key = %key, "Keeping stale entry while at or below min size");
            return;
        }

        match self.discard(&mut state, &entry).await {
            Ok(()) => {
                state.stats.record_expiration();
                debug!(key = %key, "Expiry timer removed entry");
            }
            Err(e) => warn!(key = %key, error = %e, "Expiry timer failed to remove entry"),
        }
    }
}
