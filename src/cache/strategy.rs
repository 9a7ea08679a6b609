//! Discard Strategy Module
//!
//! Pluggable policies choosing which entry to evict when the cache is full.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::CacheEntry;
use crate::error::CacheError;

// == Discard Strategy ==
/// Picks an eviction victim.
///
/// Implementations must be pure: same entries in, same position out, no
/// side effects. `entries` is ordered oldest first and is never empty when
/// the engine calls `choose`.
pub trait DiscardStrategy: Send + Sync + fmt::Debug {
    /// Returns the position of the victim within `entries`.
    fn choose(&self, entries: &[CacheEntry]) -> usize;
}

/// Evicts the oldest entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fifo;

impl DiscardStrategy for Fifo {
    fn choose(&self, _entries: &[CacheEntry]) -> usize {
        0
    }
}

/// Evicts the most recently inserted entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifo;

impl DiscardStrategy for Lifo {
    fn choose(&self, entries: &[CacheEntry]) -> usize {
        entries.len().saturating_sub(1)
    }
}

// == Strategy Kind ==
/// Named built-in strategies, for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Fifo,
    Lifo,
}

impl StrategyKind {
    /// Builds the strategy object.
    pub fn build(&self) -> Arc<dyn DiscardStrategy> {
        match self {
            StrategyKind::Fifo => Arc::new(Fifo),
            StrategyKind::Lifo => Arc::new(Lifo),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(StrategyKind::Fifo),
            "lifo" => Ok(StrategyKind::Lifo),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown discard strategy '{}'",
                other
            ))),
        }
    }
}
