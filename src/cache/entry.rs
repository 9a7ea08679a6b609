//! Cache Entry Module
//!
//! Defines the index record kept for every live cache entry. The payload
//! itself lives in the storage backend, addressed by the same key.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::error::CacheError;

// == Content Kind ==
/// Declared kind of a cached payload.
///
/// Decides the file extension used by file storage and the content type
/// sent back when a cached response is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Json,
    Html,
}

impl ContentKind {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ContentKind::Json => "json",
            ContentKind::Html => "html",
        }
    }

    /// HTTP content type for replayed responses.
    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Json => "application/json",
            ContentKind::Html => "text/html; charset=utf-8",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ContentKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ContentKind::Json),
            "html" => Ok(ContentKind::Html),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown response type '{}'",
                other
            ))),
        }
    }
}

// == Cache Entry ==
/// Index record for a single live entry.
///
/// Entries are never mutated in place; a refresh removes the old record and
/// appends a new one with a fresh sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Derived key, shared with the backend payload
    pub key: CacheKey,
    /// When the entry was stored
    pub stored_at: Instant,
    /// Monotonically increasing insertion counter
    pub sequence: u64,
    /// Declared payload kind
    pub kind: ContentKind,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stored now.
    pub fn new(key: CacheKey, sequence: u64, kind: ContentKind) -> Self {
        Self {
            key,
            stored_at: Instant::now(),
            sequence,
            kind,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was stored.
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `max_age`.
    ///
    /// Boundary condition: an entry whose age equals `max_age` is expired.
    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.age() >= max_age
    }

    // == Time To Live ==
    /// Remaining lifetime, saturating at zero once expired.
    pub fn ttl_remaining(&self, max_age: Duration) -> Duration {
        max_age.saturating_sub(self.age())
    }
}
