//! Index Module
//!
//! Keeps live entries in insertion order with constant-time key lookup.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheKey};

// == Index ==
/// Ordered collection of live entries.
///
/// `entries` is sorted by sequence number (oldest first), which holds because
/// entries are only ever appended with a fresh, larger sequence number.
/// `positions` maps each key to its entry's sequence number.
#[derive(Debug, Default)]
pub struct Index {
    entries: Vec<CacheEntry>,
    positions: HashMap<CacheKey, u64>,
}

impl Index {
    // == Constructor ==
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Looks up the entry for a key.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.position_of(key).map(|pos| &self.entries[pos])
    }

    // == Push ==
    /// Appends a new entry.
    ///
    /// The caller guarantees the key is absent and the sequence number is
    /// larger than any previously pushed one.
    pub fn push(&mut self, entry: CacheEntry) {
        debug_assert!(!self.positions.contains_key(&entry.key));
        debug_assert!(self
            .entries
            .last()
            .map_or(true, |last| last.sequence < entry.sequence));

        self.positions.insert(entry.key.clone(), entry.sequence);
        self.entries.push(entry);
    }

    // == Remove ==
    /// Removes and returns the entry for a key, if present.
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let pos = self.position_of(key)?;
        self.positions.remove(key);
        Some(self.entries.remove(pos))
    }

    // == Entries ==
    /// All live entries, oldest first.
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position_of(&self, key: &CacheKey) -> Option<usize> {
        let sequence = *self.positions.get(key)?;
        self.entries
            .binary_search_by_key(&sequence, |entry| entry.sequence)
            .ok()
    }
}
