//! Expiry Timers
//!
//! One cancellable background task per cache entry, used when the engine runs
//! in eager expiry mode. Each timer is tagged with the sequence number of the
//! entry it was scheduled for, so a timer belonging to an older entry can
//! never be mistaken for the timer of a newer entry stored under the same key.

use std::collections::HashMap;
use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::CacheKey;

/// Pending expiry tasks keyed by cache key.
#[derive(Debug, Default)]
pub struct ExpiryTimers {
    pending: HashMap<CacheKey, (u64, JoinHandle<()>)>,
}

impl ExpiryTimers {
    pub fn new() -> Self {
        Self::default()
    }

    // == Schedule ==
    /// Spawns `task` as the expiry timer for `key`.
    ///
    /// Any timer already pending for the key is aborted first.
    pub fn schedule<F>(&mut self, key: CacheKey, sequence: u64, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        if let Some((_, previous)) = self.pending.insert(key, (sequence, handle)) {
            previous.abort();
        }
    }

    // == Cancel ==
    /// Aborts the timer for `key`, if any.
    pub fn cancel(&mut self, key: &CacheKey) {
        if let Some((sequence, handle)) = self.pending.remove(key) {
            handle.abort();
            debug!(key = %key, sequence, "Cancelled expiry timer");
        }
    }

    // == Forget ==
    /// Drops the bookkeeping for a timer that is firing right now.
    ///
    /// Called from inside the timer task itself, which must not abort its own
    /// handle. Returns false if the pending timer belongs to another entry.
    pub fn forget(&mut self, key: &CacheKey, sequence: u64) -> bool {
        match self.pending.get(key) {
            Some((pending, _)) if *pending == sequence => {
                self.pending.remove(key);
                true
            }
            _ => false,
        }
    }

    // == Cancel All ==
    /// Aborts every pending timer.
    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Drop for ExpiryTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
