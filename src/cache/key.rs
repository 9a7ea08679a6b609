//! Cache Key Module
//!
//! Derives fixed-width cache keys from a request path and an optional
//! authenticated-principal token.

use std::fmt;

use sha2::{Digest, Sha256};

// == Cache Key ==
/// Hex-encoded SHA-256 digest identifying one (path, auth) pair.
///
/// Always 64 lowercase hex characters, so it is safe to use as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Derive Key ==
/// Derives the cache key for a request identity.
///
/// The path and auth segments are length-prefixed before hashing and an
/// absent auth is tagged separately, so `("a", None)` and `("a", Some(""))`
/// never share a key. The result is stable across process runs.
pub fn derive_key(path: &str, auth: Option<&str>) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update((path.len() as u64).to_be_bytes());
    hasher.update(path.as_bytes());
    match auth {
        Some(token) => {
            hasher.update([1u8]);
            hasher.update((token.len() as u64).to_be_bytes());
            hasher.update(token.as_bytes());
        }
        None => hasher.update([0u8]),
    }
    CacheKey(hex::encode(hasher.finalize()))
}
