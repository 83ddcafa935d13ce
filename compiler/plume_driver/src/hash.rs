//! Content hashing for the rewrite cache.
//!
//! Source texts and build configurations are keyed by a 64-bit `FxHash`.
//! It is not cryptographic; it only has to notice edits.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// Hash of a source text or of a build configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(u64);

impl ContentHash {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        ContentHash(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Format as a 16-digit hex string.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        u64::from_str_radix(s, 16).ok().map(ContentHash)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Hash a source text.
#[must_use]
pub fn hash_str(text: &str) -> ContentHash {
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    ContentHash(hasher.finish())
}

/// Combine hashes in order into one.
#[must_use]
pub fn combine_hashes(hashes: &[ContentHash]) -> ContentHash {
    let mut hasher = FxHasher::default();
    for hash in hashes {
        hash.0.hash(&mut hasher);
    }
    ContentHash(hasher.finish())
}

#[cfg(test)]
mod tests;
