// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded LRU cache of routing decisions.

use lru::LruCache;
use md5::{Digest, Md5};
use osp_core::{CandidateSkill, RoutingDecision};
use std::num::NonZeroUsize;

/// Decisions retained per process.
const CACHE_CAPACITY: usize = 256;

/// LRU cache keyed on the query and the sorted candidate ids.
pub struct DecisionCache {
    inner: LruCache<String, RoutingDecision>,
}

impl DecisionCache {
    /// Cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).expect("capacity is nonzero")),
        }
    }

    /// Deterministic key: MD5 over the query and the comma-joined sorted
    /// skill ids.
    #[must_use]
    pub fn key(query: &str, candidates: &[CandidateSkill]) -> String {
        let mut ids: Vec<&str> = candidates.iter().map(|c| c.skill_id.as_str()).collect();
        ids.sort_unstable();
        let raw = format!("{query}|{}", ids.join(","));
        let mut hasher = Md5::new();
        hasher.update(raw.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Fetch a cached decision, promoting it.
    pub fn get(&mut self, key: &str) -> Option<RoutingDecision> {
        self.inner.get(key).cloned()
    }

    /// Store a decision, evicting the least recently used on overflow.
    pub fn put(&mut self, key: String, decision: RoutingDecision) {
        self.inner.put(key, decision);
    }

    /// Number of cached decisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new()
    }
}
