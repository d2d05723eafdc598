// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, hash-chained append-only log.
//!
//! Both the delivery proof log and the registry transparency log are rings
//! of serializable entries where each entry stores the SHA-256 hash of the
//! canonical serialization of its predecessor. The chain head uses
//! [`GENESIS_HASH`]. Eviction drops the oldest entries; the tail hash is
//! tracked separately so continuity survives the ring wrapping.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

/// Hash recorded by the first entry of a chain: 64 zero characters.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Errors from chained-log operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// An entry could not be serialized for hashing.
    #[error("failed to serialize log entry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An entry's stored `prev_hash` does not match the recomputed hash of
    /// its predecessor.
    #[error("hash chain broken at sequence {sequence}")]
    BrokenChain {
        /// Sequence number of the offending entry.
        sequence: u64,
    },

    /// Sequence numbers are not contiguous within the retained window.
    #[error("non-monotonic sequence at {sequence}")]
    SequenceGap {
        /// Sequence number of the offending entry.
        sequence: u64,
    },
}

/// Hex SHA-256 of the canonical (sorted-key, compact) JSON form of `entry`.
///
/// `serde_json` maps are backed by `BTreeMap`, so object keys come out
/// sorted and the output is deterministic for a given value.
pub fn canonical_hash<T: Serialize>(entry: &T) -> Result<String, ChainError> {
    let value = serde_json::to_value(entry)?;
    let bytes = serde_json::to_vec(&value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Access to the chaining fields of a log entry.
pub trait ChainedEntry: Serialize {
    /// Monotonic sequence number assigned at append time.
    fn sequence(&self) -> u64;
    /// Hash of the predecessor's canonical serialization.
    fn prev_hash(&self) -> &str;
}

/// A bounded ring of hash-chained entries.
#[derive(Debug, Clone)]
pub struct HashChain<T> {
    entries: VecDeque<T>,
    capacity: usize,
    next_sequence: u64,
    tail_hash: String,
}

impl<T: ChainedEntry> HashChain<T> {
    /// Create an empty chain that retains at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            next_sequence: 0,
            tail_hash: GENESIS_HASH.to_string(),
        }
    }

    /// Append an entry built from the next sequence number and the current
    /// tail hash. The builder receives `(sequence, prev_hash)` and must
    /// store both on the entry it returns.
    ///
    /// # Errors
    ///
    /// [`ChainError::Serialize`] if the new entry cannot be hashed.
    pub fn append_with<F>(&mut self, build: F) -> Result<&T, ChainError>
    where
        F: FnOnce(u64, String) -> T,
    {
        let entry = build(self.next_sequence, self.tail_hash.clone());
        self.tail_hash = canonical_hash(&entry)?;
        self.next_sequence += 1;

        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        Ok(self.entries.back().expect("just pushed"))
    }

    /// Verify hash continuity and sequence monotonicity over the retained
    /// window.
    ///
    /// # Errors
    ///
    /// - [`ChainError::BrokenChain`] at the first entry whose `prev_hash`
    ///   does not match its predecessor.
    /// - [`ChainError::SequenceGap`] at the first non-contiguous sequence.
    pub fn verify(&self) -> Result<(), ChainError> {
        let mut prev: Option<&T> = None;
        for entry in &self.entries {
            if let Some(p) = prev {
                if entry.sequence() != p.sequence() + 1 {
                    return Err(ChainError::SequenceGap {
                        sequence: entry.sequence(),
                    });
                }
                if entry.prev_hash() != canonical_hash(p)? {
                    return Err(ChainError::BrokenChain {
                        sequence: entry.sequence(),
                    });
                }
            }
            prev = Some(entry);
        }
        Ok(())
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total entries appended over the chain's lifetime, including evicted
    /// ones.
    #[must_use]
    pub fn total_appended(&self) -> u64 {
        self.next_sequence
    }

    /// Iterate over the retained entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }
}
