// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hash-chained proof log.

use chrono::{DateTime, Utc};
use osp_core::{ChainError, ChainedEntry, HashChain};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Retained proof entries; older entries are evicted oldest-first.
const PROOF_LOG_CAPACITY: usize = 5000;

/// One contract state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofEntry {
    /// Monotonic sequence number.
    pub sequence: u64,
    /// Event type (e.g. `"EXECUTION_SUCCESS"`).
    pub event_type: String,
    /// Contract the event belongs to.
    pub idempotency_key: String,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Hex SHA-256 of the predecessor's canonical serialization.
    pub prev_hash: String,
    /// Structured event context.
    pub context: Value,
}

impl ChainedEntry for ProofEntry {
    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn prev_hash(&self) -> &str {
        &self.prev_hash
    }
}

/// A page of proof entries.
#[derive(Debug, Clone, Serialize)]
pub struct ProofPage {
    /// Entries retained in the log overall.
    pub total: usize,
    /// Requested offset.
    pub offset: usize,
    /// Requested limit.
    pub limit: usize,
    /// The page itself.
    pub entries: Vec<ProofEntry>,
}

/// Append-only, bounded, hash-chained record of delivery events.
pub struct ProofLog {
    chain: HashChain<ProofEntry>,
}

impl ProofLog {
    /// Empty log with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain: HashChain::new(PROOF_LOG_CAPACITY),
        }
    }

    /// Append one event. Serialization failures are logged and dropped
    /// rather than propagated; the log is observability, not control flow.
    pub fn append(&mut self, event_type: &str, idempotency_key: &str, context: Value) {
        let result = self.chain.append_with(|sequence, prev_hash| ProofEntry {
            sequence,
            event_type: event_type.to_string(),
            idempotency_key: idempotency_key.to_string(),
            timestamp: Utc::now(),
            prev_hash,
            context,
        });
        match result {
            Ok(entry) => debug!(
                event_type = entry.event_type.as_str(),
                idempotency_key,
                sequence = entry.sequence,
                "proof appended"
            ),
            Err(err) => tracing::error!(error = %err, "failed to append proof entry"),
        }
    }

    /// All retained entries for one idempotency key, in order.
    #[must_use]
    pub fn entries_for(&self, idempotency_key: &str) -> Vec<ProofEntry> {
        self.chain
            .iter()
            .filter(|e| e.idempotency_key == idempotency_key)
            .cloned()
            .collect()
    }

    /// Paginated view over all retained entries.
    #[must_use]
    pub fn page(&self, limit: usize, offset: usize) -> ProofPage {
        let entries: Vec<ProofEntry> =
            self.chain.iter().skip(offset).take(limit).cloned().collect();
        ProofPage {
            total: self.chain.len(),
            offset,
            limit,
            entries,
        }
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Verify hash continuity over the retained window.
    ///
    /// # Errors
    ///
    /// Propagates [`ChainError`] from the underlying chain.
    pub fn verify(&self) -> Result<(), ChainError> {
        self.chain.verify()
    }
}

impl Default for ProofLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osp_core::{GENESIS_HASH, canonical_hash};
    use serde_json::json;

    #[test]
    fn genesis_prev_hash_is_all_zeros() {
        let mut log = ProofLog::new();
        log.append("CONTRACT_ISSUED", "K1", json!({"skill_ref": "org.calc"}));
        let entries = log.entries_for("K1");
        assert_eq!(entries[0].prev_hash, GENESIS_HASH);
        assert_eq!(entries[0].sequence, 0);
    }

    #[test]
    fn entries_chain_to_their_predecessors() {
        let mut log = ProofLog::new();
        log.append("CONTRACT_ISSUED", "K1", json!({}));
        log.append("EXECUTION_SUCCESS", "K1", json!({"attempt": 1}));
        log.append("IDEMPOTENT_RETURN", "K1", json!({}));

        let entries = log.entries_for("K1");
        for pair in entries.windows(2) {
            assert_eq!(pair[1].prev_hash, canonical_hash(&pair[0]).unwrap());
        }
        log.verify().unwrap();
    }

    #[test]
    fn filtering_by_key_preserves_order() {
        let mut log = ProofLog::new();
        log.append("CONTRACT_ISSUED", "A", json!({}));
        log.append("CONTRACT_ISSUED", "B", json!({}));
        log.append("EXECUTION_SUCCESS", "A", json!({}));

        let a = log.entries_for("A");
        assert_eq!(a.len(), 2);
        assert!(a[0].sequence < a[1].sequence);
        assert_eq!(log.entries_for("B").len(), 1);
        assert!(log.entries_for("missing").is_empty());
    }

    #[test]
    fn pagination_slices_the_window() {
        let mut log = ProofLog::new();
        for i in 0..10 {
            log.append("EVENT", &format!("K{i}"), json!({}));
        }
        let page = log.page(3, 4);
        assert_eq!(page.total, 10);
        assert_eq!(page.entries.len(), 3);
        assert_eq!(page.entries[0].sequence, 4);
    }
}
