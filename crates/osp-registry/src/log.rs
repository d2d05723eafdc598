// SPDX-License-Identifier: MIT OR Apache-2.0

//! The registry transparency log.
//!
//! Structurally identical to the delivery proof log: a bounded ring of
//! entries chained by the SHA-256 hash of each predecessor's canonical
//! serialization.

use chrono::{DateTime, Utc};
use osp_core::{ChainError, ChainedEntry, HashChain};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Retained transparency entries.
const TRANSPARENCY_LOG_CAPACITY: usize = 50_000;

/// One registry mutation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransparencyEntry {
    /// Monotonic sequence number.
    pub sequence: u64,
    /// Event type (`"REGISTERED"`, `"REVOKED"`, `"REGISTER_REJECTED"`).
    pub event_type: String,
    /// Skill the mutation concerns.
    pub skill_ref: String,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Hex SHA-256 of the predecessor's canonical serialization.
    pub prev_hash: String,
    /// Structured event context.
    pub context: Value,
}

impl ChainedEntry for TransparencyEntry {
    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn prev_hash(&self) -> &str {
        &self.prev_hash
    }
}

/// A page of transparency entries.
#[derive(Debug, Clone, Serialize)]
pub struct TransparencyPage {
    /// Entries retained overall.
    pub total: usize,
    /// Requested offset.
    pub offset: usize,
    /// Requested limit.
    pub limit: usize,
    /// The page itself.
    pub entries: Vec<TransparencyEntry>,
}

/// Append-only, bounded, hash-chained record of registry mutations.
pub struct TransparencyLog {
    chain: HashChain<TransparencyEntry>,
}

impl TransparencyLog {
    /// Empty log with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain: HashChain::new(TRANSPARENCY_LOG_CAPACITY),
        }
    }

    /// Append one mutation record.
    pub fn append(&mut self, event_type: &str, skill_ref: &str, context: Value) {
        let result = self.chain.append_with(|sequence, prev_hash| TransparencyEntry {
            sequence,
            event_type: event_type.to_string(),
            skill_ref: skill_ref.to_string(),
            timestamp: Utc::now(),
            prev_hash,
            context,
        });
        match result {
            Ok(entry) => debug!(
                event_type = entry.event_type.as_str(),
                skill_ref,
                sequence = entry.sequence,
                "transparency entry appended"
            ),
            Err(err) => tracing::error!(error = %err, "failed to append transparency entry"),
        }
    }

    /// Paginated view over the retained window.
    #[must_use]
    pub fn page(&self, limit: usize, offset: usize) -> TransparencyPage {
        let entries: Vec<TransparencyEntry> =
            self.chain.iter().skip(offset).take(limit).cloned().collect();
        TransparencyPage {
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

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osp_core::GENESIS_HASH;
    use serde_json::json;

    #[test]
    fn chains_from_genesis() {
        let mut log = TransparencyLog::new();
        log.append("REGISTERED", "org.a", json!({"alg": "ES256"}));
        log.append("REVOKED", "org.a", json!({"revoked_by": "issuer"}));

        let page = log.page(10, 0);
        assert_eq!(page.entries[0].prev_hash, GENESIS_HASH);
        assert_ne!(page.entries[1].prev_hash, GENESIS_HASH);
        log.verify().unwrap();
    }

    #[test]
    fn pagination_reports_totals() {
        let mut log = TransparencyLog::new();
        for i in 0..7 {
            log.append("REGISTERED", &format!("org.s{i}"), json!({}));
        }
        let page = log.page(2, 5);
        assert_eq!(page.total, 7);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].skill_ref, "org.s5");
    }
}
