// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery contracts and the freshness lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// TTL-derived lifecycle label.
///
/// A pure function of wall-clock time and the contract's
/// `(issued_at, expires_at)` window: fresh below 0.8 of the TTL, stale in
/// [0.8, 1.0), expired at or past the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Less than 80% of the TTL has elapsed.
    Fresh,
    /// Between 80% and 100% of the TTL has elapsed.
    Stale,
    /// The deadline has passed.
    Expired,
}

/// Terminal state of the wrapped execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Not yet executed.
    Pending,
    /// Executed successfully; the result is cached for the key's lifetime.
    Completed,
    /// Retries exhausted.
    Failed,
}

/// A delivery contract wrapping one skill execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryContract {
    /// Skill this contract covers.
    pub skill_ref: String,
    /// Time-to-live in seconds.
    pub ttl_seconds: u64,
    /// Lifecycle label as of the last evaluation.
    pub freshness: Freshness,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Deadline; completions are not accepted past this point.
    pub expires_at: DateTime<Utc>,
    /// Attempts allowed beyond the first.
    pub max_retries: u32,
    /// Deduplication key.
    pub idempotency_key: String,
    /// Failed attempts so far.
    pub retries_used: u32,
    /// Cached result of a completed execution.
    pub execution_result: Option<Value>,
    /// Execution state.
    pub execution_status: ExecutionStatus,
}

impl DeliveryContract {
    /// Issue a contract starting at `now`.
    #[must_use]
    pub fn issue(
        skill_ref: impl Into<String>,
        ttl_seconds: u64,
        max_retries: u32,
        idempotency_key: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            skill_ref: skill_ref.into(),
            ttl_seconds,
            freshness: Freshness::Fresh,
            issued_at: now,
            expires_at: now + Duration::seconds(ttl_seconds as i64),
            max_retries,
            idempotency_key: idempotency_key.into(),
            retries_used: 0,
            execution_result: None,
            execution_status: ExecutionStatus::Pending,
        }
    }

    /// Freshness at an arbitrary instant. Pure; the wall-clock variant is
    /// [`DeliveryContract::refresh`].
    #[must_use]
    pub fn freshness_at(&self, now: DateTime<Utc>) -> Freshness {
        if now >= self.expires_at {
            return Freshness::Expired;
        }
        let total = (self.expires_at - self.issued_at).num_milliseconds();
        if total <= 0 {
            return Freshness::Expired;
        }
        let elapsed = (now - self.issued_at).num_milliseconds();
        if (elapsed as f64) / (total as f64) < 0.8 {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }

    /// Re-evaluate and store freshness against the wall clock.
    pub fn refresh(&mut self) -> Freshness {
        self.freshness = self.freshness_at(Utc::now());
        self.freshness
    }
}
