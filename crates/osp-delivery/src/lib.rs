// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Delivery-contract enforcement for skill execution."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Every skill execution is wrapped in a [`DeliveryContract`] that tracks
//! TTL-derived freshness, an idempotency key, and bounded retries. Every
//! contract state transition appends to a hash-chained [`ProofLog`], giving
//! callers a verifiable audit trail via [`DeliveryEnforcer::get_proof`].

mod contract;
mod enforcer;
mod proof;

pub use contract::{DeliveryContract, ExecutionStatus, Freshness};
pub use enforcer::{
    DEFAULT_MAX_RETRIES, DEFAULT_TTL_SECONDS, DeliveryEnforcer, DeliveryError, DeliveryOutcome,
    DeliveryStatus, Skill, SkillError,
};
pub use proof::{ProofEntry, ProofLog, ProofPage};
