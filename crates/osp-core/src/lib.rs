// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Shared protocol types for the Open Skills Protocol reference server."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! This crate holds the protocol data model that every other OSP crate
//! consumes: candidate skills, routing decisions, safe fallbacks, trace
//! events, the stable reason-code taxonomy, and the bounded hash-chained
//! log used by both the delivery proof log and the registry transparency
//! log.

mod chain;
mod model;
mod reason;
mod trace;

pub use chain::{ChainError, ChainedEntry, GENESIS_HASH, HashChain, canonical_hash};
pub use model::{
    CandidateSkill, DecisionStability, RiskLevel, RouteResponse, RoutingDecision, SafeFallback,
    SafetyClearance, SkillManifest,
};
pub use reason::{ReasonCode, ReasonKind};
pub use trace::{StageRef, TraceEvent};

/// Protocol identifier advertised by `osp.get_capabilities`.
pub const PROTOCOL_VERSION: &str = "OSP/1.0";

/// Server identity string attached to trace events and capability listings.
pub const SERVER_VERSION: &str = "osp-ref-server-v1.0.0";

/// Maximum query length in Unicode code points before truncation.
pub const MAX_QUERY_LENGTH: usize = 4096;
