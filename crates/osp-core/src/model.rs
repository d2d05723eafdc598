// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response shapes for the routing plane.

use crate::{ReasonCode, TraceEvent};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Risk and clearance
// ---------------------------------------------------------------------------

/// Declared risk level of a candidate skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Routine, reversible operations.
    #[default]
    Low,
    /// Operations with limited blast radius.
    Medium,
    /// Operations that can cause significant harm.
    High,
    /// Operations that must never run without review.
    Critical,
}

impl RiskLevel {
    /// Rank used by conflict resolution. `Critical` collapses onto `High`
    /// so that tie narrowing never prefers a critical skill over a high one.
    #[must_use]
    pub fn tiebreak_rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High | Self::Critical => 2,
        }
    }
}

/// Clearance attached to a routing decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyClearance {
    /// The skill may run without further review.
    #[default]
    Allow,
    /// The skill may run but downstream should apply extra scrutiny.
    Restricted,
    /// No skill was selected; a human or upstream system must decide.
    Escalate,
}

/// How the routing decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStability {
    /// Single clear winner with no semantic support needed.
    Deterministic,
    /// The semantic stage independently supported the winner.
    SemanticSupported,
    /// The winner had weak semantic support.
    ApproximateMatch,
    /// A score tie was broken by UTF-8 skill-id order.
    TieBreakLexicalOrder,
    /// A score tie was narrowed to one candidate by risk level.
    ConflictResolved,
    /// An explicit operator override bypassed the pipeline.
    EscapeHatchDirect,
    /// Nothing matched; the head of the pool was returned as a default.
    FallbackDefault,
    /// The candidate pool was empty.
    NoCandidates,
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// A caller-provided candidate skill.
///
/// Fields other than `skill_id` are optional on the wire; the router
/// normalizes them before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSkill {
    /// DNS-like dotted identifier, unique within the request's pool.
    pub skill_id: String,
    /// Display name; defaults to the skill id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text description consumed by scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Keywords consumed by scoring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activation_keywords: Vec<String>,
    /// Declared risk level.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Pre-assigned clearance, if the caller already vetted this skill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_clearance: Option<SafetyClearance>,
}

impl CandidateSkill {
    /// Minimal candidate with only an id.
    pub fn new(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            name: None,
            description: None,
            activation_keywords: Vec::new(),
            risk_level: RiskLevel::Low,
            safety_clearance: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A non-refusal routing outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected skill, or `None` when escalating on an empty pool.
    pub skill_ref: Option<String>,
    /// Clearance for the selected skill.
    pub safety_clearance: SafetyClearance,
    /// Hint that the match is weak; consumers should treat it as advisory.
    pub approximate: bool,
    /// How the decision was reached.
    pub decision_stability: DecisionStability,
    /// Whether a UTF-8 tiebreak picked the winner.
    pub tie_break_applied: bool,
    /// Ordered observability trail.
    pub trace_events: Vec<TraceEvent>,
}

/// A structured refusal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeFallback {
    /// Always `true`; distinguishes refusals on the wire.
    pub refusal: bool,
    /// Stable reason code.
    pub reason_code: ReasonCode,
    /// Short human-readable message.
    pub message: String,
    /// Suggested safe rephrasing, where one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_alternative: Option<String>,
    /// Clarifying question to send back to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarify: Option<String>,
    /// Ordered observability trail.
    pub trace_events: Vec<TraceEvent>,
}

impl SafeFallback {
    /// Build a refusal with the given code and message.
    pub fn new(reason_code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            refusal: true,
            reason_code,
            message: message.into(),
            safe_alternative: None,
            clarify: None,
            trace_events: Vec::new(),
        }
    }

    /// Attach a safe alternative suggestion.
    #[must_use]
    pub fn with_safe_alternative(mut self, alternative: impl Into<String>) -> Self {
        self.safe_alternative = Some(alternative.into());
        self
    }

    /// Attach trace events.
    #[must_use]
    pub fn with_trace(mut self, trace_events: Vec<TraceEvent>) -> Self {
        self.trace_events = trace_events;
        self
    }
}

/// Either a routing decision or a refusal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteResponse {
    /// The request was refused.
    Fallback(SafeFallback),
    /// A decision was produced.
    Decision(RoutingDecision),
}

impl RouteResponse {
    /// Returns the refusal, if this response is one.
    #[must_use]
    pub fn as_fallback(&self) -> Option<&SafeFallback> {
        match self {
            Self::Fallback(f) => Some(f),
            Self::Decision(_) => None,
        }
    }

    /// Returns the decision, if this response is one.
    #[must_use]
    pub fn as_decision(&self) -> Option<&RoutingDecision> {
        match self {
            Self::Decision(d) => Some(d),
            Self::Fallback(_) => None,
        }
    }

    /// The trace trail regardless of outcome.
    #[must_use]
    pub fn trace_events(&self) -> &[TraceEvent] {
        match self {
            Self::Decision(d) => &d.trace_events,
            Self::Fallback(f) => &f.trace_events,
        }
    }
}

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

/// Published metadata for an executable skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillManifest {
    /// DNS-like dotted identifier.
    pub skill_id: String,
    /// Display name.
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Activation keywords surfaced to the router.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activation_keywords: Vec<String>,
    /// Declared risk level.
    #[serde(default)]
    pub risk_level: RiskLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_uppercase_on_wire() {
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"LOW\"");
        assert_eq!(
            serde_json::to_string(&RiskLevel::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }

    #[test]
    fn critical_ranks_with_high_for_tiebreaks() {
        assert_eq!(
            RiskLevel::Critical.tiebreak_rank(),
            RiskLevel::High.tiebreak_rank()
        );
        assert!(RiskLevel::Low.tiebreak_rank() < RiskLevel::Medium.tiebreak_rank());
    }

    #[test]
    fn candidate_defaults_fill_in() {
        let c: CandidateSkill = serde_json::from_str(r#"{"skill_id":"org.calc"}"#).unwrap();
        assert_eq!(c.skill_id, "org.calc");
        assert_eq!(c.risk_level, RiskLevel::Low);
        assert!(c.activation_keywords.is_empty());
        assert!(c.name.is_none());
    }

    #[test]
    fn route_response_untagged_distinguishes_refusals() {
        let fallback = SafeFallback::new(ReasonCode::InvalidRequestEmptyQuery, "empty");
        let json = serde_json::to_string(&RouteResponse::Fallback(fallback)).unwrap();
        let back: RouteResponse = serde_json::from_str(&json).unwrap();
        assert!(back.as_fallback().is_some());

        let decision = RoutingDecision {
            skill_ref: Some("org.calc".into()),
            safety_clearance: SafetyClearance::Allow,
            approximate: false,
            decision_stability: DecisionStability::Deterministic,
            tie_break_applied: false,
            trace_events: Vec::new(),
        };
        let json = serde_json::to_string(&RouteResponse::Decision(decision)).unwrap();
        let back: RouteResponse = serde_json::from_str(&json).unwrap();
        assert!(back.as_decision().is_some());
    }

    #[test]
    fn decision_stability_snake_case_on_wire() {
        assert_eq!(
            serde_json::to_string(&DecisionStability::EscapeHatchDirect).unwrap(),
            "\"escape_hatch_direct\""
        );
        assert_eq!(
            serde_json::to_string(&DecisionStability::TieBreakLexicalOrder).unwrap(),
            "\"tie_break_lexical_order\""
        );
    }
}
