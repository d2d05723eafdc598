// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stable reason-code taxonomy shared by refusals and availability errors.
//!
//! Every refusal produced by the safety engine, the router, or the RPC
//! dispatcher carries exactly one [`ReasonCode`]. Codes serialize to
//! `SCREAMING_SNAKE_CASE` strings that are stable across releases; the
//! dispatcher maps each code to an HTTP status via [`ReasonCode::http_status`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad family that a [`ReasonCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    /// Request validation failures.
    Validation,
    /// Safety refusals (prefilter, classifier, anomaly brake).
    Safety,
    /// Availability and fail-closed conditions.
    Availability,
}

/// Machine-readable refusal reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // -- Validation --
    /// The query was empty after trimming.
    InvalidRequestEmptyQuery,
    /// The JSON-RPC method is not known.
    UnknownMethod,
    /// Required params are missing or malformed.
    InvalidParams,

    // -- Safety --
    /// The SQL-injection prefilter matched.
    PrefilterSqlInjection,
    /// The command-injection prefilter matched.
    PrefilterCommandInjection,
    /// Semantic classifier: jailbreak category blocked.
    SemanticJailbreakAttempt,
    /// Semantic classifier: privacy category blocked.
    SemanticPrivacyViolation,
    /// Semantic classifier: illegal-activity category blocked.
    SemanticIllegalActivity,
    /// Semantic classifier: violence category blocked.
    SemanticViolenceHarm,
    /// Semantic classifier: manipulation category blocked.
    SemanticManipulation,
    /// Semantic classifier: internal-state category blocked.
    SemanticInternalStateRequest,
    /// The KL-divergence brake fired on a high-risk classification.
    AnomalyDetectedHighRisk,

    // -- Availability --
    /// The semantic classifier failed; the request fails closed.
    SafetyClassifierUnavailable,
    /// The safety check did not complete in time.
    SafetyCheckTimeout,
    /// The server is shedding load at degradation level D3.
    D3CriticalLoadShedding,
    /// The per-client rate limit was exceeded.
    RateLimitExceeded,
}

impl ReasonCode {
    /// Stable string form (e.g. `"PREFILTER_SQL_INJECTION"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequestEmptyQuery => "INVALID_REQUEST_EMPTY_QUERY",
            Self::UnknownMethod => "UNKNOWN_METHOD",
            Self::InvalidParams => "INVALID_PARAMS",
            Self::PrefilterSqlInjection => "PREFILTER_SQL_INJECTION",
            Self::PrefilterCommandInjection => "PREFILTER_COMMAND_INJECTION",
            Self::SemanticJailbreakAttempt => "SEMANTIC_JAILBREAK_ATTEMPT",
            Self::SemanticPrivacyViolation => "SEMANTIC_PRIVACY_VIOLATION",
            Self::SemanticIllegalActivity => "SEMANTIC_ILLEGAL_ACTIVITY",
            Self::SemanticViolenceHarm => "SEMANTIC_VIOLENCE_HARM",
            Self::SemanticManipulation => "SEMANTIC_MANIPULATION",
            Self::SemanticInternalStateRequest => "SEMANTIC_INTERNAL_STATE_REQUEST",
            Self::AnomalyDetectedHighRisk => "ANOMALY_DETECTED_HIGH_RISK",
            Self::SafetyClassifierUnavailable => "SAFETY_CLASSIFIER_UNAVAILABLE",
            Self::SafetyCheckTimeout => "SAFETY_CHECK_TIMEOUT",
            Self::D3CriticalLoadShedding => "D3_CRITICAL_LOAD_SHEDDING",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }

    /// Returns the broad [`ReasonKind`] this code belongs to.
    #[must_use]
    pub fn kind(&self) -> ReasonKind {
        match self {
            Self::InvalidRequestEmptyQuery | Self::UnknownMethod | Self::InvalidParams => {
                ReasonKind::Validation
            }

            Self::PrefilterSqlInjection
            | Self::PrefilterCommandInjection
            | Self::SemanticJailbreakAttempt
            | Self::SemanticPrivacyViolation
            | Self::SemanticIllegalActivity
            | Self::SemanticViolenceHarm
            | Self::SemanticManipulation
            | Self::SemanticInternalStateRequest
            | Self::AnomalyDetectedHighRisk => ReasonKind::Safety,

            Self::SafetyClassifierUnavailable
            | Self::SafetyCheckTimeout
            | Self::D3CriticalLoadShedding
            | Self::RateLimitExceeded => ReasonKind::Availability,
        }
    }

    /// HTTP status the RPC dispatcher uses for a refusal with this code.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequestEmptyQuery | Self::InvalidParams => 400,
            Self::UnknownMethod => 404,
            Self::RateLimitExceeded => 429,
            Self::SafetyClassifierUnavailable
            | Self::SafetyCheckTimeout
            | Self::D3CriticalLoadShedding => 503,
            _ => 403,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ReasonCode::PrefilterSqlInjection).unwrap();
        assert_eq!(json, "\"PREFILTER_SQL_INJECTION\"");
    }

    #[test]
    fn as_str_matches_serde_form() {
        for code in [
            ReasonCode::InvalidRequestEmptyQuery,
            ReasonCode::SemanticJailbreakAttempt,
            ReasonCode::AnomalyDetectedHighRisk,
            ReasonCode::SafetyClassifierUnavailable,
            ReasonCode::RateLimitExceeded,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn availability_codes_map_to_503() {
        assert_eq!(ReasonCode::SafetyClassifierUnavailable.http_status(), 503);
        assert_eq!(ReasonCode::SafetyCheckTimeout.http_status(), 503);
        assert_eq!(ReasonCode::D3CriticalLoadShedding.http_status(), 503);
    }

    #[test]
    fn safety_refusals_map_to_403() {
        assert_eq!(ReasonCode::PrefilterSqlInjection.http_status(), 403);
        assert_eq!(ReasonCode::SemanticViolenceHarm.http_status(), 403);
        assert_eq!(ReasonCode::AnomalyDetectedHighRisk.http_status(), 403);
    }

    #[test]
    fn validation_codes_map_to_client_errors() {
        assert_eq!(ReasonCode::InvalidRequestEmptyQuery.http_status(), 400);
        assert_eq!(ReasonCode::UnknownMethod.http_status(), 404);
        assert_eq!(ReasonCode::RateLimitExceeded.http_status(), 429);
    }
}
