// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered trace events attached to every routing and safety response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where in the pipeline a trace event was produced.
///
/// Routing stages are numeric (0 for pre-pipeline work, 1–3 for the scoring
/// stages); safety and validation layers identify themselves by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageRef {
    /// Numeric routing stage.
    Stage(u8),
    /// Named pipeline layer (e.g. `"semantic_classifier"`).
    Layer(String),
}

impl From<u8> for StageRef {
    fn from(stage: u8) -> Self {
        Self::Stage(stage)
    }
}

impl From<&str> for StageRef {
    fn from(layer: &str) -> Self {
        Self::Layer(layer.to_string())
    }
}

/// A single observability record.
///
/// Events are ordered within a response; the final event is terminal
/// (`ROUTING_DECISION_FINAL`, a `ROUTING_FALLBACK_*`, or a block/fail code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Stable event code (e.g. `"STAGE1_LEXICAL_MATCH"`).
    pub code: String,
    /// Pipeline location that emitted the event.
    pub stage_attempted: StageRef,
    /// Optional structured context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl TraceEvent {
    /// Create an event with no context.
    pub fn new(code: impl Into<String>, stage: impl Into<StageRef>) -> Self {
        Self {
            code: code.into(),
            stage_attempted: stage.into(),
            context: None,
        }
    }

    /// Attach structured context to this event.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_stage_serializes_as_number() {
        let event = TraceEvent::new("ROUTING_DECISION_FINAL", 3);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage_attempted"], 3);
        assert!(json.get("context").is_none());
    }

    #[test]
    fn named_layer_serializes_as_string() {
        let event = TraceEvent::new("PREFILTER_PASS", "lexical_injection_filter");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage_attempted"], "lexical_injection_filter");
    }

    #[test]
    fn context_roundtrips() {
        let event = TraceEvent::new("STAGE1_LEXICAL_MATCH", 1)
            .with_context(json!({"latency_ms": 2, "backend_version": "v1"}));
        let json = serde_json::to_string(&event).unwrap();
        let back: TraceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
