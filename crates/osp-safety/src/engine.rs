// SPDX-License-Identifier: MIT OR Apache-2.0

//! The layered safety engine.

use crate::anomaly::{AnomalyDetector, AnomalySignal};
use crate::classifier::{Classifier, TfIdfClassifier};
use crate::prefilter;
use osp_core::{ReasonCode, RiskLevel, SafeFallback, TraceEvent};
use serde_json::json;
use std::sync::Mutex;
use tracing::warn;

/// Result of a safety check.
///
/// The explicit `ClassifierError` variant carries the fail-closed path:
/// callers fold it into a `SAFETY_CLASSIFIER_UNAVAILABLE` refusal rather
/// than letting any query pass unclassified.
#[derive(Debug, Clone)]
pub enum SafetyVerdict {
    /// The query passed every layer.
    Safe {
        /// Events emitted along the way.
        trace: Vec<TraceEvent>,
    },
    /// A layer blocked the query.
    Refusal(SafeFallback),
    /// The classifier backend failed.
    ClassifierError {
        /// Events emitted up to the failure.
        trace: Vec<TraceEvent>,
    },
}

impl SafetyVerdict {
    /// Fold the verdict into an optional refusal, applying the fail-closed
    /// rule to classifier errors.
    #[must_use]
    pub fn into_refusal(self) -> Option<SafeFallback> {
        match self {
            Self::Safe { .. } => None,
            Self::Refusal(fallback) => Some(fallback),
            Self::ClassifierError { trace } => Some(
                SafeFallback::new(
                    ReasonCode::SafetyClassifierUnavailable,
                    "Safety classification is temporarily unavailable.",
                )
                .with_safe_alternative(
                    "Safety classification is temporarily unavailable. Please try again in a moment.",
                )
                .with_trace(trace),
            ),
        }
    }
}

/// Multi-layer safety engine.
///
/// The score histories behind the anomaly brake are shared across requests
/// under a mutex; they influence only the brake, never the per-request
/// classification.
pub struct SafetyEngine {
    classifier: Box<dyn Classifier>,
    detector: Mutex<AnomalyDetector>,
}

impl SafetyEngine {
    /// Engine with the default TF-IDF backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_classifier(Box::new(TfIdfClassifier::new()))
    }

    /// Engine with an injected classification backend.
    #[must_use]
    pub fn with_classifier(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            detector: Mutex::new(AnomalyDetector::new()),
        }
    }

    /// Run the query through all layers.
    pub fn check(&self, query: &str) -> SafetyVerdict {
        let mut trace = Vec::new();

        // Layer 1: lexical prefilters.
        let sql_hit = prefilter::matches_sql(query);
        let shell_hit = prefilter::matches_shell(query);

        if sql_hit {
            trace.push(
                TraceEvent::new("PREFILTER_MATCH", "lexical_injection_filter")
                    .with_context(json!({"matched_pattern": "sql_keywords"})),
            );
            trace.push(TraceEvent::new("BLOCK_ACTION", "prefilter_stage"));
            return SafetyVerdict::Refusal(
                SafeFallback::new(
                    ReasonCode::PrefilterSqlInjection,
                    "Potential SQL injection detected",
                )
                .with_safe_alternative(
                    "I cannot help with database queries. Please rephrase your request.",
                )
                .with_trace(trace),
            );
        }

        if shell_hit {
            trace.push(
                TraceEvent::new("PREFILTER_MATCH", "forbidden_pattern_filter")
                    .with_context(json!({"matched_pattern": "shell_metacharacters"})),
            );
            trace.push(TraceEvent::new("BLOCK_ACTION", "prefilter_stage"));
            return SafetyVerdict::Refusal(
                SafeFallback::new(
                    ReasonCode::PrefilterCommandInjection,
                    "Potential command injection detected",
                )
                .with_safe_alternative(
                    "I cannot execute system commands. Please describe what you'd like to accomplish.",
                )
                .with_trace(trace),
            );
        }

        trace.push(TraceEvent::new("PREFILTER_PASS", "lexical_injection_filter"));

        // Layer 2: semantic classification.
        let classification = match self.classifier.classify(query) {
            Ok(c) => c,
            Err(err) => {
                warn!(error = %err, "semantic classifier failed; failing closed");
                trace.push(
                    TraceEvent::new("SEMANTIC_CLASSIFIER_ERROR", "semantic_classifier")
                        .with_context(json!({"error": err.to_string()})),
                );
                trace.push(TraceEvent::new("FAIL_CLOSED_TRIGGERED", "safety_decision"));
                trace.push(
                    TraceEvent::new("SAFE_FALLBACK_GENERATED", "fallback_handler")
                        .with_context(json!({"fallback_type": "classifier_unavailable"})),
                );
                return SafetyVerdict::ClassifierError { trace };
            }
        };

        trace.push(TraceEvent::new("SEMANTIC_ANALYSIS_START", "semantic_classifier"));

        let Some(result) = classification else {
            trace.push(TraceEvent::new("SEMANTIC_SAFE_PASS", "semantic_classifier"));
            return SafetyVerdict::Safe { trace };
        };

        trace.push(
            TraceEvent::new("SEMANTIC_RISK_DETECTED", "semantic_classifier").with_context(json!({
                "risk_score": result.risk_score,
                "risk_category": result.category,
            })),
        );

        if result.blocked {
            trace.push(TraceEvent::new("BLOCK_ACTION", "semantic_decision"));
            trace.push(TraceEvent::new("SAFE_FALLBACK_GENERATED", "fallback_handler"));
            return SafetyVerdict::Refusal(
                SafeFallback::new(result.reason_code, result.message).with_trace(trace),
            );
        }

        trace.push(
            TraceEvent::new("SEMANTIC_RISK_NOTED", "semantic_classifier")
                .with_context(json!({"risk_score": result.risk_score})),
        );

        // Layer 3: anomaly brake over score histories.
        let lexical_score = if sql_hit || shell_hit { 1.0 } else { 0.0 };
        let signal = self
            .detector
            .lock()
            .expect("anomaly detector lock poisoned")
            .observe(lexical_score, result.risk_score);

        if let AnomalySignal::Diverged { kl, confidence } = signal {
            warn!(kl_divergence = kl, "score distributions diverged");
            trace.push(
                TraceEvent::new("ANOMALY_DETECTED", "anomaly_detection").with_context(json!({
                    "anomaly_type": "distribution_shift",
                    "anomaly_confidence": confidence,
                })),
            );

            if matches!(result.risk_level, RiskLevel::High | RiskLevel::Critical) {
                trace.push(
                    TraceEvent::new("SEMANTIC_ANALYSIS_DISCARDED", "safety_decision")
                        .with_context(json!({"reason": "anomaly_detected"})),
                );
                trace.push(TraceEvent::new("CONSERVATIVE_BLOCK_APPLIED", "safety_decision"));
                trace.push(
                    TraceEvent::new("SECURITY_EVENT_LOGGED", "logging")
                        .with_context(json!({"severity": "CRITICAL"})),
                );
                return SafetyVerdict::Refusal(
                    SafeFallback::new(ReasonCode::AnomalyDetectedHighRisk, "Request blocked.")
                        .with_trace(trace),
                );
            }
            trace.push(TraceEvent::new("ANOMALY_DETECTED_LOW_RISK", "anomaly_detection"));
        }

        SafetyVerdict::Safe { trace }
    }
}

impl Default for SafetyEngine {
    fn default() -> Self {
        Self::new()
    }
}
