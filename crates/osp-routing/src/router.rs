// SPDX-License-Identifier: MIT OR Apache-2.0

//! The routing pipeline.

use crate::bm25::Bm25Scorer;
use crate::cache::DecisionCache;
use crate::embedder::Embedder;
use osp_core::{
    CandidateSkill, DecisionStability, MAX_QUERY_LENGTH, ReasonCode, RiskLevel, RouteResponse,
    RoutingDecision, SERVER_VERSION, SafeFallback, SafetyClearance, TraceEvent,
};
use osp_safety::{SafetyEngine, SafetyVerdict};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

/// Score comparisons use IEEE 754 epsilon tolerance.
const EPSILON: f64 = 1e-6;
/// Weight of the normalized lexical score in the combined score.
const LEXICAL_WEIGHT: f64 = 0.4;
/// Weight of the semantic score in the combined score.
const SEMANTIC_WEIGHT: f64 = 0.6;

/// A routing request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteRequest {
    /// Natural-language query.
    #[serde(default)]
    pub query: String,
    /// Request-scoped candidate pool.
    #[serde(default)]
    pub candidate_skills: Vec<CandidateSkill>,
    /// Opaque caller context, carried but not scored.
    #[serde(default)]
    pub context: Option<Value>,
    /// Pipeline switches.
    #[serde(default)]
    pub routing_conditions: RoutingConditions,
}

/// Caller- or degradation-supplied pipeline switches.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RoutingConditions {
    /// Skip the semantic rerank stage.
    #[serde(default)]
    pub skip_semantic: bool,
}

/// Internal scoring state for one candidate.
#[derive(Debug, Clone)]
struct Scored {
    skill: CandidateSkill,
    bm25: f64,
    semantic: f64,
    combined: f64,
}

/// The four-stage router.
///
/// Stateless across requests apart from the decision cache and the safety
/// engine's anomaly histories; both sit behind locks and never leak into
/// unrelated requests' scoring.
pub struct RouterService {
    safety: Arc<SafetyEngine>,
    embedder: Option<Arc<dyn Embedder>>,
    cache: Mutex<DecisionCache>,
}

impl RouterService {
    /// Router with the given safety engine and optional semantic backend.
    ///
    /// With no embedder the rerank stage is not attempted and decisions
    /// rest on lexical scores alone.
    pub fn new(safety: Arc<SafetyEngine>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self {
            safety,
            embedder,
            cache: Mutex::new(DecisionCache::new()),
        }
    }

    /// Run the full pipeline for one request.
    pub fn route(&self, request: &RouteRequest) -> RouteResponse {
        let started = Instant::now();
        let mut trace: Vec<TraceEvent> = Vec::new();

        let mut query = request.query.clone();
        if query.chars().count() > MAX_QUERY_LENGTH {
            query = query.chars().take(MAX_QUERY_LENGTH).collect();
        }
        let candidates = &request.candidate_skills;

        // Validation.
        if query.trim().is_empty() {
            trace.push(
                TraceEvent::new("VALIDATION_FAILED", "request_validation")
                    .with_context(json!({"reason": "empty_query"})),
            );
            trace.push(TraceEvent::new("SAFE_FALLBACK_GENERATED", "fallback_handler"));
            return RouteResponse::Fallback(
                SafeFallback::new(ReasonCode::InvalidRequestEmptyQuery, "Invalid params: empty query")
                    .with_safe_alternative("Please provide a query or question.")
                    .with_trace(trace),
            );
        }

        // Escape hatch: explicit operator override. Bypasses safety and
        // scoring entirely and dispatches the first candidate.
        if query.contains("@override") && !candidates.is_empty() {
            trace.push(TraceEvent::new("ROUTING_ESCAPE_HATCH_DETECTED", 0));
            trace.push(TraceEvent::new("ROUTING_SKILL_ID_PARSED", 0));
            trace.push(TraceEvent::new("ROUTING_DIRECT_DISPATCH", 0));
            trace.push(TraceEvent::new("ROUTING_DECISION_FINAL", 0));
            return RouteResponse::Decision(build_decision(
                &candidates[0],
                trace,
                None,
                false,
                DecisionStability::EscapeHatchDirect,
                false,
            ));
        }

        // Empty pool: nothing to choose from, escalate.
        if candidates.is_empty() {
            trace.push(TraceEvent::new("ROUTING_POOL_EMPTY", 1));
            trace.push(TraceEvent::new("ROUTING_ESCALATION_REQUIRED", 1));
            return RouteResponse::Decision(RoutingDecision {
                skill_ref: None,
                safety_clearance: SafetyClearance::Escalate,
                approximate: false,
                decision_stability: DecisionStability::NoCandidates,
                tie_break_applied: false,
                trace_events: trace,
            });
        }

        // Safety. A refusal (or classifier failure, folded closed)
        // short-circuits the pipeline.
        let safety_started = Instant::now();
        match self.safety.check(&query) {
            SafetyVerdict::Safe { .. } => {
                trace.push(
                    TraceEvent::new("SAFETY_CHECK_PASS", "SAFETY_CHECK").with_context(
                        json!({"latency_ms": safety_started.elapsed().as_millis() as u64}),
                    ),
                );
            }
            verdict => {
                let refusal = verdict.into_refusal().expect("non-safe verdict refuses");
                return RouteResponse::Fallback(refusal);
            }
        }

        // Decision cache.
        let cache_key = DecisionCache::key(&query, candidates);
        if let Some(mut cached) = self
            .cache
            .lock()
            .expect("routing cache lock poisoned")
            .get(&cache_key)
        {
            cached.trace_events = vec![TraceEvent::new("CACHE_HIT", 0)];
            return RouteResponse::Decision(cached);
        }

        // Stage 1: lexical scoring.
        let stage1_started = Instant::now();
        let mut scored = score_lexical(&query, candidates);
        trace.push(
            TraceEvent::new("STAGE1_LEXICAL_MATCH", 1).with_context(json!({
                "latency_ms": stage1_started.elapsed().as_millis() as u64,
                "backend_version": SERVER_VERSION,
            })),
        );

        if scored[0].bm25 == 0.0 {
            trace.push(TraceEvent::new("STAGE1_NO_MATCHES", 1));
            trace.push(TraceEvent::new("ROUTING_FALLBACK_DEFAULT", 1));
            trace.push(TraceEvent::new("ROUTING_DECISION_FINAL", 1));
            let decision = build_decision(
                &scored[0].skill,
                trace,
                None,
                true,
                DecisionStability::FallbackDefault,
                false,
            );
            self.cache_put(cache_key, &decision);
            return RouteResponse::Decision(decision);
        }

        let top_bm25 = scored[0].bm25;
        if scored.iter().filter(|c| fp64_equal(c.bm25, top_bm25)).count() > 1 {
            trace.push(TraceEvent::new("STAGE1_IDENTICAL_SCORES", 1));
        }

        // Stage 2: semantic rerank.
        if request.routing_conditions.skip_semantic {
            trace.push(TraceEvent::new("STAGE2_SKIPPED", 2));
        } else if let Some(embedder) = &self.embedder {
            self.rerank_semantic(embedder.as_ref(), &query, &mut scored, &mut trace);
        }

        // Combined score and final ordering.
        for c in &mut scored {
            let bm25_norm = if c.bm25 > 0.0 { c.bm25 / (c.bm25 + 1.0) } else { 0.0 };
            c.combined = LEXICAL_WEIGHT * bm25_norm + SEMANTIC_WEIGHT * c.semantic;
        }
        scored.sort_by(|a, b| b.combined.total_cmp(&a.combined));

        // Stage 3: conflict resolution.
        let decision = resolve_conflicts(scored, &mut trace);
        trace.push(TraceEvent::new("ROUTING_DECISION_FINAL", 3));

        info!(
            skill_ref = decision.0.skill.skill_id.as_str(),
            latency_ms = started.elapsed().as_millis() as u64,
            "routing complete"
        );

        let (winner, clearance, approximate, stability, tie_break) = decision;
        let decision = build_decision(
            &winner.skill,
            trace,
            Some(clearance),
            approximate,
            stability,
            tie_break,
        );
        self.cache_put(cache_key, &decision);
        RouteResponse::Decision(decision)
    }

    fn cache_put(&self, key: String, decision: &RoutingDecision) {
        self.cache
            .lock()
            .expect("routing cache lock poisoned")
            .put(key, decision.clone());
    }

    fn rerank_semantic(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        scored: &mut [Scored],
        trace: &mut Vec<TraceEvent>,
    ) {
        let mut texts: Vec<String> = Vec::with_capacity(scored.len() + 1);
        texts.push(query.to_string());
        for c in scored.iter() {
            let name = c.skill.name.clone().unwrap_or_default();
            let description = c.skill.description.clone().unwrap_or_default();
            texts.push(format!("{name} {description}"));
        }

        match embedder.encode_batch(&texts) {
            Ok(vectors) if vectors.len() == texts.len() => {
                trace.push(TraceEvent::new("STAGE2_EMBEDDING_GENERATED", 2));
                let query_vec = &vectors[0];
                for (c, doc_vec) in scored.iter_mut().zip(&vectors[1..]) {
                    c.semantic = dot(query_vec, doc_vec);
                }
                trace.push(
                    TraceEvent::new("STAGE2_SEMANTIC_SIMILARITY", 2)
                        .with_context(json!({"candidates": scored.len()})),
                );

                let best = scored
                    .iter()
                    .map(|c| c.semantic)
                    .fold(f64::NEG_INFINITY, f64::max);
                if best < 0.3 {
                    trace.push(TraceEvent::new("STAGE2_SEMANTIC_SIMILARITY_LOW", 2));
                } else if best >= 0.7 {
                    trace.push(TraceEvent::new("STAGE2_SEMANTIC_THRESHOLD_MET", 2));
                } else {
                    trace.push(TraceEvent::new("STAGE2_CONFIDENCE_MEDIUM", 2));
                }
            }
            Ok(_) | Err(_) => {
                // Continue on stage-1 scores only.
                trace.push(TraceEvent::new("STAGE2_EMBEDDING_TIMEOUT", 2));
                trace.push(TraceEvent::new("ROUTING_FALLBACK_LEXICAL", 2));
            }
        }
    }
}

/// Normalize candidates into scoring documents and score them lexically.
///
/// The normalized view (name defaulting to the skill id, empty description
/// and keyword list) is the only one scoring sees. Sorting is stable, so
/// equal scores keep input order.
fn score_lexical(query: &str, candidates: &[CandidateSkill]) -> Vec<Scored> {
    let docs: Vec<String> = candidates
        .iter()
        .map(|c| {
            let name = c
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| c.skill_id.clone());
            let description = c.description.clone().unwrap_or_default();
            let keywords = c.activation_keywords.join(" ");
            format!("{name} {description} {keywords}")
        })
        .collect();

    let mut scorer = Bm25Scorer::new();
    if docs.len() > 1 {
        scorer.build_idf(&docs);
    }

    let mut scored: Vec<Scored> = candidates
        .iter()
        .zip(&docs)
        .map(|(c, doc)| Scored {
            skill: c.clone(),
            bm25: scorer.score(query, doc),
            semantic: 0.0,
            combined: 0.0,
        })
        .collect();

    scored.sort_by(|a, b| b.bm25.total_cmp(&a.bm25));
    scored
}

/// Narrow ε-tied candidates by risk, then by UTF-8 skill-id order.
fn resolve_conflicts(
    scored: Vec<Scored>,
    trace: &mut Vec<TraceEvent>,
) -> (Scored, SafetyClearance, bool, DecisionStability, bool) {
    let top_combined = scored[0].combined;
    let mut tied: Vec<&Scored> = scored
        .iter()
        .filter(|c| fp64_equal(c.combined, top_combined))
        .collect();

    let mut stability = DecisionStability::Deterministic;
    let mut tie_break_applied = false;
    let mut clearance = scored[0]
        .skill
        .safety_clearance
        .unwrap_or(SafetyClearance::Allow);
    let winner: Scored;

    if tied.len() > 1 {
        trace.push(TraceEvent::new("STAGE3_CONFLICT_DETECTED", 3));

        let min_rank = tied
            .iter()
            .map(|c| c.skill.risk_level.tiebreak_rank())
            .min()
            .unwrap_or(0);
        let narrowed: Vec<&Scored> = tied
            .iter()
            .copied()
            .filter(|c| c.skill.risk_level.tiebreak_rank() == min_rank)
            .collect();
        if narrowed.len() < tied.len() {
            trace.push(TraceEvent::new("STAGE3_LOWER_RISK_SELECTED", 3));
            tied = narrowed;
        }

        if tied.len() > 1 {
            trace.push(TraceEvent::new("STAGE3_TIE_BREAK_SKILL_ID", 3));
            winner = tied
                .iter()
                .min_by(|a, b| a.skill.skill_id.as_bytes().cmp(b.skill.skill_id.as_bytes()))
                .map(|c| (*c).clone())
                .expect("tied set is non-empty");
            tie_break_applied = true;
            stability = DecisionStability::TieBreakLexicalOrder;
        } else {
            winner = tied[0].clone();
            stability = DecisionStability::ConflictResolved;
        }

        // Clearance stays with the pre-tiebreak top unless the tie forces
        // a restriction; the tiebreak winner's own clearance is not
        // consulted.
        if tied
            .iter()
            .any(|c| matches!(c.skill.risk_level, RiskLevel::Medium | RiskLevel::High))
        {
            clearance = SafetyClearance::Restricted;
        }
    } else {
        winner = scored[0].clone();
        if winner.semantic > 0.5 {
            stability = DecisionStability::SemanticSupported;
        } else if winner.semantic > 0.0 {
            stability = DecisionStability::ApproximateMatch;
        }
    }

    let approximate = winner.semantic < 0.3 && winner.bm25 < 1.0;
    (winner, clearance, approximate, stability, tie_break_applied)
}

fn build_decision(
    candidate: &CandidateSkill,
    trace: Vec<TraceEvent>,
    clearance: Option<SafetyClearance>,
    approximate: bool,
    stability: DecisionStability,
    tie_break_applied: bool,
) -> RoutingDecision {
    RoutingDecision {
        skill_ref: Some(candidate.skill_id.clone()),
        safety_clearance: clearance
            .or(candidate.safety_clearance)
            .unwrap_or(SafetyClearance::Allow),
        approximate,
        decision_stability: stability,
        tie_break_applied,
        trace_events: trace,
    }
}

fn fp64_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(x * y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;

    fn router() -> RouterService {
        RouterService::new(
            Arc::new(SafetyEngine::new()),
            Some(Arc::new(HashingEmbedder::default())),
        )
    }

    fn lexical_router() -> RouterService {
        RouterService::new(Arc::new(SafetyEngine::new()), None)
    }

    fn weather_pool() -> Vec<CandidateSkill> {
        vec![
            CandidateSkill {
                skill_id: "org.calc".into(),
                name: Some("Calculator".into()),
                description: Some("math operations add subtract".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::Low,
                safety_clearance: None,
            },
            CandidateSkill {
                skill_id: "org.weather".into(),
                name: Some("Weather".into()),
                description: Some("forecast rain sun temperature".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::Low,
                safety_clearance: None,
            },
        ]
    }

    fn request(query: &str, pool: Vec<CandidateSkill>) -> RouteRequest {
        RouteRequest {
            query: query.into(),
            candidate_skills: pool,
            context: None,
            routing_conditions: RoutingConditions::default(),
        }
    }

    #[test]
    fn lexical_route_selects_weather() {
        let response = router().route(&request("what is the weather forecast", weather_pool()));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref.as_deref(), Some("org.weather"));
        let codes: Vec<&str> = decision
            .trace_events
            .iter()
            .map(|e| e.code.as_str())
            .collect();
        assert!(codes.contains(&"STAGE1_LEXICAL_MATCH"));
        assert_eq!(*codes.last().unwrap(), "ROUTING_DECISION_FINAL");
    }

    #[test]
    fn empty_query_is_refused() {
        let response = router().route(&request("   ", weather_pool()));
        let fallback = response.as_fallback().expect("refusal");
        assert_eq!(fallback.reason_code, ReasonCode::InvalidRequestEmptyQuery);
    }

    #[test]
    fn escape_hatch_dispatches_first_candidate() {
        let response = router().route(&request("@override do this now", weather_pool()));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref.as_deref(), Some("org.calc"));
        assert_eq!(
            decision.decision_stability,
            DecisionStability::EscapeHatchDirect
        );
        let codes: Vec<&str> = decision
            .trace_events
            .iter()
            .map(|e| e.code.as_str())
            .collect();
        assert_eq!(
            codes,
            vec![
                "ROUTING_ESCAPE_HATCH_DETECTED",
                "ROUTING_SKILL_ID_PARSED",
                "ROUTING_DIRECT_DISPATCH",
                "ROUTING_DECISION_FINAL",
            ]
        );
    }

    #[test]
    fn empty_pool_escalates() {
        let response = router().route(&request("anything", vec![]));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref, None);
        assert_eq!(decision.safety_clearance, SafetyClearance::Escalate);
        assert_eq!(decision.decision_stability, DecisionStability::NoCandidates);
    }

    #[test]
    fn sql_injection_refused_before_scoring() {
        let response = router().route(&request(
            "SELECT * FROM users UNION SELECT password FROM admin",
            weather_pool(),
        ));
        let fallback = response.as_fallback().expect("refusal");
        assert_eq!(fallback.reason_code, ReasonCode::PrefilterSqlInjection);
    }

    #[test]
    fn unmatched_query_falls_back_to_head() {
        let response = lexical_router().route(&request("zzz qqq xxx", weather_pool()));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref.as_deref(), Some("org.calc"));
        assert!(decision.approximate);
        assert_eq!(
            decision.decision_stability,
            DecisionStability::FallbackDefault
        );
    }

    #[test]
    fn tiebreak_picks_smallest_skill_id() {
        // Identical documents at identical risk: scores tie exactly and
        // the UTF-8 smallest id must win regardless of input order.
        let pool = vec![
            CandidateSkill {
                skill_id: "org.zeta".into(),
                name: Some("Echo".into()),
                description: Some("echo repeat text".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::Low,
                safety_clearance: None,
            },
            CandidateSkill {
                skill_id: "org.alpha".into(),
                name: Some("Echo".into()),
                description: Some("echo repeat text".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::Low,
                safety_clearance: None,
            },
        ];
        let response = lexical_router().route(&request("echo repeat text", pool));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref.as_deref(), Some("org.alpha"));
        assert!(decision.tie_break_applied);
        assert_eq!(
            decision.decision_stability,
            DecisionStability::TieBreakLexicalOrder
        );
    }

    #[test]
    fn tiebreak_keeps_pre_tiebreak_clearance() {
        // The tiebreak hands the decision to org.alpha, but the reported
        // clearance comes from the pre-tiebreak top of the pool.
        let pool = vec![
            CandidateSkill {
                skill_id: "org.zeta".into(),
                name: Some("Echo".into()),
                description: Some("echo repeat text".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::Low,
                safety_clearance: Some(SafetyClearance::Restricted),
            },
            CandidateSkill {
                skill_id: "org.alpha".into(),
                name: Some("Echo".into()),
                description: Some("echo repeat text".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::Low,
                safety_clearance: None,
            },
        ];
        let response = lexical_router().route(&request("echo repeat text", pool));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref.as_deref(), Some("org.alpha"));
        assert!(decision.tie_break_applied);
        assert_eq!(decision.safety_clearance, SafetyClearance::Restricted);
    }

    #[test]
    fn risk_narrowing_prefers_lower_risk() {
        let pool = vec![
            CandidateSkill {
                skill_id: "org.risky".into(),
                name: Some("Echo".into()),
                description: Some("echo repeat text".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::High,
                safety_clearance: None,
            },
            CandidateSkill {
                skill_id: "org.safe".into(),
                name: Some("Echo".into()),
                description: Some("echo repeat text".into()),
                activation_keywords: vec![],
                risk_level: RiskLevel::Low,
                safety_clearance: None,
            },
        ];
        let response = lexical_router().route(&request("echo repeat text", pool));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref.as_deref(), Some("org.safe"));
        assert_eq!(
            decision.decision_stability,
            DecisionStability::ConflictResolved
        );
        let codes: Vec<&str> = decision
            .trace_events
            .iter()
            .map(|e| e.code.as_str())
            .collect();
        assert!(codes.contains(&"STAGE3_LOWER_RISK_SELECTED"));
    }

    #[test]
    fn routing_is_deterministic_with_semantic_disabled() {
        let req = RouteRequest {
            routing_conditions: RoutingConditions { skip_semantic: true },
            ..request("what is the weather forecast", weather_pool())
        };
        let a = lexical_router().route(&req);
        let b = lexical_router().route(&req);
        let (a, b) = (a.as_decision().unwrap(), b.as_decision().unwrap());
        assert_eq!(a.skill_ref, b.skill_ref);
        assert_eq!(a.decision_stability, b.decision_stability);
        assert_eq!(a.safety_clearance, b.safety_clearance);
        assert_eq!(a.approximate, b.approximate);
        assert_eq!(a.tie_break_applied, b.tie_break_applied);
        let codes = |d: &RoutingDecision| -> Vec<String> {
            d.trace_events.iter().map(|e| e.code.clone()).collect()
        };
        assert_eq!(codes(a), codes(b));
    }

    #[test]
    fn second_identical_call_hits_cache() {
        let router = router();
        let req = request("what is the weather forecast", weather_pool());
        let first = router.route(&req);
        let second = router.route(&req);
        let second = second.as_decision().expect("decision");
        assert_eq!(
            second.skill_ref,
            first.as_decision().unwrap().skill_ref
        );
        assert_eq!(second.trace_events.len(), 1);
        assert_eq!(second.trace_events[0].code, "CACHE_HIT");
    }

    #[test]
    fn skip_semantic_emits_stage2_skipped() {
        let router = router();
        let req = RouteRequest {
            routing_conditions: RoutingConditions { skip_semantic: true },
            ..request("what is the weather forecast", weather_pool())
        };
        let response = router.route(&req);
        let decision = response.as_decision().expect("decision");
        assert!(
            decision
                .trace_events
                .iter()
                .any(|e| e.code == "STAGE2_SKIPPED")
        );
    }

    #[test]
    fn failing_embedder_falls_back_to_lexical() {
        use crate::embedder::EmbedderError;

        struct BrokenEmbedder;
        impl Embedder for BrokenEmbedder {
            fn encode_batch(&self, _: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
                Err(EmbedderError("connection reset".into()))
            }
        }

        let router = RouterService::new(Arc::new(SafetyEngine::new()), Some(Arc::new(BrokenEmbedder)));
        let response = router.route(&request("what is the weather forecast", weather_pool()));
        let decision = response.as_decision().expect("decision");
        assert_eq!(decision.skill_ref.as_deref(), Some("org.weather"));
        let codes: Vec<&str> = decision
            .trace_events
            .iter()
            .map(|e| e.code.as_str())
            .collect();
        assert!(codes.contains(&"STAGE2_EMBEDDING_TIMEOUT"));
        assert!(codes.contains(&"ROUTING_FALLBACK_LEXICAL"));
    }

    #[test]
    fn long_queries_are_truncated_not_rejected() {
        let long_query = "weather ".repeat(2000);
        let response = router().route(&request(&long_query, weather_pool()));
        assert!(response.as_decision().is_some());
    }

    #[test]
    fn classifier_failure_fails_closed_through_router() {
        struct FailingClassifier;
        impl osp_safety::Classifier for FailingClassifier {
            fn classify(
                &self,
                _query: &str,
            ) -> Result<Option<osp_safety::Classification>, osp_safety::ClassifierError>
            {
                Err(osp_safety::ClassifierError("backend offline".into()))
            }
        }

        let safety = Arc::new(SafetyEngine::with_classifier(Box::new(FailingClassifier)));
        let router = RouterService::new(safety, None);
        let response = router.route(&request("hello there", weather_pool()));
        let fallback = response.as_fallback().expect("fail closed");
        assert_eq!(
            fallback.reason_code,
            ReasonCode::SafetyClassifierUnavailable
        );
    }
}
