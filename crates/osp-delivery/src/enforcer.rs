// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delivery-contract enforcer.

use crate::contract::{DeliveryContract, ExecutionStatus, Freshness};
use crate::proof::{ProofEntry, ProofLog, ProofPage};
use async_trait::async_trait;
use chrono::Utc;
use lru::LruCache;
use osp_degradation::DegradationController;
use serde::Serialize;
use serde_json::{Value, json};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Contracts retained in memory.
const MAX_CONTRACTS: usize = 1000;
/// Default contract TTL.
pub const DEFAULT_TTL_SECONDS: u64 = 300;
/// Default retry budget beyond the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A skill execution failed; the enforcer's retry loop catches these.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct SkillError(pub String);

/// The skill ABI: validated arguments in, verbatim-stored result out.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Execute with the given arguments.
    async fn execute(&self, arguments: Value) -> Result<Value, SkillError>;
}

/// Errors that preclude issuing or running a contract at all.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Admission denied by the degradation controller.
    #[error("service unavailable: load shedding in effect")]
    RejectedDegradation,
}

/// Terminal disposition of one `execute_with_contract` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The skill ran (or had already run) successfully.
    Success,
    /// Retries were exhausted.
    Failed,
    /// The contract expired before execution.
    Expired,
}

/// Result envelope: the skill result (or error) plus the contract snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    /// Skill result, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message, present on failure or expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Contract snapshot at completion.
    pub contract: DeliveryContract,
    /// Whether a cached result satisfied the call.
    pub idempotent: bool,
    /// Terminal disposition.
    pub status: DeliveryStatus,
}

struct EnforcerState {
    contracts: LruCache<String, DeliveryContract>,
    proof: ProofLog,
}

/// Wraps skill executions in delivery contracts.
///
/// Contract mutations and proof appends happen under one lock so that
/// proof sequence numbers serialize and `prev_hash` always references the
/// immediately prior entry. The lock is never held across a skill call.
pub struct DeliveryEnforcer {
    state: Mutex<EnforcerState>,
}

impl DeliveryEnforcer {
    /// Empty enforcer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EnforcerState {
                contracts: LruCache::new(
                    NonZeroUsize::new(MAX_CONTRACTS).expect("capacity is nonzero"),
                ),
                proof: ProofLog::new(),
            }),
        }
    }

    /// Issue a contract, or return the existing non-expired contract for
    /// the same idempotency key.
    pub fn issue_contract(
        &self,
        skill_ref: &str,
        ttl_seconds: u64,
        max_retries: u32,
        idempotency_key: Option<String>,
    ) -> DeliveryContract {
        let key = idempotency_key.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut state = self.lock();
        state.issue(skill_ref, ttl_seconds, max_retries, key)
    }

    /// Execute `skill` under a contract.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::RejectedDegradation`] when the controller is
    /// shedding load; every other disposition is reported in-band through
    /// the [`DeliveryOutcome`].
    pub async fn execute_with_contract(
        &self,
        skill_ref: &str,
        skill: &dyn Skill,
        arguments: Value,
        ttl_seconds: u64,
        idempotency_key: Option<String>,
        degradation: Option<&DegradationController>,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        if let Some(controller) = degradation
            && !controller.check_request_allowed()
        {
            let key = idempotency_key.as_deref().unwrap_or("unassigned");
            warn!(skill_ref, "execution rejected: load shedding");
            self.lock()
                .proof
                .append("REJECTED_DEGRADATION", key, json!({"skill_ref": skill_ref}));
            return Err(DeliveryError::RejectedDegradation);
        }

        // Issue or retrieve under the lock, then release it for execution.
        let contract = {
            let key = idempotency_key.unwrap_or_else(|| Uuid::new_v4().to_string());
            let mut state = self.lock();
            let contract = state.issue(skill_ref, ttl_seconds, DEFAULT_MAX_RETRIES, key);

            if contract.execution_status == ExecutionStatus::Completed {
                state.proof.append(
                    "IDEMPOTENT_RETURN",
                    &contract.idempotency_key,
                    json!({"reason": "already_executed"}),
                );
                return Ok(DeliveryOutcome {
                    result: contract.execution_result.clone(),
                    error: None,
                    contract,
                    idempotent: true,
                    status: DeliveryStatus::Success,
                });
            }

            let mut contract = contract;
            if contract.refresh() == Freshness::Expired {
                state.proof.append(
                    "CONTRACT_EXPIRED",
                    &contract.idempotency_key,
                    json!({"skill_ref": skill_ref}),
                );
                state.store(contract.clone());
                return Ok(DeliveryOutcome {
                    result: None,
                    error: Some("Contract expired before execution".into()),
                    contract,
                    idempotent: false,
                    status: DeliveryStatus::Expired,
                });
            }
            contract
        };

        let key = contract.idempotency_key.clone();
        let max_retries = contract.max_retries;
        let mut last_error = String::new();

        for attempt in 1..=max_retries + 1 {
            let started = Instant::now();
            match skill.execute(arguments.clone()).await {
                Ok(result) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    let mut state = self.lock();
                    let updated = state.complete(&contract, result.clone());
                    state.proof.append(
                        "EXECUTION_SUCCESS",
                        &key,
                        json!({
                            "skill_ref": skill_ref,
                            "attempt": attempt,
                            "latency_ms": latency_ms,
                        }),
                    );
                    info!(skill_ref, attempt, latency_ms, "execution succeeded");
                    return Ok(DeliveryOutcome {
                        result: Some(result),
                        error: None,
                        contract: updated,
                        idempotent: false,
                        status: DeliveryStatus::Success,
                    });
                }
                Err(err) => {
                    last_error = err.to_string();
                    warn!(skill_ref, attempt, error = last_error.as_str(), "execution attempt failed");
                    let mut state = self.lock();
                    state.record_retry(&key, attempt);
                    state.proof.append(
                        "EXECUTION_RETRY",
                        &key,
                        json!({
                            "skill_ref": skill_ref,
                            "attempt": attempt,
                            "error": last_error,
                        }),
                    );
                }
            }
        }

        let mut state = self.lock();
        let updated = state.fail(&contract);
        state.proof.append(
            "EXECUTION_FAILED",
            &key,
            json!({
                "skill_ref": skill_ref,
                "retries_exhausted": max_retries + 1,
                "last_error": last_error,
            }),
        );
        Ok(DeliveryOutcome {
            result: None,
            error: Some(format!(
                "Execution failed after {} attempts: {last_error}",
                max_retries + 1
            )),
            contract: updated,
            idempotent: false,
            status: DeliveryStatus::Failed,
        })
    }

    /// The audit trail for one idempotency key: the contract snapshot
    /// (freshness re-evaluated at read time) plus all retained proof
    /// entries for the key.
    #[must_use]
    pub fn get_proof(&self, idempotency_key: &str) -> Option<(DeliveryContract, Vec<ProofEntry>)> {
        let mut state = self.lock();
        let mut contract = state.contracts.get(idempotency_key)?.clone();
        contract.refresh();
        state.store(contract.clone());
        let entries = state.proof.entries_for(idempotency_key);
        Some((contract, entries))
    }

    /// Paginated view over the whole retained proof log.
    #[must_use]
    pub fn get_all_proofs(&self, limit: usize, offset: usize) -> ProofPage {
        self.lock().proof.page(limit, offset)
    }

    /// Verify proof-chain continuity over the retained window.
    pub fn verify_proof_chain(&self) -> bool {
        self.lock().proof.verify().is_ok()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EnforcerState> {
        self.state.lock().expect("delivery state lock poisoned")
    }
}

impl Default for DeliveryEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnforcerState {
    fn issue(
        &mut self,
        skill_ref: &str,
        ttl_seconds: u64,
        max_retries: u32,
        key: String,
    ) -> DeliveryContract {
        if let Some(existing) = self.contracts.get(&key) {
            let mut existing = existing.clone();
            if existing.refresh() != Freshness::Expired {
                info!(
                    idempotency_key = key.as_str(),
                    freshness = ?existing.freshness,
                    "idempotent contract hit"
                );
                self.store(existing.clone());
                return existing;
            }
        }

        let contract =
            DeliveryContract::issue(skill_ref, ttl_seconds, max_retries, key.clone(), Utc::now());
        self.store(contract.clone());
        self.proof.append(
            "CONTRACT_ISSUED",
            &key,
            json!({"skill_ref": skill_ref, "ttl_seconds": ttl_seconds}),
        );
        info!(skill_ref, idempotency_key = key.as_str(), ttl_seconds, "contract issued");
        contract
    }

    fn store(&mut self, contract: DeliveryContract) {
        self.contracts.put(contract.idempotency_key.clone(), contract);
    }

    /// Mark a contract completed. The in-flight snapshot is the fallback
    /// base in case the stored contract was evicted mid-execution.
    fn complete(&mut self, base: &DeliveryContract, result: Value) -> DeliveryContract {
        let mut contract = self
            .contracts
            .get(&base.idempotency_key)
            .cloned()
            .unwrap_or_else(|| base.clone());
        contract.execution_result = Some(result);
        contract.execution_status = ExecutionStatus::Completed;
        contract.refresh();
        self.store(contract.clone());
        contract
    }

    fn record_retry(&mut self, key: &str, attempt: u32) {
        if let Some(contract) = self.contracts.get_mut(key) {
            contract.retries_used = attempt;
        }
    }

    fn fail(&mut self, base: &DeliveryContract) -> DeliveryContract {
        let mut contract = self
            .contracts
            .get(&base.idempotency_key)
            .cloned()
            .unwrap_or_else(|| base.clone());
        contract.execution_status = ExecutionStatus::Failed;
        self.store(contract.clone());
        contract
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osp_degradation::DegradationLevel;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct AddSkill;

    #[async_trait]
    impl Skill for AddSkill {
        async fn execute(&self, arguments: Value) -> Result<Value, SkillError> {
            let x = arguments["x"].as_i64().unwrap_or(0);
            let y = arguments["y"].as_i64().unwrap_or(0);
            Ok(json!({"answer": x + y}))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Skill for AlwaysFails {
        async fn execute(&self, _arguments: Value) -> Result<Value, SkillError> {
            Err(SkillError("downstream unavailable".into()))
        }
    }

    struct FailsOnce {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Skill for FailsOnce {
        async fn execute(&self, _arguments: Value) -> Result<Value, SkillError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SkillError("flaky".into()))
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    #[tokio::test]
    async fn successful_execution_caches_result() {
        let enforcer = DeliveryEnforcer::new();
        let outcome = enforcer
            .execute_with_contract(
                "org.calc",
                &AddSkill,
                json!({"x": 2, "y": 3}),
                300,
                Some("K1".into()),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Success);
        assert!(!outcome.idempotent);
        assert_eq!(outcome.result.unwrap()["answer"], 5);
        assert_eq!(outcome.contract.execution_status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn second_call_is_idempotent_and_logged() {
        let enforcer = DeliveryEnforcer::new();
        let args = json!({"x": 2, "y": 3});
        let first = enforcer
            .execute_with_contract("org.calc", &AddSkill, args.clone(), 300, Some("K1".into()), None)
            .await
            .unwrap();
        let second = enforcer
            .execute_with_contract("org.calc", &AddSkill, args, 300, Some("K1".into()), None)
            .await
            .unwrap();

        assert!(second.idempotent);
        assert_eq!(second.result, first.result);

        let (_, entries) = enforcer.get_proof("K1").unwrap();
        let events: Vec<&str> = entries.iter().map(|e| e.event_type.as_str()).collect();
        assert!(events.contains(&"CONTRACT_ISSUED"));
        assert!(events.contains(&"EXECUTION_SUCCESS"));
        assert!(events.contains(&"IDEMPOTENT_RETURN"));
    }

    #[tokio::test]
    async fn retries_exhaust_then_fail() {
        let enforcer = DeliveryEnforcer::new();
        let outcome = enforcer
            .execute_with_contract("org.flaky", &AlwaysFails, json!({}), 300, Some("K2".into()), None)
            .await
            .unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert_eq!(outcome.contract.execution_status, ExecutionStatus::Failed);
        assert!(outcome.error.unwrap().contains("4 attempts"));

        let (_, entries) = enforcer.get_proof("K2").unwrap();
        let retries = entries
            .iter()
            .filter(|e| e.event_type == "EXECUTION_RETRY")
            .count();
        assert_eq!(retries, 4);
        assert!(entries.iter().any(|e| e.event_type == "EXECUTION_FAILED"));
    }

    #[tokio::test]
    async fn transient_failure_recovers_within_budget() {
        let enforcer = DeliveryEnforcer::new();
        let skill = FailsOnce { calls: AtomicU32::new(0) };
        let outcome = enforcer
            .execute_with_contract("org.flaky", &skill, json!({}), 300, Some("K3".into()), None)
            .await
            .unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Success);
        assert_eq!(outcome.contract.retries_used, 1);
    }

    #[tokio::test]
    async fn zero_ttl_contract_expires_before_execution() {
        let enforcer = DeliveryEnforcer::new();
        let outcome = enforcer
            .execute_with_contract("org.calc", &AddSkill, json!({}), 0, Some("K4".into()), None)
            .await
            .unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Expired);
        assert_eq!(outcome.contract.freshness, Freshness::Expired);

        let (_, entries) = enforcer.get_proof("K4").unwrap();
        assert!(entries.iter().any(|e| e.event_type == "CONTRACT_EXPIRED"));
    }

    #[tokio::test]
    async fn load_shedding_rejects_before_issuing() {
        let enforcer = DeliveryEnforcer::new();
        let controller = DegradationController::new();
        controller.set_level(DegradationLevel::D3Critical);

        let result = enforcer
            .execute_with_contract(
                "org.calc",
                &AddSkill,
                json!({}),
                300,
                Some("K5".into()),
                Some(&controller),
            )
            .await;

        assert!(matches!(result, Err(DeliveryError::RejectedDegradation)));
        assert!(enforcer.get_proof("K5").is_none());
        let page = enforcer.get_all_proofs(10, 0);
        assert!(
            page.entries
                .iter()
                .any(|e| e.event_type == "REJECTED_DEGRADATION")
        );
    }

    #[tokio::test]
    async fn proof_chain_remains_verifiable() {
        let enforcer = DeliveryEnforcer::new();
        for i in 0..5 {
            let _ = enforcer
                .execute_with_contract(
                    "org.calc",
                    &AddSkill,
                    json!({"x": i, "y": i}),
                    300,
                    Some(format!("key-{i}")),
                    None,
                )
                .await
                .unwrap();
        }
        assert!(enforcer.verify_proof_chain());
    }

    #[tokio::test]
    async fn issue_contract_is_idempotent_for_live_contracts() {
        let enforcer = DeliveryEnforcer::new();
        let first = enforcer.issue_contract("org.calc", 300, 3, Some("K6".into()));
        let second = enforcer.issue_contract("org.calc", 300, 3, Some("K6".into()));
        assert_eq!(first.issued_at, second.issued_at);

        let page = enforcer.get_all_proofs(50, 0);
        let issued = page
            .entries
            .iter()
            .filter(|e| e.event_type == "CONTRACT_ISSUED" && e.idempotency_key == "K6")
            .count();
        assert_eq!(issued, 1);
    }
}
