// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `osp.conformance.run` self-check.
//!
//! Exercises one invariant from each engine-plane subsystem in-process and
//! reports a pass/fail map. Not a substitute for the test suite; a liveness
//! probe a client can call over the wire.

use chrono::{Duration, Utc};
use osp_canon::{Algorithm, KeyMaterial};
use osp_core::{GENESIS_HASH, PROTOCOL_VERSION, SERVER_VERSION};
use osp_degradation::{DegradationLevel, HysteresisTracker};
use osp_delivery::{DeliveryContract, Freshness};
use osp_safety::kl_divergence;
use serde_json::{Value, json};

/// Run all self-checks and build the conformance summary.
#[must_use]
pub fn run_conformance() -> Value {
    let checks = [
        ("canonicalization_deterministic", check_canonicalization()),
        ("signature_roundtrip", check_signature_roundtrip()),
        ("hash_chain_genesis", check_genesis()),
        ("freshness_lifecycle", check_freshness()),
        ("kl_divergence_identity", check_kl_identity()),
        ("degradation_hysteresis", check_hysteresis()),
    ];

    let all_pass = checks.iter().all(|(_, ok)| *ok);
    let mut map = serde_json::Map::new();
    for (name, ok) in checks {
        map.insert(name.to_string(), json!(if ok { "pass" } else { "fail" }));
    }

    json!({
        "protocol": PROTOCOL_VERSION,
        "server": SERVER_VERSION,
        "checks": Value::Object(map),
        "pipeline": {
            "routing": "4-stage (BM25 + semantic rerank + conflict resolution)",
            "safety": "prefilters + TF-IDF classifier + KL anomaly brake",
            "degradation": "D0-D3 with hysteresis",
            "crypto": "9 algorithms (ES/RS/EdDSA/HMAC)",
        },
        "status": if all_pass { "conformant" } else { "nonconformant" },
    })
}

fn check_canonicalization() -> bool {
    let a: Value = serde_json::from_str(r#"{"b": 1, "a": [true, null, 2.0]}"#).unwrap_or_default();
    let b: Value = serde_json::from_str(r#"{"a": [true, null, 2.0], "b": 1}"#).unwrap_or_default();
    osp_canon::canonicalize(&a) == osp_canon::canonicalize(&b)
        && osp_canon::hash(&a) == osp_canon::hash(&a)
}

fn check_signature_roundtrip() -> bool {
    let value = json!({"probe": "conformance"});
    let Ok(pair) = osp_canon::generate_key(Algorithm::Hs256) else {
        return false;
    };
    let Ok(signature) = osp_canon::sign(&value, &pair.private, Algorithm::Hs256) else {
        return false;
    };
    let tampered = json!({"probe": "tampered"});
    osp_canon::verify(&value, &signature, &pair.private, Algorithm::Hs256)
        && !osp_canon::verify(&tampered, &signature, &pair.private, Algorithm::Hs256)
        && !osp_canon::verify(
            &value,
            &signature,
            &KeyMaterial::secret(b"wrong".to_vec()),
            Algorithm::Hs256,
        )
}

fn check_genesis() -> bool {
    GENESIS_HASH.len() == 64 && GENESIS_HASH.bytes().all(|b| b == b'0')
}

fn check_freshness() -> bool {
    let contract = DeliveryContract::issue("org.probe", 100, 3, "probe", Utc::now());
    contract.freshness_at(contract.issued_at + Duration::seconds(10)) == Freshness::Fresh
        && contract.freshness_at(contract.issued_at + Duration::seconds(85)) == Freshness::Stale
        && contract.freshness_at(contract.issued_at + Duration::seconds(150)) == Freshness::Expired
}

fn check_kl_identity() -> bool {
    let p = [0.25, 0.25, 0.25, 0.25];
    let degenerate = [0.97, 0.01, 0.01, 0.01];
    kl_divergence(&p, &p).abs() < 1e-9 && kl_divergence(&degenerate, &p) > 0.5
}

fn check_hysteresis() -> bool {
    let mut tracker = HysteresisTracker::new();
    let first = tracker.observe(DegradationLevel::D0Normal, DegradationLevel::D2Minimal);
    let second = tracker.observe(DegradationLevel::D0Normal, DegradationLevel::D2Minimal);
    first.is_none() && second == Some(DegradationLevel::D2Minimal)
}
