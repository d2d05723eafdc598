// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for canonicalization determinism.

use osp_canon::{canonicalize, hash};
use proptest::prelude::*;
use serde_json::Value;

/// Recursive strategy over JSON-compatible values.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        // Finite floats only: NaN and infinities are unrepresentable in JSON.
        any::<f64>().prop_filter_map("finite", |f| {
            serde_json::Number::from_f64(f).map(Value::Number)
        }),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map(".*", inner, 0..8).prop_map(|m| {
                Value::Object(m.into_iter().collect())
            }),
        ]
    })
}

proptest! {
    /// Serializing, reparsing, and re-canonicalizing is a fixed point.
    #[test]
    fn canonical_form_is_stable(value in arb_json()) {
        let first = canonicalize(&value);
        let reparsed: Value = serde_json::from_slice(&first).unwrap();
        let second = canonicalize(&reparsed);
        prop_assert_eq!(first, second);
    }

    /// Canonical bytes are themselves valid JSON.
    #[test]
    fn canonical_bytes_parse(value in arb_json()) {
        let bytes = canonicalize(&value);
        let parsed: Result<Value, _> = serde_json::from_slice(&bytes);
        prop_assert!(parsed.is_ok());
    }

    /// Hashing is deterministic per value.
    #[test]
    fn hash_is_deterministic(value in arb_json()) {
        prop_assert_eq!(hash(&value), hash(&value));
    }
}
