// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical JSON byte encoding.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Encode a JSON value as canonical bytes.
///
/// - Object keys sorted by Unicode code point (byte order of their UTF-8
///   encodings, which is the same ordering).
/// - No insignificant whitespace.
/// - Strings escaped minimally: quote, backslash, and control characters
///   only; non-ASCII stays unescaped UTF-8.
/// - Integers without a decimal point; floats in shortest round-trip form,
///   with integral floats collapsed to integer notation. `NaN` and
///   infinities are unrepresentable in [`Value`], so they are rejected at
///   construction rather than here.
/// - `true` / `false` / `null` literal.
///
/// Two semantically equal values always produce byte-identical output.
#[must_use]
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode(value, &mut out);
    out
}

/// Hex SHA-256 digest of the canonical bytes of `value`.
#[must_use]
pub fn hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize(value));
    format!("{:x}", hasher.finalize())
}

fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => encode_number(n, out),
        Value::String(s) => encode_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                encode(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // serde_json's default map is a BTreeMap, so iteration order is
            // already sorted by key.
            out.push(b'{');
            for (i, (key, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                encode_string(key, out);
                out.push(b':');
                encode(val, out);
            }
            out.push(b'}');
        }
    }
}

fn encode_number(n: &serde_json::Number, out: &mut Vec<u8>) {
    if let Some(i) = n.as_i64() {
        out.extend_from_slice(i.to_string().as_bytes());
    } else if let Some(u) = n.as_u64() {
        out.extend_from_slice(u.to_string().as_bytes());
    } else if let Some(f) = n.as_f64() {
        encode_float(f, out);
    }
}

fn encode_float(f: f64, out: &mut Vec<u8>) {
    if f == 0.0 {
        // Covers negative zero as well.
        out.push(b'0');
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        out.extend_from_slice(format!("{f:.0}").as_bytes());
    } else {
        let mut buf = ryu_shortest(f);
        out.append(&mut buf);
    }
}

/// Shortest round-trip form via serde_json's own float writer.
fn ryu_shortest(f: f64) -> Vec<u8> {
    serde_json::to_vec(&f).unwrap_or_else(|_| f.to_string().into_bytes())
}

fn encode_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\u{0c}' => out.extend_from_slice(b"\\f"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon_str(v: &Value) -> String {
        String::from_utf8(canonicalize(v)).unwrap()
    }

    #[test]
    fn sorts_object_keys() {
        let v = json!({"zeta": 1, "alpha": 2, "mid": {"b": 1, "a": 2}});
        assert_eq!(
            canon_str(&v),
            r#"{"alpha":2,"mid":{"a":2,"b":1},"zeta":1}"#
        );
    }

    #[test]
    fn equal_values_produce_identical_bytes() {
        let a: Value = serde_json::from_str(r#"{ "b" : 1 , "a" : [ 1 , 2 ] }"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":[1,2],"b":1}"#).unwrap();
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn integers_have_no_decimal_point() {
        assert_eq!(canon_str(&json!(42)), "42");
        assert_eq!(canon_str(&json!(-7)), "-7");
        assert_eq!(canon_str(&json!(0)), "0");
    }

    #[test]
    fn integral_floats_collapse_to_integers() {
        let v: Value = serde_json::from_str("2.0").unwrap();
        assert_eq!(canon_str(&v), "2");
        let v: Value = serde_json::from_str("-3.0").unwrap();
        assert_eq!(canon_str(&v), "-3");
    }

    #[test]
    fn fractional_floats_use_shortest_form() {
        assert_eq!(canon_str(&json!(1.5)), "1.5");
        assert_eq!(canon_str(&json!(0.25)), "0.25");
    }

    #[test]
    fn negative_zero_is_zero() {
        let v: Value = serde_json::from_str("-0.0").unwrap();
        assert_eq!(canon_str(&v), "0");
    }

    #[test]
    fn literals_are_literal() {
        assert_eq!(canon_str(&json!(null)), "null");
        assert_eq!(canon_str(&json!(true)), "true");
        assert_eq!(canon_str(&json!(false)), "false");
    }

    #[test]
    fn non_ascii_stays_unescaped() {
        assert_eq!(canon_str(&json!("héllo ☃")), "\"héllo ☃\"");
    }

    #[test]
    fn control_characters_escape() {
        assert_eq!(canon_str(&json!("a\nb")), "\"a\\nb\"");
        assert_eq!(canon_str(&json!("a\u{01}b")), "\"a\\u0001b\"");
        assert_eq!(canon_str(&json!("quote\"back\\")), "\"quote\\\"back\\\\\"");
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let h = hash(&json!({"k": "v"}));
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_key_order_independent() {
        let a = json!({"x": 1, "y": [true, null]});
        let b: Value = serde_json::from_str(r#"{"y":[true,null],"x":1}"#).unwrap();
        assert_eq!(hash(&a), hash(&b));
    }
}
