// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry entry shapes.

use chrono::{DateTime, Utc};
use osp_canon::{Algorithm, KeyMaterial, SignError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registry mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// Register a new skill.
    Register,
    /// Revoke a skill.
    Revoke,
    /// Delegate authority over a skill.
    Delegate,
    /// Rotate the signing key for a skill.
    KeyRotate,
}

/// Root of trust for an entry's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustAnchorType {
    /// Signed by the registrant itself; accepted at the lowest trust level.
    SelfSigned,
    /// Anchored at a root certificate authority.
    RootCa,
    /// Anchored at an intermediate authority; requires a chain proof.
    IntermediateCa,
    /// Anchored at a decentralized identifier.
    Did,
}

/// Trust anchor reference carried on an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustAnchor {
    /// Anchor kind.
    #[serde(rename = "type")]
    pub anchor_type: TrustAnchorType,
    /// Anchor URI; required for every kind except self-signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Chain proof; required for intermediate authorities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    /// SPKI PEM public key used to verify the entry's signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl TrustAnchor {
    /// A self-signed anchor.
    #[must_use]
    pub fn self_signed() -> Self {
        Self {
            anchor_type: TrustAnchorType::SelfSigned,
            uri: None,
            proof: None,
            public_key: None,
        }
    }
}

/// A signed registry mutation as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Mutation kind.
    pub entry_type: EntryType,
    /// DNS-like dotted skill identifier, optionally `@version` suffixed.
    pub skill_ref: String,
    /// Unix timestamp of the mutation.
    pub timestamp: i64,
    /// Signer identity.
    pub signed_by: String,
    /// 64-char lowercase hex SHA-256 of the skill content.
    pub content_hash: String,
    /// Base64 detached signature over the entry's canonical form minus
    /// this field.
    pub signature: String,
    /// Signature algorithm.
    pub alg: Algorithm,
    /// Root of trust.
    pub trust_anchor: TrustAnchor,
}

impl RegistryEntry {
    /// The value that is signed: the entry serialized with the `signature`
    /// field removed.
    #[must_use]
    pub fn signing_payload(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("signature");
        }
        value
    }

    /// Sign the entry in place with the given key.
    ///
    /// # Errors
    ///
    /// Propagates [`SignError`] from the canonicalizer.
    pub fn sign(&mut self, key: &KeyMaterial) -> Result<(), SignError> {
        self.signature = osp_canon::sign(&self.signing_payload(), key, self.alg)?;
        Ok(())
    }
}

/// Lifecycle state of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Registered and usable.
    Active,
    /// Revoked; the `skill_ref` is permanently burned.
    Revoked,
}

/// A registry entry as stored by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The submitted entry.
    #[serde(flatten)]
    pub entry: RegistryEntry,
    /// When the service accepted it.
    pub registered_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: EntryStatus,
    /// When it was revoked, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    /// Who revoked it, if anyone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
}
