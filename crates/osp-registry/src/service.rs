// SPDX-License-Identifier: MIT OR Apache-2.0

//! The registry service: validation, trust chains, revocation.

use crate::entry::{EntryStatus, EntryType, RegistryEntry, StoredEntry, TrustAnchorType};
use crate::log::{TransparencyLog, TransparencyPage};
use chrono::Utc;
use lru::LruCache;
use osp_canon::KeyMaterial;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{LazyLock, Mutex};
use tracing::{info, warn};

/// Entries retained in the registry map.
const MAX_ENTRIES: usize = 10_000;

static SKILL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*(@[0-9]+(\.[0-9]+)*)?$")
        .expect("skill_ref pattern is valid")
});

static CONTENT_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").expect("content_hash pattern is valid"));

/// Structured registry failure with a stable code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The entry type cannot be registered.
    #[error("invalid entry_type for registration: {0}")]
    InvalidEntryType(String),

    /// The skill reference is empty or malformed.
    #[error("invalid skill_ref: {0:?}")]
    InvalidSkillRef(String),

    /// The content hash is not 64 lowercase hex characters.
    #[error("invalid content_hash: must be 64-char hex (SHA-256)")]
    InvalidContentHash,

    /// The signature field is empty.
    #[error("missing signature")]
    MissingSignature,

    /// The trust chain could not be verified.
    #[error("trust chain verification failed: {reason}")]
    TrustChainInvalid {
        /// Why verification failed.
        reason: String,
    },

    /// The signature did not verify.
    #[error("signature verification failed: {reason}")]
    InvalidSignature {
        /// Why verification failed.
        reason: String,
    },

    /// The skill was revoked; re-registration is permanently refused.
    #[error("skill '{skill_ref}' has been revoked")]
    RevokedSkill {
        /// The burned reference.
        skill_ref: String,
    },

    /// No entry exists for the reference.
    #[error("skill '{skill_ref}' not found in registry")]
    NotFound {
        /// The missing reference.
        skill_ref: String,
    },

    /// The caller may not revoke this entry.
    #[error("unauthorized: only '{owner}' or the configured admin can revoke this skill")]
    UnauthorizedRevoke {
        /// The identity that registered the entry.
        owner: String,
    },
}

impl RegistryError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEntryType(_) => "invalid_entry_type",
            Self::InvalidSkillRef(_) => "invalid_skill_ref",
            Self::InvalidContentHash => "invalid_content_hash",
            Self::MissingSignature => "missing_signature",
            Self::TrustChainInvalid { .. } => "trust_chain_invalid",
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::RevokedSkill { .. } => "revoked_skill",
            Self::NotFound { .. } => "not_found",
            Self::UnauthorizedRevoke { .. } => "unauthorized_revoke",
        }
    }
}

/// Successful trust-chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustVerification {
    /// The trust level granted.
    pub trust_level: TrustAnchorType,
    /// What vouched for the entry (a URI, or `"implicit"`).
    pub verified_by: String,
}

struct RegistryState {
    entries: LruCache<String, StoredEntry>,
    log: TransparencyLog,
    revoked: HashSet<String>,
}

/// The skill registry.
pub struct RegistryService {
    state: Mutex<RegistryState>,
    admin_identity: Option<String>,
}

impl RegistryService {
    /// Registry with an optional admin identity allowed to revoke any
    /// entry.
    #[must_use]
    pub fn new(admin_identity: Option<String>) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                entries: LruCache::new(NonZeroUsize::new(MAX_ENTRIES).expect("capacity is nonzero")),
                log: TransparencyLog::new(),
                revoked: HashSet::new(),
            }),
            admin_identity,
        }
    }

    /// Validate and store a registry entry.
    ///
    /// # Errors
    ///
    /// Any [`RegistryError`]; signature failures are additionally recorded
    /// in the transparency log as `REGISTER_REJECTED`.
    pub fn register(&self, entry: RegistryEntry) -> Result<StoredEntry, RegistryError> {
        if entry.entry_type == EntryType::Revoke {
            return Err(RegistryError::InvalidEntryType("REVOKE".into()));
        }
        if entry.skill_ref.is_empty() || !SKILL_REF_RE.is_match(&entry.skill_ref) {
            return Err(RegistryError::InvalidSkillRef(entry.skill_ref.clone()));
        }
        if !CONTENT_HASH_RE.is_match(&entry.content_hash) {
            return Err(RegistryError::InvalidContentHash);
        }
        if entry.signature.is_empty() {
            return Err(RegistryError::MissingSignature);
        }

        self.verify_trust_chain(&entry)?;

        if let Err(err) = self.verify_signature(&entry) {
            let mut state = self.lock();
            state.log.append(
                "REGISTER_REJECTED",
                &entry.skill_ref,
                json!({
                    "reason": err.code(),
                    "alg": entry.alg.as_str(),
                    "signed_by": entry.signed_by,
                }),
            );
            return Err(err);
        }

        let mut state = self.lock();
        if state.revoked.contains(&entry.skill_ref) {
            return Err(RegistryError::RevokedSkill {
                skill_ref: entry.skill_ref.clone(),
            });
        }

        let stored = StoredEntry {
            registered_at: Utc::now(),
            status: EntryStatus::Active,
            revoked_at: None,
            revoked_by: None,
            entry,
        };
        let skill_ref = stored.entry.skill_ref.clone();
        state.entries.put(skill_ref.clone(), stored.clone());
        state.log.append(
            "REGISTERED",
            &skill_ref,
            json!({
                "entry_type": stored.entry.entry_type,
                "alg": stored.entry.alg.as_str(),
                "signed_by": stored.entry.signed_by,
                "content_hash": format!("{}...", &stored.entry.content_hash[..16]),
            }),
        );
        info!(
            skill_ref = skill_ref.as_str(),
            signed_by = stored.entry.signed_by.as_str(),
            "skill registered"
        );
        Ok(stored)
    }

    /// Revoke a skill. Only the original signer or the configured admin
    /// identity may revoke; once revoked, the reference never re-registers.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] or [`RegistryError::UnauthorizedRevoke`].
    pub fn revoke(&self, skill_ref: &str, signed_by: &str) -> Result<StoredEntry, RegistryError> {
        let mut state = self.lock();
        let Some(existing) = state.entries.get(skill_ref).cloned() else {
            return Err(RegistryError::NotFound {
                skill_ref: skill_ref.to_string(),
            });
        };

        let is_owner = existing.entry.signed_by == signed_by;
        let is_admin = self
            .admin_identity
            .as_deref()
            .is_some_and(|admin| admin == signed_by);
        if !is_owner && !is_admin {
            warn!(skill_ref, signed_by, "unauthorized revoke attempt");
            return Err(RegistryError::UnauthorizedRevoke {
                owner: existing.entry.signed_by.clone(),
            });
        }

        let mut revoked = existing;
        revoked.status = EntryStatus::Revoked;
        revoked.revoked_at = Some(Utc::now());
        revoked.revoked_by = Some(signed_by.to_string());
        state.entries.put(skill_ref.to_string(), revoked.clone());
        state.revoked.insert(skill_ref.to_string());
        state
            .log
            .append("REVOKED", skill_ref, json!({"revoked_by": signed_by}));
        info!(skill_ref, revoked_by = signed_by, "skill revoked");
        Ok(revoked)
    }

    /// Current entry for a skill, if any.
    #[must_use]
    pub fn get_entry(&self, skill_ref: &str) -> Option<StoredEntry> {
        self.lock().entries.get(skill_ref).cloned()
    }

    /// All entries with the given status.
    #[must_use]
    pub fn list_entries(&self, status: EntryStatus) -> Vec<StoredEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|(_, e)| e.status == status)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Paginated transparency log.
    #[must_use]
    pub fn transparency_log(&self, limit: usize, offset: usize) -> TransparencyPage {
        self.lock().log.page(limit, offset)
    }

    /// Verify transparency-chain continuity over the retained window.
    pub fn verify_transparency_chain(&self) -> bool {
        self.lock().log.verify().is_ok()
    }

    /// Verify the entry's trust chain.
    ///
    /// Self-signed anchors are always accepted (lowest trust); root
    /// authorities need a URI; intermediates need a URI and a proof; DIDs
    /// need a `did:` URI.
    ///
    /// # Errors
    ///
    /// [`RegistryError::TrustChainInvalid`] naming the missing piece.
    pub fn verify_trust_chain(
        &self,
        entry: &RegistryEntry,
    ) -> Result<TrustVerification, RegistryError> {
        let anchor = &entry.trust_anchor;
        let invalid = |reason: &str| RegistryError::TrustChainInvalid {
            reason: reason.to_string(),
        };

        match anchor.anchor_type {
            TrustAnchorType::SelfSigned => Ok(TrustVerification {
                trust_level: TrustAnchorType::SelfSigned,
                verified_by: "implicit".into(),
            }),
            TrustAnchorType::RootCa => {
                let uri = anchor
                    .uri
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| invalid("root_ca requires URI"))?;
                Ok(TrustVerification {
                    trust_level: TrustAnchorType::RootCa,
                    verified_by: uri.to_string(),
                })
            }
            TrustAnchorType::IntermediateCa => {
                let uri = anchor
                    .uri
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| invalid("intermediate_ca requires URI"))?;
                anchor
                    .proof
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| invalid("intermediate_ca requires proof"))?;
                Ok(TrustVerification {
                    trust_level: TrustAnchorType::IntermediateCa,
                    verified_by: uri.to_string(),
                })
            }
            TrustAnchorType::Did => {
                let uri = anchor
                    .uri
                    .as_deref()
                    .filter(|u| u.starts_with("did:"))
                    .ok_or_else(|| invalid("DID must start with 'did:'"))?;
                Ok(TrustVerification {
                    trust_level: TrustAnchorType::Did,
                    verified_by: uri.to_string(),
                })
            }
        }
    }

    /// Verify the entry's detached signature over its canonical form minus
    /// the `signature` field.
    ///
    /// Self-signed entries are accepted without a public key — explicitly
    /// the lowest trust level. Anchored entries need the anchor's PEM key.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidSignature`] on any failure.
    pub fn verify_signature(&self, entry: &RegistryEntry) -> Result<(), RegistryError> {
        if entry.trust_anchor.anchor_type == TrustAnchorType::SelfSigned {
            return Ok(());
        }

        let Some(pem) = entry.trust_anchor.public_key.as_deref() else {
            return Err(RegistryError::InvalidSignature {
                reason: "no_public_key_for_verification".into(),
            });
        };

        let payload = entry.signing_payload();
        let key = KeyMaterial::pem(pem);
        if osp_canon::verify(&payload, &entry.signature, &key, entry.alg) {
            Ok(())
        } else {
            Err(RegistryError::InvalidSignature {
                reason: "cryptographic_verification_failed".into(),
            })
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().expect("registry state lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TrustAnchor;
    use osp_canon::Algorithm;

    fn base_entry(skill_ref: &str) -> RegistryEntry {
        RegistryEntry {
            entry_type: EntryType::Register,
            skill_ref: skill_ref.into(),
            timestamp: 1_700_000_000,
            signed_by: "issuer-1".into(),
            content_hash: "ab".repeat(32),
            signature: "c2lnbmF0dXJl".into(),
            alg: Algorithm::Es256,
            trust_anchor: TrustAnchor::self_signed(),
        }
    }

    fn did_entry(skill_ref: &str, uri: &str) -> RegistryEntry {
        let pair = osp_canon::generate_key(Algorithm::EdDsa).unwrap();
        let public_pem = match pair.public.clone().unwrap() {
            KeyMaterial::Pem(pem) => pem,
            KeyMaterial::Secret(_) => unreachable!("EdDSA keys are PEM"),
        };
        let mut entry = RegistryEntry {
            alg: Algorithm::EdDsa,
            trust_anchor: TrustAnchor {
                anchor_type: TrustAnchorType::Did,
                uri: Some(uri.into()),
                proof: None,
                public_key: Some(public_pem),
            },
            ..base_entry(skill_ref)
        };
        entry.sign(&pair.private).unwrap();
        entry
    }

    #[test]
    fn self_signed_registration_is_accepted() {
        let registry = RegistryService::new(None);
        let stored = registry.register(base_entry("org.echo")).unwrap();
        assert_eq!(stored.status, EntryStatus::Active);
        assert!(registry.get_entry("org.echo").is_some());
    }

    #[test]
    fn did_anchor_with_valid_key_is_accepted() {
        let registry = RegistryService::new(None);
        let entry = did_entry("org.signed", "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK");
        registry.register(entry).unwrap();
    }

    #[test]
    fn did_anchor_with_https_uri_is_rejected() {
        let registry = RegistryService::new(None);
        let entry = did_entry("org.badly.anchored", "https://example.com");
        let err = registry.register(entry).unwrap_err();
        assert_eq!(err.code(), "trust_chain_invalid");
    }

    #[test]
    fn tampered_entry_fails_signature_verification() {
        let registry = RegistryService::new(None);
        let mut entry = did_entry("org.tampered", "did:key:z6Mkh");
        entry.content_hash = "ff".repeat(32);
        let err = registry.register(entry).unwrap_err();
        assert_eq!(err.code(), "invalid_signature");
        // The rejection is on the transparency log.
        let page = registry.transparency_log(10, 0);
        assert!(
            page.entries
                .iter()
                .any(|e| e.event_type == "REGISTER_REJECTED")
        );
    }

    #[test]
    fn anchored_entry_without_key_is_rejected() {
        let registry = RegistryService::new(None);
        let mut entry = base_entry("org.nokey");
        entry.trust_anchor = TrustAnchor {
            anchor_type: TrustAnchorType::RootCa,
            uri: Some("https://ca.example.com".into()),
            proof: None,
            public_key: None,
        };
        let err = registry.register(entry).unwrap_err();
        assert_eq!(err.code(), "invalid_signature");
    }

    #[test]
    fn revoked_skill_never_re_registers() {
        let registry = RegistryService::new(None);
        registry.register(base_entry("org.once")).unwrap();
        registry.revoke("org.once", "issuer-1").unwrap();

        let err = registry.register(base_entry("org.once")).unwrap_err();
        assert!(matches!(err, RegistryError::RevokedSkill { .. }));
        assert!(err.to_string().contains("revoked"));
    }

    #[test]
    fn only_owner_or_admin_revokes() {
        let registry = RegistryService::new(Some("root-admin".into()));
        registry.register(base_entry("org.owned")).unwrap();

        let err = registry.revoke("org.owned", "intruder").unwrap_err();
        assert_eq!(err.code(), "unauthorized_revoke");

        registry.revoke("org.owned", "root-admin").unwrap();
        assert_eq!(
            registry.get_entry("org.owned").unwrap().status,
            EntryStatus::Revoked
        );
    }

    #[test]
    fn revoke_of_unknown_skill_is_not_found() {
        let registry = RegistryService::new(None);
        let err = registry.revoke("org.ghost", "anyone").unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn revoke_entry_type_cannot_register() {
        let registry = RegistryService::new(None);
        let mut entry = base_entry("org.echo");
        entry.entry_type = EntryType::Revoke;
        let err = registry.register(entry).unwrap_err();
        assert_eq!(err.code(), "invalid_entry_type");
    }

    #[test]
    fn malformed_fields_are_rejected() {
        let registry = RegistryService::new(None);

        let mut entry = base_entry("org.echo");
        entry.skill_ref = ".starts.with.dot".into();
        assert_eq!(registry.register(entry).unwrap_err().code(), "invalid_skill_ref");

        let mut entry = base_entry("org.echo");
        entry.content_hash = "not-hex".into();
        assert_eq!(
            registry.register(entry).unwrap_err().code(),
            "invalid_content_hash"
        );

        let mut entry = base_entry("org.echo");
        entry.signature = String::new();
        assert_eq!(
            registry.register(entry).unwrap_err().code(),
            "missing_signature"
        );
    }

    #[test]
    fn versioned_skill_refs_are_valid() {
        let registry = RegistryService::new(None);
        registry.register(base_entry("org.tools.search@1.2.0")).unwrap();
        assert!(registry.get_entry("org.tools.search@1.2.0").is_some());
    }

    #[test]
    fn transparency_chain_stays_verifiable() {
        let registry = RegistryService::new(None);
        for i in 0..5 {
            registry.register(base_entry(&format!("org.s{i}"))).unwrap();
        }
        registry.revoke("org.s0", "issuer-1").unwrap();
        assert!(registry.verify_transparency_chain());
    }

    #[test]
    fn list_entries_filters_by_status() {
        let registry = RegistryService::new(None);
        registry.register(base_entry("org.a")).unwrap();
        registry.register(base_entry("org.b")).unwrap();
        registry.revoke("org.a", "issuer-1").unwrap();

        let active = registry.list_entries(EntryStatus::Active);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].entry.skill_ref, "org.b");
        assert_eq!(registry.list_entries(EntryStatus::Revoked).len(), 1);
    }
}
