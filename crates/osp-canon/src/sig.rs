// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detached signatures over canonical JSON bytes.

use crate::{Algorithm, KeyMaterial, canonicalize};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use pkcs8::{DecodePrivateKey, DecodePublicKey};
use serde_json::Value;
use sha2::{Sha256, Sha384, Sha512};
use signature::{Signer, Verifier};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Errors from signing. Verification never errors; it returns `false`.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The key material could not be parsed for the requested algorithm.
    #[error("key rejected for {alg}: {reason}")]
    KeyRejected {
        /// Algorithm the key was offered to.
        alg: Algorithm,
        /// Parse or type-mismatch detail.
        reason: String,
    },

    /// The signing primitive itself failed.
    #[error("signing failed for {alg}: {reason}")]
    SigningFailed {
        /// Algorithm in use.
        alg: Algorithm,
        /// Failure detail.
        reason: String,
    },

    /// Key generation or encoding failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
}

fn key_rejected(alg: Algorithm, reason: impl ToString) -> SignError {
    SignError::KeyRejected {
        alg,
        reason: reason.to_string(),
    }
}

/// Sign the canonical bytes of `value`, returning a base64 detached
/// signature.
///
/// HMAC algorithms require [`KeyMaterial::Secret`]; the asymmetric
/// algorithms require a PKCS#8 PEM private key. ECDSA signatures are DER
/// encoded before base64.
///
/// # Errors
///
/// [`SignError::KeyRejected`] when the key does not match the algorithm,
/// [`SignError::SigningFailed`] when the primitive fails.
pub fn sign(value: &Value, key: &KeyMaterial, alg: Algorithm) -> Result<String, SignError> {
    let msg = canonicalize(value);
    let raw = sign_bytes(&msg, key, alg)?;
    Ok(BASE64.encode(raw))
}

fn sign_bytes(msg: &[u8], key: &KeyMaterial, alg: Algorithm) -> Result<Vec<u8>, SignError> {
    match alg {
        Algorithm::Hs256 => {
            let secret = key
                .as_secret()
                .ok_or_else(|| key_rejected(alg, "HMAC requires a raw secret"))?;
            let mut mac = HmacSha256::new_from_slice(secret)
                .map_err(|e| key_rejected(alg, e))?;
            mac.update(msg);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        Algorithm::Hs512 => {
            let secret = key
                .as_secret()
                .ok_or_else(|| key_rejected(alg, "HMAC requires a raw secret"))?;
            let mut mac = HmacSha512::new_from_slice(secret)
                .map_err(|e| key_rejected(alg, e))?;
            mac.update(msg);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        Algorithm::Es256 => {
            let pem = require_pem(key, alg)?;
            let sk = p256::ecdsa::SigningKey::from_pkcs8_pem(pem)
                .map_err(|e| key_rejected(alg, e))?;
            let sig: p256::ecdsa::Signature = sk.sign(msg);
            Ok(sig.to_der().as_bytes().to_vec())
        }
        Algorithm::Es384 => {
            let pem = require_pem(key, alg)?;
            let sk = p384::ecdsa::SigningKey::from_pkcs8_pem(pem)
                .map_err(|e| key_rejected(alg, e))?;
            let sig: p384::ecdsa::Signature = sk.sign(msg);
            Ok(sig.to_der().as_bytes().to_vec())
        }
        Algorithm::Es512 => {
            let pem = require_pem(key, alg)?;
            // p521::ecdsa::SigningKey does not implement DecodePrivateKey (see
            // keys.rs for the matching encode-side workaround); decode via the
            // underlying generic ecdsa type, which does, then convert.
            let inner = ecdsa::SigningKey::<p521::NistP521>::from_pkcs8_pem(pem)
                .map_err(|e| key_rejected(alg, e))?;
            let sk: p521::ecdsa::SigningKey = inner.into();
            let sig: p521::ecdsa::Signature = sk.sign(msg);
            Ok(sig.to_der().as_bytes().to_vec())
        }
        Algorithm::Rs256 => rsa_sign::<Sha256>(msg, key, alg),
        Algorithm::Rs384 => rsa_sign::<Sha384>(msg, key, alg),
        Algorithm::Rs512 => rsa_sign::<Sha512>(msg, key, alg),
        Algorithm::EdDsa => {
            let pem = require_pem(key, alg)?;
            let sk = ed25519_dalek::SigningKey::from_pkcs8_pem(pem)
                .map_err(|e| key_rejected(alg, e))?;
            let sig: ed25519_dalek::Signature = sk.sign(msg);
            Ok(sig.to_bytes().to_vec())
        }
    }
}

fn rsa_sign<D>(msg: &[u8], key: &KeyMaterial, alg: Algorithm) -> Result<Vec<u8>, SignError>
where
    D: digest_for_rsa::RsaDigest,
{
    let pem = require_pem(key, alg)?;
    let sk = rsa::RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| key_rejected(alg, e))?;
    D::sign(sk, msg).map_err(|reason| SignError::SigningFailed { alg, reason })
}

fn require_pem<'k>(key: &'k KeyMaterial, alg: Algorithm) -> Result<&'k str, SignError> {
    key.as_pem()
        .ok_or_else(|| key_rejected(alg, "algorithm requires a PEM key"))
}

/// Verify a base64 detached signature over the canonical bytes of `value`.
///
/// Returns `false` — never an error — on malformed base64, wrong key type,
/// wrong algorithm, or cryptographic mismatch.
#[must_use]
pub fn verify(value: &Value, signature_b64: &str, key: &KeyMaterial, alg: Algorithm) -> bool {
    let Ok(sig) = BASE64.decode(signature_b64) else {
        return false;
    };
    let msg = canonicalize(value);
    verify_bytes(&msg, &sig, key, alg)
}

fn verify_bytes(msg: &[u8], sig: &[u8], key: &KeyMaterial, alg: Algorithm) -> bool {
    match alg {
        Algorithm::Hs256 => {
            let Some(secret) = key.as_secret() else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
                return false;
            };
            mac.update(msg);
            mac.verify_slice(sig).is_ok()
        }
        Algorithm::Hs512 => {
            let Some(secret) = key.as_secret() else {
                return false;
            };
            let Ok(mut mac) = HmacSha512::new_from_slice(secret) else {
                return false;
            };
            mac.update(msg);
            mac.verify_slice(sig).is_ok()
        }
        Algorithm::Es256 => {
            let Some(pem) = key.as_pem() else { return false };
            let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_pem(pem) else {
                return false;
            };
            let Ok(parsed) = p256::ecdsa::Signature::from_der(sig)
                .or_else(|_| p256::ecdsa::Signature::from_slice(sig))
            else {
                return false;
            };
            vk.verify(msg, &parsed).is_ok()
        }
        Algorithm::Es384 => {
            let Some(pem) = key.as_pem() else { return false };
            let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_pem(pem) else {
                return false;
            };
            let Ok(parsed) = p384::ecdsa::Signature::from_der(sig)
                .or_else(|_| p384::ecdsa::Signature::from_slice(sig))
            else {
                return false;
            };
            vk.verify(msg, &parsed).is_ok()
        }
        Algorithm::Es512 => {
            let Some(pem) = key.as_pem() else { return false };
            // See the sign_bytes Es512 arm: decode via the generic ecdsa type
            // since p521::ecdsa::VerifyingKey does not implement DecodePublicKey.
            let Ok(inner) = ecdsa::VerifyingKey::<p521::NistP521>::from_public_key_pem(pem) else {
                return false;
            };
            let vk: p521::ecdsa::VerifyingKey = inner.into();
            let Ok(parsed) = p521::ecdsa::Signature::from_der(sig)
                .or_else(|_| p521::ecdsa::Signature::from_slice(sig))
            else {
                return false;
            };
            vk.verify(msg, &parsed).is_ok()
        }
        Algorithm::Rs256 => rsa_verify::<Sha256>(msg, sig, key),
        Algorithm::Rs384 => rsa_verify::<Sha384>(msg, sig, key),
        Algorithm::Rs512 => rsa_verify::<Sha512>(msg, sig, key),
        Algorithm::EdDsa => {
            let Some(pem) = key.as_pem() else { return false };
            let Ok(vk) = ed25519_dalek::VerifyingKey::from_public_key_pem(pem) else {
                return false;
            };
            let Ok(parsed) = ed25519_dalek::Signature::from_slice(sig) else {
                return false;
            };
            vk.verify(msg, &parsed).is_ok()
        }
    }
}

fn rsa_verify<D>(msg: &[u8], sig: &[u8], key: &KeyMaterial) -> bool
where
    D: digest_for_rsa::RsaDigest,
{
    let Some(pem) = key.as_pem() else { return false };
    let Ok(pk) = rsa::RsaPublicKey::from_public_key_pem(pem) else {
        return false;
    };
    D::verify(pk, msg, sig)
}

/// Monomorphization helper binding each SHA variant to the RSA PKCS#1 v1.5
/// signing and verifying key types.
mod digest_for_rsa {
    use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use sha2::{Sha256, Sha384, Sha512};
    use signature::{SignatureEncoding, Signer, Verifier};

    pub trait RsaDigest {
        fn sign(key: RsaPrivateKey, msg: &[u8]) -> Result<Vec<u8>, String>;
        fn verify(key: RsaPublicKey, msg: &[u8], sig: &[u8]) -> bool;
    }

    macro_rules! impl_rsa_digest {
        ($sha:ty) => {
            impl RsaDigest for $sha {
                fn sign(key: RsaPrivateKey, msg: &[u8]) -> Result<Vec<u8>, String> {
                    let signer = SigningKey::<$sha>::new(key);
                    let sig = signer
                        .try_sign(msg)
                        .map_err(|e| e.to_string())?;
                    Ok(sig.to_vec())
                }

                fn verify(key: RsaPublicKey, msg: &[u8], sig: &[u8]) -> bool {
                    let verifier = VerifyingKey::<$sha>::new(key);
                    let Ok(parsed) = Signature::try_from(sig) else {
                        return false;
                    };
                    verifier.verify(msg, &parsed).is_ok()
                }
            }
        };
    }

    impl_rsa_digest!(Sha256);
    impl_rsa_digest!(Sha384);
    impl_rsa_digest!(Sha512);
}
