// SPDX-License-Identifier: MIT OR Apache-2.0

//! The nine supported signature algorithms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature algorithm identifiers, named after their JOSE registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA over P-256 with SHA-256.
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA over P-384 with SHA-384.
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA over P-521 with SHA-512.
    #[serde(rename = "ES512")]
    Es512,
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    #[serde(rename = "RS512")]
    Rs512,
    /// Ed25519.
    #[serde(rename = "EdDSA")]
    EdDsa,
    /// HMAC with SHA-256 over a shared secret.
    #[serde(rename = "HS256")]
    Hs256,
    /// HMAC with SHA-512 over a shared secret.
    #[serde(rename = "HS512")]
    Hs512,
}

impl Algorithm {
    /// All supported algorithms, in registration order.
    pub const ALL: [Algorithm; 9] = [
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::EdDsa,
        Self::Hs256,
        Self::Hs512,
    ];

    /// Stable string form (e.g. `"ES256"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::EdDsa => "EdDSA",
            Self::Hs256 => "HS256",
            Self::Hs512 => "HS512",
        }
    }

    /// Whether this algorithm takes a raw shared secret rather than a PEM
    /// key pair.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs512)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "EdDSA" => Ok(Self::EdDsa),
            "HS256" => Ok(Self::Hs256),
            "HS512" => Ok(Self::Hs512),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

/// The algorithm string is not one of the nine supported identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signature algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_str() {
        for alg in Algorithm::ALL {
            assert_eq!(alg.as_str().parse::<Algorithm>().unwrap(), alg);
        }
    }

    #[test]
    fn serde_uses_jose_names() {
        assert_eq!(serde_json::to_string(&Algorithm::EdDsa).unwrap(), "\"EdDSA\"");
        assert_eq!(serde_json::to_string(&Algorithm::Es512).unwrap(), "\"ES512\"");
        let back: Algorithm = serde_json::from_str("\"HS512\"").unwrap();
        assert_eq!(back, Algorithm::Hs512);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("PS256".parse::<Algorithm>().is_err());
        assert!("es256".parse::<Algorithm>().is_err());
    }

    #[test]
    fn symmetric_classification() {
        assert!(Algorithm::Hs256.is_symmetric());
        assert!(Algorithm::Hs512.is_symmetric());
        assert!(!Algorithm::Es256.is_symmetric());
        assert!(!Algorithm::EdDsa.is_symmetric());
    }
}
