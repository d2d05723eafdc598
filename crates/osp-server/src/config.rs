// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server runtime configuration.

use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Request-signature enforcement mode.
///
/// Strict is the default: unsigned or badly signed requests are rejected
/// with 401. Soft mode logs and admits — it exists for test and migration
/// deployments only and must be enabled explicitly. Disabled skips the
/// plane entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMode {
    /// No verification at all.
    Disabled,
    /// Verify and log failures, but admit. Test-only.
    Soft,
    /// Reject missing or invalid signatures with 401.
    Strict,
}

impl FromStr for SignatureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" => Ok(Self::Disabled),
            "soft" => Ok(Self::Soft),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown signature mode: {other}")),
        }
    }
}

/// Runtime settings for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Signature enforcement mode.
    pub signature_mode: SignatureMode,
    /// Admin key gating the admin endpoints; `None` rejects all admin
    /// requests.
    pub admin_key: Option<String>,
    /// Requests allowed per client IP within the window.
    pub rate_limit_max: u32,
    /// Sliding-window length for rate limiting.
    pub rate_limit_window: Duration,
    /// Degradation monitor sampling interval.
    pub monitor_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            signature_mode: SignatureMode::Strict,
            admin_key: None,
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(60),
            monitor_interval: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_strict() {
        assert_eq!(ServerConfig::default().signature_mode, SignatureMode::Strict);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("STRICT".parse::<SignatureMode>().unwrap(), SignatureMode::Strict);
        assert_eq!("soft".parse::<SignatureMode>().unwrap(), SignatureMode::Soft);
        assert!("permissive".parse::<SignatureMode>().is_err());
    }
}
