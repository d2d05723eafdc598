// SPDX-License-Identifier: MIT OR Apache-2.0

//! Degradation levels and the process-wide controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use tracing::warn;

/// Global operating level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegradationLevel {
    /// Full functionality, all capabilities.
    #[serde(rename = "D0_NORMAL")]
    D0Normal,
    /// No LLM, deterministic routing only.
    #[serde(rename = "D1_REDUCED_INTELLIGENCE")]
    D1ReducedIntelligence,
    /// Strict lexical matching only.
    #[serde(rename = "D2_MINIMAL")]
    D2Minimal,
    /// Load shedding, service unavailable.
    #[serde(rename = "D3_CRITICAL")]
    D3Critical,
}

impl DegradationLevel {
    /// All levels in ascending severity.
    pub const ALL: [DegradationLevel; 4] = [
        Self::D0Normal,
        Self::D1ReducedIntelligence,
        Self::D2Minimal,
        Self::D3Critical,
    ];

    /// Numeric severity, 0..=3.
    #[must_use]
    pub fn value(&self) -> u8 {
        match self {
            Self::D0Normal => 0,
            Self::D1ReducedIntelligence => 1,
            Self::D2Minimal => 2,
            Self::D3Critical => 3,
        }
    }

    /// Stable name (e.g. `"D1_REDUCED_INTELLIGENCE"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::D0Normal => "D0_NORMAL",
            Self::D1ReducedIntelligence => "D1_REDUCED_INTELLIGENCE",
            Self::D2Minimal => "D2_MINIMAL",
            Self::D3Critical => "D3_CRITICAL",
        }
    }

    /// The deployment profile advertised by `osp.list_profiles`.
    #[must_use]
    pub fn profile(&self) -> LevelProfile {
        match self {
            Self::D0Normal => LevelProfile {
                description: "Full functionality, all capabilities",
                llm: true,
                semantic_routing: true,
            },
            Self::D1ReducedIntelligence => LevelProfile {
                description: "No LLM, deterministic routing only",
                llm: false,
                semantic_routing: true,
            },
            Self::D2Minimal => LevelProfile {
                description: "Strict lexical matching only",
                llm: false,
                semantic_routing: false,
            },
            Self::D3Critical => LevelProfile {
                description: "Load shedding, service unavailable",
                llm: false,
                semantic_routing: false,
            },
        }
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DegradationLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "D0" | "D0_NORMAL" => Ok(Self::D0Normal),
            "D1" | "D1_REDUCED_INTELLIGENCE" => Ok(Self::D1ReducedIntelligence),
            "D2" | "D2_MINIMAL" => Ok(Self::D2Minimal),
            "D3" | "D3_CRITICAL" => Ok(Self::D3Critical),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

/// The level string is not one of D0..D3.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown degradation level: {0}")]
pub struct UnknownLevel(pub String);

/// Capability profile of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProfile {
    /// Human-readable summary.
    pub description: &'static str,
    /// Whether LLM use is allowed.
    pub llm: bool,
    /// Whether semantic routing is allowed.
    pub semantic_routing: bool,
}

/// Process-wide degradation state.
///
/// Constructed once at startup and threaded into the components that
/// consult it; reads vastly outnumber writes, so the level sits behind a
/// reader-writer lock.
#[derive(Debug)]
pub struct DegradationController {
    level: RwLock<DegradationLevel>,
}

impl DegradationController {
    /// Controller starting at D0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: RwLock::new(DegradationLevel::D0Normal),
        }
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> DegradationLevel {
        *self.level.read().expect("degradation lock poisoned")
    }

    /// Switch levels; transitions are logged.
    pub fn set_level(&self, level: DegradationLevel) {
        let mut guard = self.level.write().expect("degradation lock poisoned");
        if *guard != level {
            warn!(from = %guard, to = %level, "degradation level switched");
            *guard = level;
        }
    }

    /// Whether new requests are admitted (false only at D3).
    #[must_use]
    pub fn check_request_allowed(&self) -> bool {
        self.level().value() < 3
    }

    /// Whether LLM-backed capabilities may run (D0 only).
    #[must_use]
    pub fn should_use_llm(&self) -> bool {
        self.level() == DegradationLevel::D0Normal
    }

    /// Whether routing must stay strictly lexical (D2 and above).
    #[must_use]
    pub fn is_strict_routing_only(&self) -> bool {
        self.level().value() >= 2
    }
}

impl Default for DegradationController {
    fn default() -> Self {
        Self::new()
    }
}
