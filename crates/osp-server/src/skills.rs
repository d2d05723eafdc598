// SPDX-License-Identifier: MIT OR Apache-2.0

//! The skill catalog and the built-in demonstration skills.
//!
//! Real deployments register their own [`Skill`] implementations (email,
//! chat, drive, … — opaque to the core); the built-ins exist so a fresh
//! server has something executable.

use async_trait::async_trait;
use osp_core::{RiskLevel, SkillManifest};
use osp_delivery::{Skill, SkillError};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A manifest together with its executable implementation.
#[derive(Clone)]
pub struct RegisteredSkill {
    /// Published metadata.
    pub manifest: SkillManifest,
    /// The implementation behind the ABI.
    pub skill: Arc<dyn Skill>,
}

/// Registered skills, keyed by skill id.
#[derive(Default)]
pub struct SkillCatalog {
    inner: RwLock<BTreeMap<String, RegisteredSkill>>,
}

impl SkillCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a skill.
    pub fn register(&self, manifest: SkillManifest, skill: Arc<dyn Skill>) {
        self.inner
            .write()
            .expect("skill catalog lock poisoned")
            .insert(manifest.skill_id.clone(), RegisteredSkill { manifest, skill });
    }

    /// Implementation for a skill id.
    #[must_use]
    pub fn get(&self, skill_id: &str) -> Option<Arc<dyn Skill>> {
        self.inner
            .read()
            .expect("skill catalog lock poisoned")
            .get(skill_id)
            .map(|r| Arc::clone(&r.skill))
    }

    /// Manifest for a skill id.
    #[must_use]
    pub fn manifest(&self, skill_id: &str) -> Option<SkillManifest> {
        self.inner
            .read()
            .expect("skill catalog lock poisoned")
            .get(skill_id)
            .map(|r| r.manifest.clone())
    }

    /// All manifests, in skill-id order.
    #[must_use]
    pub fn manifests(&self) -> Vec<SkillManifest> {
        self.inner
            .read()
            .expect("skill catalog lock poisoned")
            .values()
            .map(|r| r.manifest.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Built-in skills
// ---------------------------------------------------------------------------

/// Adds `x` and `y` from the arguments object.
pub struct CalculatorSkill;

#[async_trait]
impl Skill for CalculatorSkill {
    async fn execute(&self, arguments: Value) -> Result<Value, SkillError> {
        let x = arguments
            .get("x")
            .and_then(Value::as_f64)
            .ok_or_else(|| SkillError("missing numeric argument 'x'".into()))?;
        let y = arguments
            .get("y")
            .and_then(Value::as_f64)
            .ok_or_else(|| SkillError("missing numeric argument 'y'".into()))?;
        let sum = x + y;
        // Integer inputs get an integer answer.
        if sum.fract() == 0.0 {
            Ok(json!({"answer": sum as i64}))
        } else {
            Ok(json!({"answer": sum}))
        }
    }
}

/// Returns its arguments verbatim.
pub struct EchoSkill;

#[async_trait]
impl Skill for EchoSkill {
    async fn execute(&self, arguments: Value) -> Result<Value, SkillError> {
        Ok(json!({"echo": arguments}))
    }
}

/// Register the built-in skills into a catalog.
pub fn register_builtin_skills(catalog: &SkillCatalog) {
    catalog.register(
        SkillManifest {
            skill_id: "org.calc".into(),
            name: "Calculator".into(),
            version: "1.0.0".into(),
            description: "math operations add subtract".into(),
            activation_keywords: vec!["calculate".into(), "math".into(), "add".into()],
            risk_level: RiskLevel::Low,
        },
        Arc::new(CalculatorSkill),
    );
    catalog.register(
        SkillManifest {
            skill_id: "org.echo".into(),
            name: "Echo".into(),
            version: "1.0.0".into(),
            description: "echo repeat text back".into(),
            activation_keywords: vec!["echo".into(), "repeat".into()],
            risk_level: RiskLevel::Low,
        },
        Arc::new(EchoSkill),
    );
}
