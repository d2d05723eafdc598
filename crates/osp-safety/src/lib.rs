// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Multi-layer query safety pipeline."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Three layers run in order; the first to decide "block" wins:
//!
//! 1. Regex prefilters for SQL and shell injection patterns.
//! 2. A TF-IDF semantic classifier over six risk categories, with a
//!    keyword-heuristic fallback when the vector backend is unavailable.
//! 3. A KL-divergence anomaly brake over bounded score histories.
//!
//! The entry point is [`SafetyEngine::check`], which returns a
//! [`SafetyVerdict`] — an explicit sum type instead of exception control
//! flow. Callers fold [`SafetyVerdict::ClassifierError`] into a
//! `SAFETY_CLASSIFIER_UNAVAILABLE` refusal (fail closed).

mod anomaly;
mod classifier;
mod engine;
mod prefilter;
mod vocab;

pub use anomaly::{AnomalyDetector, AnomalySignal, kl_divergence};
pub use classifier::{Classification, Classifier, ClassifierError, KeywordClassifier, TfIdfClassifier};
pub use engine::{SafetyEngine, SafetyVerdict};
pub use vocab::{CATEGORIES, SafetyCategory};
