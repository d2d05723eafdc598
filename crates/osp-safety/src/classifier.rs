// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic safety classification backends.

use crate::vocab::{CATEGORIES, SafetyCategory};
use osp_core::{ReasonCode, RiskLevel};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Score below which a query is considered clean.
pub(crate) const SUSPICIOUS_THRESHOLD: f64 = 0.15;
/// Score at which a query is blocked.
pub(crate) const BLOCK_THRESHOLD: f64 = 0.25;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("token pattern is valid"));

/// Compact English stop-word list applied before n-gram extraction.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "for", "from", "had",
    "has", "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "me", "my",
    "no", "not", "of", "on", "or", "our", "she", "so", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "to", "was", "we", "were", "what", "when", "which", "who",
    "will", "with", "would", "you", "your",
];

/// Outcome of classifying a query against the category set.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Winning category name.
    pub category: &'static str,
    /// Cosine (or pseudo) similarity, rounded to four decimals.
    pub risk_score: f64,
    /// Risk level of the winning category.
    pub risk_level: RiskLevel,
    /// Reason code of the winning category.
    pub reason_code: ReasonCode,
    /// Human message of the winning category.
    pub message: &'static str,
    /// Whether the score crossed the block threshold.
    pub blocked: bool,
}

/// The classifier backend failed; the caller must fail closed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("classifier failure: {0}")]
pub struct ClassifierError(pub String);

/// A semantic classification backend.
///
/// `Ok(None)` means the query scored below the suspicion threshold.
pub trait Classifier: Send + Sync {
    /// Classify a query against the safety categories.
    fn classify(&self, query: &str) -> Result<Option<Classification>, ClassifierError>;
}

// ---------------------------------------------------------------------------
// TF-IDF backend
// ---------------------------------------------------------------------------

/// TF-IDF vectorization over unigrams and bigrams, cosine similarity
/// against each category's vectorized vocabulary.
pub struct TfIdfClassifier {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    category_vectors: Vec<Vec<f64>>,
}

impl TfIdfClassifier {
    /// Build the category vectors from the bootstrap vocabulary.
    #[must_use]
    pub fn new() -> Self {
        let docs: Vec<String> = CATEGORIES
            .iter()
            .map(|c| c.keywords.join(" "))
            .collect();

        // Vocabulary over all category documents.
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| ngrams(d)).collect();
        for terms in &tokenized {
            for term in terms {
                let next = vocabulary.len();
                vocabulary.entry(term.clone()).or_insert(next);
            }
        }

        // Smoothed IDF: ln((1 + n) / (1 + df)) + 1.
        let n = docs.len() as f64;
        let mut df = vec![0usize; vocabulary.len()];
        for terms in &tokenized {
            let mut seen = vec![false; vocabulary.len()];
            for term in terms {
                let idx = vocabulary[term];
                if !seen[idx] {
                    seen[idx] = true;
                    df[idx] += 1;
                }
            }
        }
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let category_vectors = tokenized
            .iter()
            .map(|terms| vectorize(terms, &vocabulary, &idf))
            .collect();

        Self {
            vocabulary,
            idf,
            category_vectors,
        }
    }

    fn query_vector(&self, query: &str) -> Vec<f64> {
        vectorize(&ngrams(&query.to_lowercase()), &self.vocabulary, &self.idf)
    }
}

impl Default for TfIdfClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for TfIdfClassifier {
    fn classify(&self, query: &str) -> Result<Option<Classification>, ClassifierError> {
        let qv = self.query_vector(query);

        let mut best: Option<(usize, f64)> = None;
        for (idx, cv) in self.category_vectors.iter().enumerate() {
            let sim = dot(&qv, cv);
            if best.is_none_or(|(_, s)| sim > s) {
                best = Some((idx, sim));
            }
        }

        let Some((idx, score)) = best else {
            return Ok(None);
        };
        if score < SUSPICIOUS_THRESHOLD {
            return Ok(None);
        }
        Ok(Some(classification(&CATEGORIES[idx], round4(score))))
    }
}

/// Lowercased word tokens minus stop words, plus adjacent bigrams.
fn ngrams(text: &str) -> Vec<String> {
    let tokens: Vec<String> = TOKEN_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect();

    let mut terms = tokens.clone();
    for pair in tokens.windows(2) {
        terms.push(format!("{} {}", pair[0], pair[1]));
    }
    terms
}

/// L2-normalized TF-IDF vector over the fixed vocabulary.
fn vectorize(terms: &[String], vocabulary: &HashMap<String, usize>, idf: &[f64]) -> Vec<f64> {
    let mut v = vec![0.0; idf.len()];
    for term in terms {
        if let Some(&idx) = vocabulary.get(term) {
            v[idx] += 1.0;
        }
    }
    for (x, w) in v.iter_mut().zip(idf) {
        *x *= w;
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// ---------------------------------------------------------------------------
// Keyword fallback backend
// ---------------------------------------------------------------------------

/// Keyword-containment heuristic used when the vector backend is
/// unavailable: `(hits / |vocab|)` scaled ×3 and capped at 0.99, blocking
/// on any hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn classify(&self, query: &str) -> Result<Option<Classification>, ClassifierError> {
        let query_lower = query.to_lowercase();
        let mut best: Option<(usize, usize)> = None;

        for (idx, category) in CATEGORIES.iter().enumerate() {
            let hits = category
                .keywords
                .iter()
                .filter(|kw| query_lower.contains(&kw.to_lowercase()))
                .count();
            if hits > 0 && best.is_none_or(|(_, h)| hits > h) {
                best = Some((idx, hits));
            }
        }

        Ok(best.map(|(idx, hits)| {
            let category = &CATEGORIES[idx];
            let score = hits as f64 / category.keywords.len() as f64;
            let mut c = classification(category, round4((score * 3.0).min(0.99)));
            c.blocked = hits >= 1;
            c
        }))
    }
}

fn classification(category: &SafetyCategory, risk_score: f64) -> Classification {
    Classification {
        category: category.name,
        risk_score,
        risk_level: category.risk_level,
        reason_code: category.reason_code,
        message: category.message,
        blocked: risk_score >= BLOCK_THRESHOLD,
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
