// SPDX-License-Identifier: MIT OR Apache-2.0

//! Okapi BM25 lexical scoring.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("token pattern is valid"));

/// Lowercased word tokens.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Okapi BM25 scorer with a request-corpus IDF table.
///
/// The scorer is request-scoped: [`Bm25Scorer::build_idf`] is rebuilt from
/// the candidate pool of each routing call, so nothing leaks between
/// requests.
#[derive(Debug, Clone)]
pub struct Bm25Scorer {
    k1: f64,
    b: f64,
    doc_count: usize,
    doc_freq: HashMap<String, usize>,
}

impl Bm25Scorer {
    /// Standard parameters: k1 = 1.5, b = 0.75.
    #[must_use]
    pub fn new() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            doc_count: 0,
            doc_freq: HashMap::new(),
        }
    }

    /// Build the IDF table from a corpus of documents.
    pub fn build_idf(&mut self, documents: &[String]) {
        self.doc_count = documents.len();
        self.doc_freq.clear();
        for doc in documents {
            let mut unique: Vec<String> = tokenize(doc);
            unique.sort_unstable();
            unique.dedup();
            for term in unique {
                *self.doc_freq.entry(term).or_insert(0) += 1;
            }
        }
    }

    /// IDF of a term; 1.0 when no corpus was built or the term is unseen.
    fn idf(&self, term: &str) -> f64 {
        if self.doc_count == 0 {
            return 1.0;
        }
        let df = self.doc_freq.get(term).copied().unwrap_or(0);
        if df == 0 {
            return 1.0;
        }
        let n = self.doc_count as f64;
        ((n - df as f64 + 0.5) / (df as f64 + 0.5) + 1.0).ln()
    }

    /// Score `document` against `query`.
    ///
    /// Uses the single-document-length approximation: the average document
    /// length is taken to be this document's own length.
    #[must_use]
    pub fn score(&self, query: &str, document: &str) -> f64 {
        let query_terms = tokenize(query);
        let doc_terms = tokenize(document);
        if doc_terms.is_empty() {
            return 0.0;
        }

        let doc_len = doc_terms.len() as f64;
        let avg_doc_len = doc_len.max(1.0);

        let mut doc_tf: HashMap<&str, f64> = HashMap::new();
        for term in &doc_terms {
            *doc_tf.entry(term.as_str()).or_insert(0.0) += 1.0;
        }

        let mut score = 0.0;
        for term in &query_terms {
            let Some(&tf) = doc_tf.get(term.as_str()) else {
                continue;
            };
            let idf = self.idf(term);
            let numerator = tf * (self.k1 + 1.0);
            let denominator =
                tf + self.k1 * (1.0 - self.b + self.b * (doc_len / avg_doc_len));
            score += idf * (numerator / denominator);
        }
        score
    }
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_terms_score_positive() {
        let scorer = Bm25Scorer::new();
        let score = scorer.score("weather forecast", "Weather forecast rain sun temperature");
        assert!(score > 0.0);
    }

    #[test]
    fn disjoint_terms_score_zero() {
        let scorer = Bm25Scorer::new();
        assert_eq!(scorer.score("weather", "math operations add subtract"), 0.0);
    }

    #[test]
    fn empty_document_scores_zero() {
        let scorer = Bm25Scorer::new();
        assert_eq!(scorer.score("anything", ""), 0.0);
    }

    #[test]
    fn corpus_idf_downweights_common_terms() {
        let mut scorer = Bm25Scorer::new();
        let docs = vec![
            "skill weather forecast".to_string(),
            "skill calculator math".to_string(),
            "skill email inbox".to_string(),
        ];
        scorer.build_idf(&docs);
        // "skill" appears in every document, "weather" in one.
        let common = scorer.score("skill", &docs[0]);
        let rare = scorer.score("weather", &docs[0]);
        assert!(rare > common);
    }

    #[test]
    fn scoring_is_deterministic() {
        let mut scorer = Bm25Scorer::new();
        let docs = vec!["alpha beta gamma".to_string(), "beta delta".to_string()];
        scorer.build_idf(&docs);
        let a = scorer.score("beta gamma", &docs[0]);
        let b = scorer.score("beta gamma", &docs[0]);
        assert_eq!(a, b);
    }

    #[test]
    fn tokenizer_lowercases_and_splits_on_non_word() {
        assert_eq!(tokenize("Hello, World-2!"), vec!["hello", "world", "2"]);
    }
}
