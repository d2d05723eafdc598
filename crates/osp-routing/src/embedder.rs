// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic vector backend for the rerank stage.

use crate::bm25::tokenize;

/// The embedder failed to produce vectors.
#[derive(Debug, Clone, thiserror::Error)]
#[error("embedder failure: {0}")]
pub struct EmbedderError(pub String);

/// Batch encoder producing unit-norm fixed-length vectors.
///
/// The rerank stage issues one batch call per request
/// (`[query, doc_1, …, doc_k]`); cosine similarity then reduces to a dot
/// product. Implementations wrapping remote models should document their
/// determinism envelope — the routing determinism contract only holds when
/// the backend is deterministic.
pub trait Embedder: Send + Sync {
    /// Encode all texts in one call. Every returned vector must have the
    /// same length and unit L2 norm (or be all-zero for empty input).
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Backend identifier for trace context.
    fn id(&self) -> &'static str {
        "embedder"
    }
}

/// Deterministic token feature-hashing embedder.
///
/// Hashes each token (FNV-1a) into a fixed-dimension bag, then L2
/// normalizes. No model weights, no I/O, byte-identical output across
/// calls and platforms — the default backend, and the one the determinism
/// contract is stated against.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    /// Embedder with the given dimensionality.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashingEmbedder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }

    fn id(&self) -> &'static str {
        "hashing-embedder"
    }
}

impl HashingEmbedder {
    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in tokenize(text) {
            let idx = (fnv1a(token.as_bytes()) as usize) % self.dims;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

/// FNV-1a, 64-bit. Stable across platforms, unlike the std hasher.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn vectors_are_unit_norm() {
        let embedder = HashingEmbedder::default();
        let vectors = embedder
            .encode_batch(&["weather forecast".into(), "math operations".into()])
            .unwrap();
        for v in vectors {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::default();
        let vectors = embedder.encode_batch(&["".into()]).unwrap();
        assert!(vectors[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn overlapping_texts_are_more_similar_than_disjoint() {
        let embedder = HashingEmbedder::default();
        let vectors = embedder
            .encode_batch(&[
                "what is the weather forecast".into(),
                "Weather forecast rain sun temperature".into(),
                "math operations add subtract".into(),
            ])
            .unwrap();
        let sim_weather = dot(&vectors[0], &vectors[1]);
        let sim_math = dot(&vectors[0], &vectors[2]);
        assert!(sim_weather > sim_math);
    }

    #[test]
    fn encoding_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.encode_batch(&["stable output".into()]).unwrap();
        let b = embedder.encode_batch(&["stable output".into()]).unwrap();
        assert_eq!(a, b);
    }
}
