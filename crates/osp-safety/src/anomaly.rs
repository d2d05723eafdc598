// SPDX-License-Identifier: MIT OR Apache-2.0

//! KL-divergence anomaly brake over bounded score histories.

use std::collections::VecDeque;

/// Retained history per signal.
const HISTORY_CAPACITY: usize = 100;
/// Samples required before divergence is computed.
const MIN_SAMPLES: usize = 10;
/// Window compared on each check.
const WINDOW: usize = 10;
/// Smoothing floor applied to both distributions.
const EPSILON: f64 = 1e-10;
/// Divergence above this value is anomalous.
pub(crate) const ANOMALY_THRESHOLD: f64 = 0.5;

/// Compute D_KL(P ‖ Q) with ε-smoothing.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .map(|(&pi, &qi)| {
            let pi = pi.max(EPSILON);
            let qi = qi.max(EPSILON);
            pi * (pi / qi).ln()
        })
        .sum()
}

/// Outcome of feeding one sample pair into the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnomalySignal {
    /// Not enough history, or the distributions agree.
    Quiet,
    /// Divergence crossed the threshold.
    Diverged {
        /// The computed KL divergence.
        kl: f64,
        /// Confidence in [0, 0.99], derived from the divergence.
        confidence: f64,
    },
}

/// Tracks lexical and semantic score histories and flags divergence.
#[derive(Debug, Default)]
pub struct AnomalyDetector {
    lexical: VecDeque<f64>,
    semantic: VecDeque<f64>,
}

impl AnomalyDetector {
    /// Create an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample pair and check for divergence.
    pub fn observe(&mut self, lexical_score: f64, semantic_score: f64) -> AnomalySignal {
        push_bounded(&mut self.lexical, lexical_score);
        push_bounded(&mut self.semantic, semantic_score);

        if self.lexical.len() < MIN_SAMPLES {
            return AnomalySignal::Quiet;
        }

        let p = normalized_tail(&self.lexical);
        let q = normalized_tail(&self.semantic);
        let kl = kl_divergence(&p, &q);

        if kl > ANOMALY_THRESHOLD {
            let confidence = ((kl / 2.0).min(0.99) * 100.0).round() / 100.0;
            AnomalySignal::Diverged { kl, confidence }
        } else {
            AnomalySignal::Quiet
        }
    }

    /// Number of samples currently retained.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.lexical.len()
    }
}

fn push_bounded(buf: &mut VecDeque<f64>, value: f64) {
    if buf.len() == HISTORY_CAPACITY {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// The last [`WINDOW`] values normalized into a discrete distribution.
fn normalized_tail(buf: &VecDeque<f64>) -> Vec<f64> {
    let tail: Vec<f64> = buf.iter().rev().take(WINDOW).rev().copied().collect();
    let sum: f64 = tail.iter().sum::<f64>() + EPSILON;
    tail.iter().map(|x| x / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_distributions_have_zero_divergence() {
        let p = [0.25, 0.25, 0.25, 0.25];
        assert!(kl_divergence(&p, &p).abs() < 1e-12);
    }

    #[test]
    fn degenerate_versus_uniform_exceeds_threshold() {
        // Nearly all mass on one outcome against a uniform reference.
        let p = [0.91, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01];
        let q = [0.1; 10];
        assert!(kl_divergence(&p, &q) > ANOMALY_THRESHOLD);
    }

    #[test]
    fn divergence_handles_zeros_via_smoothing() {
        let p = [1.0, 0.0];
        let q = [0.0, 1.0];
        let kl = kl_divergence(&p, &q);
        assert!(kl.is_finite());
        assert!(kl > 0.0);
    }

    #[test]
    fn quiet_below_minimum_samples() {
        let mut detector = AnomalyDetector::new();
        for _ in 0..9 {
            assert_eq!(detector.observe(0.0, 0.9), AnomalySignal::Quiet);
        }
        assert_eq!(detector.samples(), 9);
    }

    #[test]
    fn diverging_histories_flag_after_warmup() {
        let mut detector = AnomalyDetector::new();
        // Lexical mass concentrated on one spike; semantic spread uniformly.
        for i in 0..10 {
            let lexical = if i == 9 { 1.0 } else { 0.0 };
            let signal = detector.observe(lexical, 0.5);
            if i < 9 {
                assert_eq!(signal, AnomalySignal::Quiet);
            } else {
                match signal {
                    AnomalySignal::Diverged { kl, confidence } => {
                        assert!(kl > ANOMALY_THRESHOLD);
                        assert!(confidence <= 0.99);
                    }
                    AnomalySignal::Quiet => panic!("expected divergence"),
                }
            }
        }
    }

    #[test]
    fn history_is_bounded() {
        let mut detector = AnomalyDetector::new();
        for _ in 0..500 {
            detector.observe(0.0, 0.1);
        }
        assert_eq!(detector.samples(), HISTORY_CAPACITY);
    }
}
