// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus instruments for the RPC plane.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// The four protocol instruments, backed by one registry.
pub struct Metrics {
    registry: Registry,
    /// `osp_requests_total{method,status}`.
    pub requests_total: IntCounterVec,
    /// `osp_agent_execution_duration_seconds{skill_id}`.
    pub execution_duration: HistogramVec,
    /// `osp_degradation_level` (0–3).
    pub degradation_level: IntGauge,
    /// `osp_llm_tokens_used{model}`.
    pub llm_tokens_used: IntCounterVec,
}

impl Metrics {
    /// Build and register all instruments.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("osp_requests_total", "Total number of OSP requests"),
            &["method", "status"],
        )
        .expect("requests_total opts are valid");

        let execution_duration = HistogramVec::new(
            HistogramOpts::new(
                "osp_agent_execution_duration_seconds",
                "Time spent executing skills",
            ),
            &["skill_id"],
        )
        .expect("execution_duration opts are valid");

        let degradation_level = IntGauge::new(
            "osp_degradation_level",
            "Current system degradation level (0-3)",
        )
        .expect("degradation_level opts are valid");

        let llm_tokens_used = IntCounterVec::new(
            Opts::new("osp_llm_tokens_used", "Estimated tokens used by LLM router"),
            &["model"],
        )
        .expect("llm_tokens_used opts are valid");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("requests_total registers");
        registry
            .register(Box::new(execution_duration.clone()))
            .expect("execution_duration registers");
        registry
            .register(Box::new(degradation_level.clone()))
            .expect("degradation_level registers");
        registry
            .register(Box::new(llm_tokens_used.clone()))
            .expect("llm_tokens_used registers");

        Self {
            registry,
            requests_total,
            execution_duration,
            degradation_level,
            llm_tokens_used,
        }
    }

    /// Render the registry in Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut out = Vec::new();
        if encoder.encode(&self.registry.gather(), &mut out).is_err() {
            return String::new();
        }
        String::from_utf8(out).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_exposition() {
        let metrics = Metrics::new();
        metrics
            .requests_total
            .with_label_values(&["osp.route", "200"])
            .inc();
        metrics.degradation_level.set(2);

        let text = metrics.render();
        assert!(text.contains("osp_requests_total"));
        assert!(text.contains("osp_degradation_level 2"));
    }

    #[test]
    fn histogram_observes_durations() {
        let metrics = Metrics::new();
        metrics
            .execution_duration
            .with_label_values(&["org.calc"])
            .observe(0.05);
        let text = metrics.render();
        assert!(text.contains("osp_agent_execution_duration_seconds"));
        assert!(text.contains("org.calc"));
    }
}
