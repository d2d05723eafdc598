// SPDX-License-Identifier: MIT OR Apache-2.0

//! System-load sampling behind a capability trait.

use sysinfo::System;
use tracing::debug;

/// One CPU / memory utilization sample, both in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    /// CPU utilization, 0–100.
    pub cpu_percent: f64,
    /// Memory utilization, 0–100.
    pub memory_percent: f64,
}

/// Source of load samples for the degradation monitor.
///
/// A deployment without a metrics backend wires in [`NullSampler`], which
/// disables the auto monitor; the level then changes only through the
/// admin plane.
pub trait LoadSampler: Send {
    /// Take one sample; `None` when the backend cannot produce one.
    fn sample(&mut self) -> Option<LoadSample>;

    /// Whether this sampler can produce samples at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Sampler backed by the host's system-metrics interface.
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    /// Sampler over a fresh system handle.
    ///
    /// The first CPU reading after construction reports zero; the monitor's
    /// sampling interval warms it up.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSampler for SystemSampler {
    fn sample(&mut self) -> Option<LoadSample> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu_percent = f64::from(self.system.global_cpu_usage());
        let total = self.system.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            self.system.used_memory() as f64 / total as f64 * 100.0
        };

        debug!(cpu_percent, memory_percent, "load sampled");
        Some(LoadSample {
            cpu_percent,
            memory_percent,
        })
    }
}

/// Sampler for deployments without a metrics backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSampler;

impl LoadSampler for NullSampler {
    fn sample(&mut self) -> Option<LoadSample> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_sampler_produces_bounded_percentages() {
        let mut sampler = SystemSampler::new();
        let sample = sampler.sample().expect("system sampler always samples");
        assert!((0.0..=100.0).contains(&sample.cpu_percent));
        assert!((0.0..=100.0).contains(&sample.memory_percent));
    }

    #[test]
    fn null_sampler_is_unavailable() {
        let mut sampler = NullSampler;
        assert!(!sampler.is_available());
        assert!(sampler.sample().is_none());
    }
}
