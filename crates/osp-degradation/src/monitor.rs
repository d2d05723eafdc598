// SPDX-License-Identifier: MIT OR Apache-2.0

//! The supervised monitor task and its hysteresis discipline.

use crate::controller::{DegradationController, DegradationLevel};
use crate::sampler::{LoadSample, LoadSampler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Consecutive escalating samples required to raise the level.
const ESCALATION_THRESHOLD: u32 = 2;
/// Consecutive recovering samples required to lower the level.
const RECOVERY_THRESHOLD: u32 = 4;

/// Map one load sample to its target level.
#[must_use]
pub fn target_level(sample: &LoadSample) -> DegradationLevel {
    let LoadSample {
        cpu_percent: cpu,
        memory_percent: mem,
    } = *sample;
    if cpu > 95.0 || mem > 95.0 {
        DegradationLevel::D3Critical
    } else if cpu > 80.0 || mem > 85.0 {
        DegradationLevel::D2Minimal
    } else if cpu > 50.0 || mem > 60.0 {
        DegradationLevel::D1ReducedIntelligence
    } else {
        DegradationLevel::D0Normal
    }
}

/// Hysteresis counters preventing oscillation at boundary loads.
///
/// Escalation needs [`ESCALATION_THRESHOLD`] consecutive samples whose
/// target exceeds the current level; recovery needs
/// [`RECOVERY_THRESHOLD`] consecutive samples below it. A sample that does
/// neither resets both counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct HysteresisTracker {
    high_load_ticks: u32,
    normal_load_ticks: u32,
}

impl HysteresisTracker {
    /// Fresh tracker with both counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample's target level; returns the level to switch to when
    /// a threshold is crossed.
    pub fn observe(
        &mut self,
        current: DegradationLevel,
        target: DegradationLevel,
    ) -> Option<DegradationLevel> {
        if target.value() > current.value() {
            self.high_load_ticks += 1;
            self.normal_load_ticks = 0;
            if self.high_load_ticks >= ESCALATION_THRESHOLD {
                self.high_load_ticks = 0;
                return Some(target);
            }
        } else if target.value() < current.value() {
            self.normal_load_ticks += 1;
            self.high_load_ticks = 0;
            if self.normal_load_ticks >= RECOVERY_THRESHOLD {
                self.normal_load_ticks = 0;
                return Some(target);
            }
        } else {
            self.high_load_ticks = 0;
            self.normal_load_ticks = 0;
        }
        None
    }
}

/// Handle to a running monitor task.
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

impl DegradationController {
    /// Start the background monitor.
    ///
    /// Returns `None` (and logs a warning) when the sampler reports itself
    /// unavailable; auto-degradation is then disabled.
    pub fn start_monitoring(
        self: &Arc<Self>,
        mut sampler: Box<dyn LoadSampler>,
        interval: Duration,
    ) -> Option<MonitorHandle> {
        if !sampler.is_available() {
            warn!("load sampler unavailable; auto-degradation monitoring disabled");
            return None;
        }

        let (stop, mut stopped) = watch::channel(false);
        let controller = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut tracker = HysteresisTracker::new();
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = tokio::time::sleep(interval) => {
                        let Some(sample) = sampler.sample() else {
                            continue;
                        };
                        let current = controller.level();
                        let target = target_level(&sample);
                        if let Some(next) = tracker.observe(current, target) {
                            info!(
                                cpu_percent = sample.cpu_percent,
                                memory_percent = sample.memory_percent,
                                target = %next,
                                "load threshold crossed"
                            );
                            controller.set_level(next);
                        }
                    }
                }
            }
            info!("degradation monitor stopped");
        });

        info!(interval_secs = interval.as_secs_f64(), "degradation monitoring started");
        Some(MonitorHandle { stop, task })
    }
}
