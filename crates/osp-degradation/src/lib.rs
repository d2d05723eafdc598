// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Graceful-degradation state machine with hysteresis."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Four operating levels form a total order, D0 (normal) through D3 (load
//! shedding). The [`DegradationController`] is the single source of truth:
//! the RPC dispatcher consults it at admission, the router consults it to
//! disable the semantic stage, and the delivery enforcer consults it before
//! executing skills.
//!
//! The optional monitor is a supervised task that samples system load
//! through the [`LoadSampler`] capability trait and applies hysteresis so
//! the level does not oscillate at boundary loads. With a null sampler the
//! monitor is disabled and the level only changes through the admin plane.

mod controller;
mod monitor;
mod sampler;

pub use controller::{DegradationController, DegradationLevel, LevelProfile, UnknownLevel};
pub use monitor::{HysteresisTracker, MonitorHandle, target_level};
pub use sampler::{LoadSample, LoadSampler, NullSampler, SystemSampler};
