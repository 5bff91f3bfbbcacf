//! rebalancer-policy — policies turning a metric reading into a weight.
//!
//! # Target tracking
//!
//! ```text
//! current  = metrics.fetch()
//! rate     = max(current / targetValue - 1, 0)
//! estimate = ceil(baseValue * rate)
//!
//! for each scheduled window with start <= now < end (today, local time):
//!     estimate = max(estimate, window.value)
//! ```
//!
//! The rate term only ever raises the weight; lowering it happens when a
//! scheduled floor stops applying. Windows do not wrap past midnight: an
//! end earlier than its start never matches.

pub mod target_tracking;

use std::sync::Arc;

use rebalancer_core::RebalancePolicy;
use rebalancer_strategy::Registries;

pub use target_tracking::{ScheduleWindow, TargetTracking, TargetTrackingEstimator};

/// Register every policy in this crate.
pub fn register(registries: &Registries) {
    registries
        .policies
        .register(RebalancePolicy::TARGET_TRACKING, Arc::new(TargetTracking));
}
