//! rebalancer-strategy — pluggable strategies and the registries that pick them.
//!
//! A `Rebalance` names its metrics source, target and policy through
//! "exactly one of" unions. Each family has a `StrategyRegistry` mapping the
//! union discriminant to an implementation of the family's capability
//! trait.
//!
//! # Architecture
//!
//! ```text
//! Registries (built once at startup, shared by handle)
//!   ├── metrics:  "prometheus"     → dyn MetricsSource → dyn MetricsClient
//!   ├── targets:  "route53"        → dyn TargetSource  → dyn TargetClient
//!   └── policies: "targetTracking" → dyn Policy        → dyn Estimator
//! ```
//!
//! Plugins register through an explicit composition step before the
//! controller starts. Registering the same discriminant twice panics: two
//! plugins claiming one name is a build mistake, not a runtime condition.

pub mod contracts;
pub mod error;
pub mod registry;

pub use contracts::{Estimator, MetricsClient, MetricsSource, Policy, TargetClient, TargetSource};
pub use error::{RebalanceError, RebalanceResult};
pub use registry::StrategyRegistry;

/// The three strategy families, bundled for the controller.
pub struct Registries {
    pub metrics: StrategyRegistry<dyn MetricsSource>,
    pub targets: StrategyRegistry<dyn TargetSource>,
    pub policies: StrategyRegistry<dyn Policy>,
}

impl Registries {
    pub fn new() -> Self {
        Self {
            metrics: StrategyRegistry::new("metrics"),
            targets: StrategyRegistry::new("target"),
            policies: StrategyRegistry::new("policy"),
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}
