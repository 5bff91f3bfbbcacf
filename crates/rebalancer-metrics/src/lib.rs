//! rebalancer-metrics — where the live metric comes from.
//!
//! The only source today is Prometheus: an instant query against
//! `/api/v1/query`, issued over a plain HTTP/1.1 connection per call.
//!
//! ```text
//! PrometheusSource::new_client(resource)
//!   └── PrometheusClient
//!         ├── fetch()          → scalar result only
//!         └── evaluate(expr)   → scalar or vector, checked by `condition`
//! ```

pub mod condition;
pub mod prometheus;

use std::sync::Arc;

use rebalancer_core::RebalanceMetrics;
use rebalancer_strategy::Registries;

pub use condition::{QueryValue, evaluate};
pub use prometheus::{PrometheusClient, PrometheusSource};

/// Register every metrics source this crate provides.
pub fn register(registries: &Registries) {
    registries
        .metrics
        .register(RebalanceMetrics::PROMETHEUS, Arc::new(PrometheusSource));
}
