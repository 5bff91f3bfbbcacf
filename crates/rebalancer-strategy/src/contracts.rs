//! Capability traits implemented by strategy plugins.
//!
//! Every call may block on the network. Cancellation is the caller's
//! business: the controller bounds a whole pass with a deadline and drops
//! the in-flight future when it expires.

use std::sync::Arc;

use async_trait::async_trait;

use rebalancer_core::Rebalance;

use crate::error::RebalanceResult;

/// Reads the live metric for one resource.
#[async_trait]
pub trait MetricsClient: Send + Sync {
    /// Latest scalar reading.
    async fn fetch(&self) -> RebalanceResult<f64>;

    /// Evaluate a boolean condition against the current value(s).
    async fn evaluate(&self, expression: &str) -> RebalanceResult<bool>;
}

/// Builds a `MetricsClient` for a resource. Registered under a
/// `metrics` union discriminant.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn new_client(&self, resource: &Rebalance) -> RebalanceResult<Arc<dyn MetricsClient>>;
}

/// Reads and writes the weight of one managed resource.
///
/// Writes may not be visible immediately; callers re-read with
/// `get_weight` after `set_weight` to learn the converged value.
#[async_trait]
pub trait TargetClient: Send + Sync {
    async fn get_weight(&self) -> RebalanceResult<i64>;

    async fn set_weight(&self, value: i64) -> RebalanceResult<()>;
}

/// Builds a `TargetClient` for a resource. Registered under a `target`
/// union discriminant.
#[async_trait]
pub trait TargetSource: Send + Sync {
    async fn new_client(&self, resource: &Rebalance) -> RebalanceResult<Arc<dyn TargetClient>>;
}

/// Computes the desired weight.
#[async_trait]
pub trait Estimator: Send + Sync {
    async fn estimate(&self) -> RebalanceResult<i64>;
}

/// Builds an `Estimator` from a resource and its clients. Registered under
/// a `policy` union discriminant.
pub trait Policy: Send + Sync {
    fn new_estimator(
        &self,
        resource: &Rebalance,
        target: Arc<dyn TargetClient>,
        metrics: Arc<dyn MetricsClient>,
    ) -> RebalanceResult<Box<dyn Estimator>>;
}
