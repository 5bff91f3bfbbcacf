//! One reconcile pass over one resource.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use rebalancer_core::{RebalanceStatus, ResourceKey, parse_interval};
use rebalancer_state::StateStore;
use rebalancer_strategy::{RebalanceError, Registries};

use crate::condition::health_condition;
use crate::error::ControllerResult;
use crate::gauges::{GaugeSet, Gauges};

/// What the runner should do with a key after a completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run again after the resource's interval.
    RequeueAfter(Duration),
    /// Nothing scheduled; only an external change re-triggers.
    AwaitChange,
}

/// Resolves strategies for a resource and drives it to its desired weight.
pub struct Reconciler {
    store: StateStore,
    registries: Arc<Registries>,
    gauges: Gauges,
}

impl Reconciler {
    pub fn new(store: StateStore, registries: Arc<Registries>, gauges: Gauges) -> Self {
        Self {
            store,
            registries,
            gauges,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn gauges(&self) -> &Gauges {
        &self.gauges
    }

    /// Run one pass. Any error aborts the pass with the stored status as it
    /// was before.
    pub async fn reconcile(&self, key: &ResourceKey) -> ControllerResult<Action> {
        let Some(resource) = self.store.get_rebalance(key)? else {
            if self.gauges.remove(key) {
                debug!(resource = %key, "resource gone, gauges removed");
            }
            return Ok(Action::AwaitChange);
        };

        if resource.is_deleting() {
            debug!(resource = %key, "resource is being deleted, skipping");
            return Ok(Action::AwaitChange);
        }

        let metrics_source = self.registries.metrics.resolve(&resource.spec.metrics)?;
        let target_source = self.registries.targets.resolve(&resource.spec.target)?;
        let policy = self.registries.policies.resolve(&resource.spec.policy)?;

        let metrics = metrics_source.new_client(&resource).await?;
        let target = target_source.new_client(&resource).await?;
        let estimator = policy.new_estimator(&resource, Arc::clone(&target), metrics)?;

        let desired = estimator.estimate().await?;
        let mut actual = target.get_weight().await?;

        let dry_run = resource.spec.dry_run;
        if actual != desired && !dry_run {
            info!(resource = %key, desired, actual, "converging weight");
            target.set_weight(desired).await?;
            actual = target.get_weight().await?;
        }

        let condition = health_condition(desired, actual, dry_run);
        let observed = RebalanceStatus {
            condition: Some(condition),
            desired_value: desired,
            actual_value: actual,
            last_update_at: None,
        };
        let gauge_set = GaugeSet {
            condition,
            desired,
            actual,
        };

        if !observed.same_observation(&resource.status) {
            let status = RebalanceStatus {
                last_update_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
                ..observed
            };
            self.gauges.set(key, gauge_set);
            if self.store.update_status(key, &status)? {
                info!(resource = %key, %condition, desired, actual, dry_run, "status updated");
            } else {
                debug!(resource = %key, "resource removed during pass, status dropped");
            }
        } else if self.gauges.get(key).is_none() {
            // Status survived a restart but gauges did not.
            self.gauges.set(key, gauge_set);
        }

        let interval = parse_interval(&resource.spec.interval).map_err(RebalanceError::from)?;
        debug!(resource = %key, %condition, desired, actual, ?interval, "pass complete");
        Ok(Action::RequeueAfter(interval))
    }
}
