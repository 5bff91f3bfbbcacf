//! Composition of the rebalancer daemon.
//!
//! Strategies are registered here, once, before anything reads the
//! registries. The binary and the integration tests share this wiring.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use rebalancer_api::{ApiState, build_router};
use rebalancer_controller::{Controller, ControllerSettings, Gauges, Reconciler};
use rebalancer_core::RebalancerConfig;
use rebalancer_state::StateStore;
use rebalancer_strategy::Registries;
use rebalancer_target::{RecordSetApi, StoreRecordSets};

/// Register every built-in strategy.
///
/// # Panics
///
/// If called twice on the same `Registries`.
pub fn register_all(registries: &Registries, records: Arc<dyn RecordSetApi>) {
    rebalancer_policy::register(registries);
    rebalancer_metrics::register(registries);
    rebalancer_target::register(registries, records);

    info!(
        metrics = ?registries.metrics.names(),
        targets = ?registries.targets.names(),
        policies = ?registries.policies.names(),
        "strategies registered"
    );
}

/// The assembled daemon, ready to run.
pub struct Daemon {
    pub controller: Controller,
    pub router: axum::Router,
}

/// Wire store, strategies, controller and API together. Record sets are
/// served from `store`.
pub fn assemble(store: StateStore, settings: ControllerSettings) -> Daemon {
    let registries = Registries::new();
    register_all(&registries, Arc::new(StoreRecordSets::new(store.clone())));

    let gauges = Gauges::new();
    let reconciler = Reconciler::new(store.clone(), Arc::new(registries), gauges.clone());
    let controller = Controller::new(reconciler, settings);

    let router = build_router(ApiState {
        store,
        gauges,
        queue: controller.queue(),
    });

    Daemon { controller, router }
}

/// Read `rebalancer.toml` if given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RebalancerConfig> {
    match path {
        Some(path) => {
            let config = RebalancerConfig::from_file(path)?;
            info!(path = ?path, "configuration loaded");
            Ok(config)
        }
        None => Ok(RebalancerConfig::default()),
    }
}
