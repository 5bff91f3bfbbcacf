//! In-process strategy fakes shared by the controller tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rebalancer_core::*;
use rebalancer_strategy::{
    MetricsClient, MetricsSource, RebalanceError, RebalanceResult, Registries, TargetClient,
    TargetSource,
};

/// A metric pinned to one value.
pub struct FakeMetrics {
    pub value: Mutex<f64>,
    fetches: AtomicUsize,
}

impl FakeMetrics {
    /// How many times the metric was read.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsClient for FakeMetrics {
    async fn fetch(&self) -> RebalanceResult<f64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(*self.value.lock().unwrap())
    }

    async fn evaluate(&self, _expression: &str) -> RebalanceResult<bool> {
        Ok(true)
    }
}

pub struct FakeMetricsSource(pub Arc<FakeMetrics>);

#[async_trait]
impl MetricsSource for FakeMetricsSource {
    async fn new_client(&self, _resource: &Rebalance) -> RebalanceResult<Arc<dyn MetricsClient>> {
        let client: Arc<dyn MetricsClient> = self.0.clone();
        Ok(client)
    }
}

/// A weighted record held in memory.
#[derive(Default)]
pub struct FakeTarget {
    pub weight: Mutex<i64>,
    pub writes: Mutex<Vec<i64>>,
    /// Reject every write.
    pub fail_writes: bool,
    /// Accept writes without changing the weight.
    pub ignore_writes: bool,
}

impl FakeTarget {
    pub fn with_weight(weight: i64) -> Self {
        Self {
            weight: Mutex::new(weight),
            ..Default::default()
        }
    }

    pub fn writes(&self) -> Vec<i64> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetClient for FakeTarget {
    async fn get_weight(&self) -> RebalanceResult<i64> {
        Ok(*self.weight.lock().unwrap())
    }

    async fn set_weight(&self, value: i64) -> RebalanceResult<()> {
        if self.fail_writes {
            return Err(RebalanceError::Convergence("upsert rejected".to_string()));
        }
        self.writes.lock().unwrap().push(value);
        if !self.ignore_writes {
            *self.weight.lock().unwrap() = value;
        }
        Ok(())
    }
}

pub struct FakeTargetSource(pub Arc<FakeTarget>);

#[async_trait]
impl TargetSource for FakeTargetSource {
    async fn new_client(&self, _resource: &Rebalance) -> RebalanceResult<Arc<dyn TargetClient>> {
        let client: Arc<dyn TargetClient> = self.0.clone();
        Ok(client)
    }
}

/// Registries wired to the given fakes plus the real target-tracking policy.
pub fn registries(metrics: Arc<FakeMetrics>, target: Arc<FakeTarget>) -> Arc<Registries> {
    let registries = Registries::new();
    registries
        .metrics
        .register(RebalanceMetrics::PROMETHEUS, Arc::new(FakeMetricsSource(metrics)));
    registries
        .targets
        .register(RebalanceTarget::ROUTE53, Arc::new(FakeTargetSource(target)));
    rebalancer_policy::register(&registries);
    Arc::new(registries)
}

pub fn metric(value: f64) -> Arc<FakeMetrics> {
    Arc::new(FakeMetrics {
        value: Mutex::new(value),
        fetches: AtomicUsize::new(0),
    })
}

/// target 100, base 10, interval 30s.
pub fn resource(name: &str, dry_run: bool) -> Rebalance {
    Rebalance {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: "default".to_string(),
            deletion_timestamp: None,
        },
        spec: RebalanceSpec {
            interval: "30s".to_string(),
            policy: RebalancePolicy {
                target_tracking: Some(TargetTrackingPolicy {
                    target_value: 100,
                    base_value: 10,
                    disable_scale_in: false,
                    scheduled: Vec::new(),
                }),
            },
            target: RebalanceTarget {
                route53: Some(Route53Target {
                    hosted_zone_id: "Z1".to_string(),
                    region: "us-east-1".to_string(),
                    resource: Route53TargetRecord {
                        name: "www.example.com".to_string(),
                        record_type: "A".to_string(),
                        identifier: "blue".to_string(),
                    },
                    ..Default::default()
                }),
            },
            metrics: RebalanceMetrics {
                prometheus: Some(PrometheusMetrics {
                    address: "http://prometheus:9090".to_string(),
                    query: "sum(rate(http_requests_total[1m]))".to_string(),
                    timeout: 10,
                }),
            },
            dry_run,
        },
        status: RebalanceStatus::default(),
    }
}
