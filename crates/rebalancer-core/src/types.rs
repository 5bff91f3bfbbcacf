//! The `Rebalance` resource schema.
//!
//! A `Rebalance` names one weighted resource to steer, where its metric
//! comes from, and how the desired weight is computed. Each of the three
//! strategy blocks (`policy`, `target`, `metrics`) is a union: a struct of
//! optional members of which exactly one must be populated.
//!
//! All types serialize as camelCase JSON, the same shape operators write
//! and the state store persists.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Identity ───────────────────────────────────────────────────────

/// Identity of a managed resource, `{namespace}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build the composite key for the rebalances table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Set by the owner when the resource is being torn down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

// ── Rebalance ──────────────────────────────────────────────────────

/// A managed weighted resource and its observed status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rebalance {
    pub metadata: ObjectMeta,
    pub spec: RebalanceSpec,
    #[serde(default)]
    pub status: RebalanceStatus,
}

impl Rebalance {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// Whether the owner has marked this resource for deletion.
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

/// Desired behaviour of a `Rebalance`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceSpec {
    /// Re-evaluation period, e.g. "30s" or "1m 30s".
    #[serde(default)]
    pub interval: String,
    pub policy: RebalancePolicy,
    pub target: RebalanceTarget,
    pub metrics: RebalanceMetrics,
    /// Report drift without writing to the target.
    #[serde(default)]
    pub dry_run: bool,
}

// ── Policy ─────────────────────────────────────────────────────────

/// How the desired weight is computed. Exactly one member must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalancePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tracking: Option<TargetTrackingPolicy>,
}

impl RebalancePolicy {
    pub const TARGET_TRACKING: &'static str = "targetTracking";
}

/// Steer the weight up in proportion to how far the metric exceeds a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTrackingPolicy {
    /// Metric value the resource should be kept at.
    pub target_value: i64,
    /// Weight scaled by the overage ratio.
    pub base_value: i64,
    /// Reserved; not enforced by the estimator yet.
    #[serde(default)]
    pub disable_scale_in: bool,
    /// Time-of-day floors applied on top of the computed weight.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scheduled: Vec<Scheduled>,
}

/// A daily window during which the weight is at least `value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduled {
    /// Inclusive start, "HH:MM" local time.
    pub start_time: String,
    /// Exclusive end, "HH:MM" local time.
    pub end_time: String,
    pub value: i64,
}

// ── Target ─────────────────────────────────────────────────────────

/// The weighted resource being steered. Exactly one member must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route53: Option<Route53Target>,
}

impl RebalanceTarget {
    pub const ROUTE53: &'static str = "route53";
}

/// A weighted Route53 record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route53Target {
    #[serde(rename = "hostedZoneID")]
    pub hosted_zone_id: String,
    #[serde(default)]
    pub region: String,
    pub resource: Route53TargetRecord,
    #[serde(default, skip_serializing_if = "AwsAuth::is_empty")]
    pub auth: AwsAuth,
}

/// How the Route53 transport authenticates. Empty means ambient credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<AwsAuthSecretRef>,
}

impl AwsAuth {
    pub fn is_empty(&self) -> bool {
        self.secret_ref.is_none()
    }
}

/// Static access key pair, each half read from a secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsAuthSecretRef {
    #[serde(rename = "accessKeyIDSecretRef", default)]
    pub access_key_id: SecretKeySelector,
    #[serde(rename = "secretAccessKeySecretRef", default)]
    pub secret_access_key: SecretKeySelector,
}

/// One key of a named secret. `namespace` defaults to the resource's own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub key: String,
}

/// Which record inside the hosted zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route53TargetRecord {
    pub name: String,
    /// Record type, e.g. "A" or "CNAME".
    #[serde(rename = "type")]
    pub record_type: String,
    /// Set identifier distinguishing weighted records with the same name.
    #[serde(default)]
    pub identifier: String,
}

// ── Metrics ────────────────────────────────────────────────────────

/// Where the live metric comes from. Exactly one member must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusMetrics>,
}

impl RebalanceMetrics {
    pub const PROMETHEUS: &'static str = "prometheus";
}

/// An instant PromQL query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusMetrics {
    /// Base URL of the Prometheus server, e.g. "http://prometheus:9090".
    pub address: String,
    pub query: String,
    /// Query timeout in seconds.
    #[serde(default = "default_prometheus_timeout")]
    pub timeout: i64,
}

fn default_prometheus_timeout() -> i64 {
    10
}

// ── Status ─────────────────────────────────────────────────────────

/// Health of a resource as of its last completed reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Desired and actual agree.
    Healthy,
    /// Drift that dry-run deliberately left unapplied.
    Unhealthy,
    /// Drift remaining after a write was attempted.
    Error,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Healthy => "Healthy",
            Condition::Unhealthy => "Unhealthy",
            Condition::Error => "Error",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state written back by the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub desired_value: i64,
    #[serde(default)]
    pub actual_value: i64,
    /// RFC 3339 timestamp of the last status change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_at: Option<String>,
}

impl RebalanceStatus {
    /// Whether two statuses describe the same observation, ignoring the
    /// timestamp.
    pub fn same_observation(&self, other: &RebalanceStatus) -> bool {
        self.condition == other.condition
            && self.desired_value == other.desired_value
            && self.actual_value == other.actual_value
    }
}
