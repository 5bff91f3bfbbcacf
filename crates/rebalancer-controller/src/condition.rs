//! Health condition from desired vs. actual weight.

use rebalancer_core::Condition;

/// Recomputed from scratch every pass; no memory of earlier conditions.
pub fn health_condition(desired: i64, actual: i64, dry_run: bool) -> Condition {
    if desired == actual {
        Condition::Healthy
    } else if dry_run {
        Condition::Unhealthy
    } else {
        Condition::Error
    }
}
