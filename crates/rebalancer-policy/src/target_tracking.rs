//! Target-tracking policy.
//!
//! Keeps a metric at `targetValue` by raising the weight of the managed
//! resource in proportion to the overage, with optional daily floors.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Timelike};
use tracing::debug;

use rebalancer_core::{Rebalance, Scheduled, TargetTrackingPolicy};
use rebalancer_strategy::{
    Estimator, MetricsClient, Policy, RebalanceError, RebalanceResult, TargetClient,
};

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// The `targetTracking` policy factory.
pub struct TargetTracking;

impl Policy for TargetTracking {
    fn new_estimator(
        &self,
        resource: &Rebalance,
        _target: Arc<dyn TargetClient>,
        metrics: Arc<dyn MetricsClient>,
    ) -> RebalanceResult<Box<dyn Estimator>> {
        let spec = resource.spec.policy.target_tracking.as_ref().ok_or_else(|| {
            RebalanceError::Config(format!(
                "{}: targetTracking policy is not set",
                resource.key()
            ))
        })?;
        let estimator = TargetTrackingEstimator::new(resource.key().to_string(), spec, metrics)?;
        Ok(Box::new(estimator))
    }
}

/// A daily window `[start, end)` carrying a weight floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleWindow {
    /// Seconds from local midnight, inclusive.
    start: u32,
    /// Seconds from local midnight, exclusive.
    end: u32,
    value: i64,
}

impl ScheduleWindow {
    pub fn parse(scheduled: &Scheduled) -> RebalanceResult<Self> {
        Ok(Self {
            start: parse_time_of_day(&scheduled.start_time)?,
            end: parse_time_of_day(&scheduled.end_time)?,
            value: scheduled.value,
        })
    }

    /// Whether `now` falls inside this window on `now`'s own day.
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        let secs = now.num_seconds_from_midnight();
        self.start <= secs && secs < self.end
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// Parse "HH:MM" into seconds from midnight. "24:00" denotes end of day.
fn parse_time_of_day(s: &str) -> RebalanceResult<u32> {
    let invalid = || RebalanceError::Config(format!("invalid time of day {s:?}, expected HH:MM"));

    let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if minute > 59 {
        return Err(invalid());
    }

    let secs = hour * 3600 + minute * 60;
    if secs > SECONDS_PER_DAY {
        return Err(invalid());
    }
    Ok(secs)
}

/// Estimator for one resource, built fresh for every reconcile pass.
pub struct TargetTrackingEstimator {
    resource: String,
    metrics: Arc<dyn MetricsClient>,
    target_value: i64,
    base_value: i64,
    /// Reserved; the rate term never scales in, so there is nothing to gate yet.
    #[allow(dead_code)]
    disable_scale_in: bool,
    scheduled: Vec<ScheduleWindow>,
}

impl TargetTrackingEstimator {
    pub fn new(
        resource: String,
        spec: &TargetTrackingPolicy,
        metrics: Arc<dyn MetricsClient>,
    ) -> RebalanceResult<Self> {
        if spec.target_value == 0 {
            return Err(RebalanceError::Config(format!(
                "{resource}: targetValue must not be zero"
            )));
        }

        let scheduled = spec
            .scheduled
            .iter()
            .map(ScheduleWindow::parse)
            .collect::<RebalanceResult<Vec<_>>>()?;

        Ok(Self {
            resource,
            metrics,
            target_value: spec.target_value,
            base_value: spec.base_value,
            disable_scale_in: spec.disable_scale_in,
            scheduled,
        })
    }

    /// Desired weight for a given reading at a given local time.
    pub fn estimate_at(&self, current: f64, now: NaiveDateTime) -> RebalanceResult<i64> {
        let from_rate = scale_from_rate(
            self.base_value as f64,
            self.target_value as f64,
            current,
        )?;

        if self.scheduled.is_empty() {
            return Ok(from_rate);
        }
        Ok(apply_schedule(&self.scheduled, from_rate, now))
    }
}

#[async_trait]
impl Estimator for TargetTrackingEstimator {
    async fn estimate(&self) -> RebalanceResult<i64> {
        let current = self.metrics.fetch().await?;
        let desired = self.estimate_at(current, Local::now().naive_local())?;

        debug!(
            resource = %self.resource,
            current,
            target = self.target_value,
            base = self.base_value,
            desired,
            "target tracking estimate"
        );
        Ok(desired)
    }
}

/// `ceil(base * max(current / target - 1, 0))`.
pub fn scale_from_rate(base: f64, target: f64, current: f64) -> RebalanceResult<i64> {
    if target == 0.0 {
        return Err(RebalanceError::Config(
            "targetValue must not be zero".to_string(),
        ));
    }

    let rate = current / target - 1.0;
    if !rate.is_finite() {
        return Err(RebalanceError::Config(format!(
            "non-finite rate from current={current} target={target}"
        )));
    }

    let estimate = (base * rate.max(0.0)).ceil();
    if !estimate.is_finite() || estimate >= i64::MAX as f64 || estimate <= i64::MIN as f64 {
        return Err(RebalanceError::Config(format!(
            "estimate {estimate} out of range for base={base} rate={rate}"
        )));
    }
    Ok(estimate as i64)
}

/// The largest of `estimate` and every window value active at `now`.
pub fn apply_schedule(windows: &[ScheduleWindow], estimate: i64, now: NaiveDateTime) -> i64 {
    windows
        .iter()
        .filter(|w| w.contains(now))
        .map(ScheduleWindow::value)
        .fold(estimate, i64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rebalancer_core::*;

    struct FixedMetric(RebalanceResult<f64>);

    #[async_trait]
    impl MetricsClient for FixedMetric {
        async fn fetch(&self) -> RebalanceResult<f64> {
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(e) => Err(RebalanceError::Retrieval(e.to_string())),
            }
        }

        async fn evaluate(&self, _expression: &str) -> RebalanceResult<bool> {
            Ok(true)
        }
    }

    struct NoTarget;

    #[async_trait]
    impl TargetClient for NoTarget {
        async fn get_weight(&self) -> RebalanceResult<i64> {
            Ok(0)
        }

        async fn set_weight(&self, _value: i64) -> RebalanceResult<()> {
            Ok(())
        }
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 12, 20)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn window(start: &str, end: &str, value: i64) -> ScheduleWindow {
        ScheduleWindow::parse(&Scheduled {
            start_time: start.to_string(),
            end_time: end.to_string(),
            value,
        })
        .unwrap()
    }

    fn policy(target: i64, base: i64, scheduled: Vec<Scheduled>) -> TargetTrackingPolicy {
        TargetTrackingPolicy {
            target_value: target,
            base_value: base,
            disable_scale_in: false,
            scheduled,
        }
    }

    fn resource_with(spec: Option<TargetTrackingPolicy>) -> Rebalance {
        Rebalance {
            metadata: ObjectMeta {
                name: "www".to_string(),
                namespace: "default".to_string(),
                deletion_timestamp: None,
            },
            spec: RebalanceSpec {
                interval: "30s".to_string(),
                policy: RebalancePolicy {
                    target_tracking: spec,
                },
                ..Default::default()
            },
            status: RebalanceStatus::default(),
        }
    }

    // ── Rate term ──────────────────────────────────────────────────

    #[test]
    fn rate_lower_than_target() {
        assert_eq!(scale_from_rate(10.0, 100.0, 80.0).unwrap(), 0);
    }

    #[test]
    fn rate_same_as_target() {
        assert_eq!(scale_from_rate(10.0, 100.0, 100.0).unwrap(), 0);
    }

    #[test]
    fn rate_twenty_percent_above_target() {
        assert_eq!(scale_from_rate(10.0, 100.0, 120.0).unwrap(), 2);
    }

    #[test]
    fn rate_three_times_target() {
        assert_eq!(scale_from_rate(10.0, 100.0, 300.0).unwrap(), 20);
    }

    #[test]
    fn rate_small_overage_rounds_up() {
        assert_eq!(scale_from_rate(10.0, 100.0, 100.5).unwrap(), 1);
    }

    #[test]
    fn rate_never_negative_below_target() {
        for current in [0.0, 1.0, 25.0, 50.0, 99.9, 100.0] {
            assert_eq!(scale_from_rate(1000.0, 100.0, current).unwrap(), 0, "current={current}");
        }
    }

    #[test]
    fn rate_zero_target_is_config_error() {
        let err = scale_from_rate(10.0, 0.0, 50.0).unwrap_err();
        assert!(matches!(err, RebalanceError::Config(_)));
    }

    #[test]
    fn rate_non_finite_is_config_error() {
        assert!(matches!(
            scale_from_rate(10.0, 100.0, f64::NAN),
            Err(RebalanceError::Config(_))
        ));
        assert!(matches!(
            scale_from_rate(10.0, 100.0, f64::INFINITY),
            Err(RebalanceError::Config(_))
        ));
        assert!(matches!(
            scale_from_rate(f64::MAX, 1.0, f64::MAX),
            Err(RebalanceError::Config(_))
        ));
    }

    // ── Schedule ───────────────────────────────────────────────────

    #[test]
    fn schedule_within_window_start_inclusive() {
        let windows = vec![window("19:00", "23:30", 2)];
        assert_eq!(apply_schedule(&windows, 0, at(19, 0)), 2);
    }

    #[test]
    fn schedule_outside_window() {
        let windows = vec![window("19:00", "23:30", 2)];
        assert_eq!(apply_schedule(&windows, 0, at(12, 0)), 0);
    }

    #[test]
    fn schedule_end_is_exclusive() {
        let windows = vec![window("19:00", "23:30", 2)];
        assert_eq!(apply_schedule(&windows, 0, at(23, 29)), 2);
        assert_eq!(apply_schedule(&windows, 0, at(23, 30)), 0);
    }

    #[test]
    fn schedule_multiple_windows_take_max() {
        let windows = vec![window("18:00", "23:30", 2), window("19:00", "20:00", 3)];
        assert_eq!(apply_schedule(&windows, 1, at(19, 0)), 3);
    }

    #[test]
    fn schedule_never_lowers_estimate() {
        let windows = vec![window("00:00", "24:00", 2)];
        assert_eq!(apply_schedule(&windows, 7, at(8, 0)), 7);
    }

    #[test]
    fn schedule_does_not_wrap_midnight() {
        let windows = vec![window("22:00", "02:00", 5)];
        assert_eq!(apply_schedule(&windows, 0, at(23, 0)), 0);
        assert_eq!(apply_schedule(&windows, 0, at(1, 0)), 0);
    }

    #[test]
    fn schedule_until_end_of_day() {
        let windows = vec![window("19:00", "24:00", 4)];
        let late = NaiveDate::from_ymd_opt(2022, 12, 20)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(apply_schedule(&windows, 0, late), 4);
    }

    #[test]
    fn parse_time_of_day_values() {
        assert_eq!(parse_time_of_day("00:00").unwrap(), 0);
        assert_eq!(parse_time_of_day("9:05").unwrap(), 9 * 3600 + 5 * 60);
        assert_eq!(parse_time_of_day("24:00").unwrap(), SECONDS_PER_DAY);
        assert!(parse_time_of_day("24:01").is_err());
        assert!(parse_time_of_day("12:60").is_err());
        assert!(parse_time_of_day("noon").is_err());
        assert!(parse_time_of_day("12").is_err());
    }

    // ── Estimator ──────────────────────────────────────────────────

    #[test]
    fn estimate_at_combines_rate_and_schedule() {
        let spec = policy(
            100,
            10,
            vec![Scheduled {
                start_time: "19:00".to_string(),
                end_time: "20:00".to_string(),
                value: 3,
            }],
        );
        let est =
            TargetTrackingEstimator::new("t".to_string(), &spec, Arc::new(FixedMetric(Ok(0.0))))
                .unwrap();

        // Rate wins over the floor.
        assert_eq!(est.estimate_at(300.0, at(19, 30)).unwrap(), 20);
        // Floor wins over a zero rate.
        assert_eq!(est.estimate_at(50.0, at(19, 30)).unwrap(), 3);
        // Outside the window only the rate counts.
        assert_eq!(est.estimate_at(50.0, at(21, 0)).unwrap(), 0);
    }

    #[tokio::test]
    async fn estimate_fetches_metric() {
        let spec = policy(100, 10, Vec::new());
        let est =
            TargetTrackingEstimator::new("t".to_string(), &spec, Arc::new(FixedMetric(Ok(150.0))))
                .unwrap();
        assert_eq!(est.estimate().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn estimate_propagates_fetch_error() {
        let spec = policy(100, 10, Vec::new());
        let failing = FixedMetric(Err(RebalanceError::Retrieval("down".to_string())));
        let est = TargetTrackingEstimator::new("t".to_string(), &spec, Arc::new(failing)).unwrap();

        let err = est.estimate().await.unwrap_err();
        assert!(matches!(err, RebalanceError::Retrieval(_)));
    }

    #[test]
    fn zero_target_rejected_at_construction() {
        let spec = policy(0, 10, Vec::new());
        let res = TargetTrackingEstimator::new("t".to_string(), &spec, Arc::new(FixedMetric(Ok(1.0))));
        assert!(matches!(res, Err(RebalanceError::Config(_))));
    }

    #[test]
    fn malformed_schedule_rejected_at_construction() {
        let spec = policy(
            100,
            10,
            vec![Scheduled {
                start_time: "7pm".to_string(),
                end_time: "20:00".to_string(),
                value: 3,
            }],
        );
        let res = TargetTrackingEstimator::new("t".to_string(), &spec, Arc::new(FixedMetric(Ok(1.0))));
        assert!(matches!(res, Err(RebalanceError::Config(_))));
    }

    #[tokio::test]
    async fn policy_builds_estimator_from_resource() {
        let resource = resource_with(Some(policy(100, 10, Vec::new())));
        let est = TargetTracking
            .new_estimator(&resource, Arc::new(NoTarget), Arc::new(FixedMetric(Ok(120.0))))
            .unwrap();
        assert_eq!(est.estimate().await.unwrap(), 2);
    }

    #[test]
    fn policy_without_member_is_config_error() {
        let resource = resource_with(None);
        let res = TargetTracking.new_estimator(
            &resource,
            Arc::new(NoTarget),
            Arc::new(FixedMetric(Ok(1.0))),
        );
        assert!(matches!(res, Err(RebalanceError::Config(_))));
    }
}
