//! Per-resource gauges and their Prometheus text exposition.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use rebalancer_core::{Condition, ResourceKey};

/// Last observation of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeSet {
    pub condition: Condition,
    pub desired: i64,
    pub actual: i64,
}

impl GaugeSet {
    fn flag(&self, condition: Condition) -> u8 {
        u8::from(self.condition == condition)
    }
}

/// Shared gauge registry, cheap to clone.
#[derive(Clone, Default)]
pub struct Gauges {
    inner: Arc<RwLock<BTreeMap<ResourceKey, GaugeSet>>>,
}

impl Gauges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &ResourceKey, gauges: GaugeSet) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(key.clone(), gauges);
    }

    pub fn get(&self, key: &ResourceKey) -> Option<GaugeSet> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(key).copied()
    }

    /// Drop every series of a resource.
    pub fn remove(&self, key: &ResourceKey) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render all gauges in Prometheus text format, labelled by
    /// `name` and `namespace`.
    pub fn render_prometheus(&self) -> String {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();

        let families: [(&str, &str, fn(&GaugeSet) -> i64); 5] = [
            ("rebalancer_error", "Drift remains after a write (1 or 0).", |g| {
                g.flag(Condition::Error).into()
            }),
            ("rebalancer_unhealthy", "Drift left unapplied in dry-run (1 or 0).", |g| {
                g.flag(Condition::Unhealthy).into()
            }),
            ("rebalancer_healthy", "Desired and actual weight agree (1 or 0).", |g| {
                g.flag(Condition::Healthy).into()
            }),
            ("rebalancer_desired", "Desired weight from the last pass.", |g| g.desired),
            ("rebalancer_actual", "Actual weight from the last pass.", |g| g.actual),
        ];

        for (name, help, value) in families {
            out.push_str(&format!("# HELP {name} {help}\n"));
            out.push_str(&format!("# TYPE {name} gauge\n"));
            for (key, g) in inner.iter() {
                out.push_str(&format!(
                    "{name}{{name=\"{}\",namespace=\"{}\"}} {}\n",
                    escape_label(&key.name),
                    escape_label(&key.namespace),
                    value(g)
                ));
            }
        }

        out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy(v: i64) -> GaugeSet {
        GaugeSet {
            condition: Condition::Healthy,
            desired: v,
            actual: v,
        }
    }

    #[test]
    fn exactly_one_flag_set() {
        let gauges = Gauges::new();
        gauges.set(
            &ResourceKey::new("edge", "www"),
            GaugeSet {
                condition: Condition::Unhealthy,
                desired: 5,
                actual: 2,
            },
        );

        let text = gauges.render_prometheus();
        assert!(text.contains("rebalancer_error{name=\"www\",namespace=\"edge\"} 0\n"));
        assert!(text.contains("rebalancer_unhealthy{name=\"www\",namespace=\"edge\"} 1\n"));
        assert!(text.contains("rebalancer_healthy{name=\"www\",namespace=\"edge\"} 0\n"));
        assert!(text.contains("rebalancer_desired{name=\"www\",namespace=\"edge\"} 5\n"));
        assert!(text.contains("rebalancer_actual{name=\"www\",namespace=\"edge\"} 2\n"));
        assert!(text.contains("# TYPE rebalancer_healthy gauge"));
    }

    #[test]
    fn remove_drops_all_series() {
        let gauges = Gauges::new();
        let key = ResourceKey::new("default", "www");
        gauges.set(&key, healthy(3));
        assert!(gauges.remove(&key));
        assert!(!gauges.remove(&key));

        let text = gauges.render_prometheus();
        assert!(!text.contains("name=\"www\""));
        assert!(gauges.is_empty());
    }

    #[test]
    fn set_overwrites() {
        let gauges = Gauges::new();
        let key = ResourceKey::new("default", "www");
        gauges.set(&key, healthy(3));
        gauges.set(&key, healthy(7));
        assert_eq!(gauges.get(&key), Some(healthy(7)));
        assert_eq!(gauges.len(), 1);
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
