//! Metrics snapshot and export for session pools

use std::collections::HashMap;

/// Point-in-time snapshot of a pool's diagnostic counters.
///
/// All counts are taken under the pool lock in a single acquisition, so the
/// snapshot is internally consistent: `used + idle == allocated` and
/// `available == idle + (capacity - allocated)` always hold within one
/// snapshot.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Maximum number of sessions the pool will manage.
    pub capacity: usize,

    /// Sessions currently checked out.
    pub used: usize,

    /// Sessions sitting idle, available for reuse.
    pub idle: usize,

    /// Sessions (idle or active) whose connection reports not-connected.
    pub dead: usize,

    /// Total sessions currently allocated (`used + idle`).
    pub allocated: usize,

    /// Sessions obtainable without exhausting the pool
    /// (`idle + remaining capacity`).
    pub available: usize,

    /// Checked-out share of capacity, 0.0 to 1.0.
    pub utilization: f64,
}

impl PoolMetrics {
    pub(crate) fn new(capacity: usize, used: usize, idle: usize, dead: usize) -> Self {
        let allocated = used + idle;
        let utilization = if capacity > 0 {
            used as f64 / capacity as f64
        } else {
            0.0
        };

        Self {
            capacity,
            used,
            idle,
            dead,
            allocated,
            available: idle + capacity.saturating_sub(allocated),
            utilization,
        }
    }

    /// Export the snapshot as a flat string map.
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        metrics.insert("used".to_string(), self.used.to_string());
        metrics.insert("idle".to_string(), self.idle.to_string());
        metrics.insert("dead".to_string(), self.dead.to_string());
        metrics.insert("allocated".to_string(), self.allocated.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Renders [`PoolMetrics`] in Prometheus exposition format.
pub struct MetricsExporter;

impl MetricsExporter {
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        output.push_str("# HELP sessionpool_sessions_used Sessions currently checked out\n");
        output.push_str("# TYPE sessionpool_sessions_used gauge\n");
        output.push_str(&format!("sessionpool_sessions_used{{{}}} {}\n", labels, metrics.used));

        output.push_str("# HELP sessionpool_sessions_idle Idle sessions available for reuse\n");
        output.push_str("# TYPE sessionpool_sessions_idle gauge\n");
        output.push_str(&format!("sessionpool_sessions_idle{{{}}} {}\n", labels, metrics.idle));

        output.push_str("# HELP sessionpool_sessions_dead Sessions whose connection is down\n");
        output.push_str("# TYPE sessionpool_sessions_dead gauge\n");
        output.push_str(&format!("sessionpool_sessions_dead{{{}}} {}\n", labels, metrics.dead));

        output.push_str("# HELP sessionpool_sessions_allocated Total allocated sessions\n");
        output.push_str("# TYPE sessionpool_sessions_allocated gauge\n");
        output.push_str(&format!("sessionpool_sessions_allocated{{{}}} {}\n", labels, metrics.allocated));

        output.push_str("# HELP sessionpool_sessions_available Idle plus remaining capacity\n");
        output.push_str("# TYPE sessionpool_sessions_available gauge\n");
        output.push_str(&format!("sessionpool_sessions_available{{{}}} {}\n", labels, metrics.available));

        output.push_str("# HELP sessionpool_capacity Maximum sessions the pool will manage\n");
        output.push_str("# TYPE sessionpool_capacity gauge\n");
        output.push_str(&format!("sessionpool_capacity{{{}}} {}\n", labels, metrics.capacity));

        output.push_str("# HELP sessionpool_utilization Checked-out share of capacity\n");
        output.push_str("# TYPE sessionpool_utilization gauge\n");
        output.push_str(&format!("sessionpool_utilization{{{}}} {:.2}\n", labels, metrics.utilization));

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_fields_are_consistent() {
        let metrics = PoolMetrics::new(8, 3, 2, 1);
        assert_eq!(metrics.allocated, 5);
        assert_eq!(metrics.available, 5);
        assert!((metrics.utilization - 0.375).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_capacity_does_not_divide_by_zero() {
        let metrics = PoolMetrics::new(0, 0, 0, 0);
        assert_eq!(metrics.utilization, 0.0);
        assert_eq!(metrics.available, 0);
    }

    #[test]
    fn export_map_contains_every_counter() {
        let exported = PoolMetrics::new(4, 1, 1, 0).export();
        for key in ["capacity", "used", "idle", "dead", "allocated", "available", "utilization"] {
            assert!(exported.contains_key(key), "missing {key}");
        }
        assert_eq!(exported["allocated"], "2");
    }

    #[test]
    fn prometheus_output_carries_name_and_tags() {
        let metrics = PoolMetrics::new(4, 1, 1, 0);
        let mut tags = HashMap::new();
        tags.insert("service".to_string(), "orders".to_string());

        let output = MetricsExporter::export_prometheus(&metrics, "main", Some(&tags));
        assert!(output.contains("sessionpool_sessions_used"));
        assert!(output.contains("pool=\"main\""));
        assert!(output.contains("service=\"orders\""));
    }
}
