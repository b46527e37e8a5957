//! Prometheus metrics for the ring scheduler

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec,
};

/// Ring metrics collection, labelled by ring name
pub struct RingMetrics {
    /// Tasks accepted into the event queue
    pub registered_total: IntCounterVec,

    /// Tasks cancelled through removal
    pub removed_total: IntCounterVec,

    /// Registrations or removals rejected because the queue stayed full
    pub busy_total: IntCounterVec,

    /// Tasks handed to executors
    pub dispatched_total: IntCounterVec,

    /// Executor invocations that reported an error
    pub executor_errors_total: IntCounterVec,

    /// Due groups without a matching executor
    pub missing_executor_total: IntCounterVec,

    /// Tasks rescheduled after a failure
    pub retried_total: IntCounterVec,

    /// Tasks currently scheduled
    pub live_tasks: IntGaugeVec,
}

impl RingMetrics {
    pub fn new() -> Self {
        Self {
            registered_total: register_int_counter_vec!(
                "ring_registered_tasks_total",
                "Total number of tasks accepted for scheduling",
                &["ring"]
            )
            .unwrap(),

            removed_total: register_int_counter_vec!(
                "ring_removed_tasks_total",
                "Total number of tasks cancelled before firing",
                &["ring"]
            )
            .unwrap(),

            busy_total: register_int_counter_vec!(
                "ring_busy_rejections_total",
                "Total number of registrations rejected with a busy queue",
                &["ring"]
            )
            .unwrap(),

            dispatched_total: register_int_counter_vec!(
                "ring_dispatched_tasks_total",
                "Total number of tasks handed to executors",
                &["ring"]
            )
            .unwrap(),

            executor_errors_total: register_int_counter_vec!(
                "ring_executor_errors_total",
                "Total number of executor invocations returning an error",
                &["ring"]
            )
            .unwrap(),

            missing_executor_total: register_int_counter_vec!(
                "ring_missing_executor_total",
                "Total number of due groups without an executor",
                &["ring"]
            )
            .unwrap(),

            retried_total: register_int_counter_vec!(
                "ring_retried_tasks_total",
                "Total number of tasks rescheduled after failure",
                &["ring"]
            )
            .unwrap(),

            live_tasks: register_int_gauge_vec!(
                "ring_live_tasks",
                "Number of tasks currently scheduled",
                &["ring"]
            )
            .unwrap(),
        }
    }
}

impl Default for RingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// Global ring metrics instance
    pub static ref RING_METRICS: RingMetrics = RingMetrics::new();
}

/// Initialize ring metrics (idempotent)
pub fn init_ring_metrics() {
    lazy_static::initialize(&RING_METRICS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_exported() {
        init_ring_metrics();
        RING_METRICS
            .registered_total
            .with_label_values(&["metrics-test"])
            .inc_by(3);

        let families = prometheus::gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "ring_registered_tasks_total")
            .expect("registered counter exported");
        assert!(family
            .get_metric()
            .iter()
            .any(|m| m.get_label().iter().any(|l| l.get_value() == "metrics-test")));
    }
}
