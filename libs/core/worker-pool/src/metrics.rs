//! Prometheus metrics for worker pools
//!
//! Provides observability into round throughput and task failures.

use crate::error::PoolError;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() -> Result<(), PoolError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| PoolError::Metrics(e.to_string()))?;
        info!("Prometheus metrics initialized");
        Ok::<_, PoolError>(handle)
    })?;
    Ok(())
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    prometheus_handle()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Worker pool metrics helper
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Pool name for labeling
    pool_name: String,
}

impl PoolMetrics {
    /// Create new PoolMetrics
    pub fn new(pool_name: impl Into<String>) -> Self {
        Self {
            pool_name: pool_name.into(),
        }
    }

    /// Record a batch being received
    pub fn batch_received(&self, size: usize) {
        counter!(
            "worker_pool_batches_received_total",
            "pool" => self.pool_name.clone()
        )
        .increment(1);

        histogram!(
            "worker_pool_batch_size",
            "pool" => self.pool_name.clone()
        )
        .record(size as f64);
    }

    /// Record a batch being handled successfully
    pub fn batch_handled(&self, messages: usize, duration: Duration) {
        counter!(
            "worker_pool_messages_handled_total",
            "pool" => self.pool_name.clone()
        )
        .increment(messages as u64);

        histogram!(
            "worker_pool_handle_duration_seconds",
            "pool" => self.pool_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a batch being acknowledged
    pub fn batch_acknowledged(&self) {
        counter!(
            "worker_pool_batches_acknowledged_total",
            "pool" => self.pool_name.clone()
        )
        .increment(1);
    }

    /// Record a task step failing (`receive`, `handle` or `acknowledge`)
    pub fn task_failed(&self, step: &'static str) {
        counter!(
            "worker_pool_task_failures_total",
            "pool" => self.pool_name.clone(),
            "step" => step
        )
        .increment(1);
    }

    /// Record a finished round
    pub fn round_completed(&self, duration: Duration) {
        counter!(
            "worker_pool_rounds_total",
            "pool" => self.pool_name.clone()
        )
        .increment(1);

        histogram!(
            "worker_pool_round_duration_seconds",
            "pool" => self.pool_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Update the number of tasks still running in the current round
    pub fn in_flight(&self, tasks: usize) {
        gauge!(
            "worker_pool_in_flight_tasks",
            "pool" => self.pool_name.clone()
        )
        .set(tasks as f64);
    }
}
