//! Health check handlers for worker pools.
//!
//! This module provides reusable Axum handlers for:
//! - Liveness probes (`/health`, `/healthz`)
//! - Readiness probes (`/ready`, `/readyz`)
//! - Pool monitoring (`/pool/status`)
//! - Prometheus metrics (`/metrics`)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::metrics;
use crate::pool::{PoolStatus, RoundState};

/// Shared state for health endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Live pool status.
    pub status: Arc<PoolStatus>,
    /// Application name.
    pub app_name: String,
    /// Application version.
    pub app_version: String,
    /// Pool name for monitoring.
    pub pool_name: String,
}

impl HealthState {
    /// Create a new health state.
    pub fn new(
        status: Arc<PoolStatus>,
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        pool_name: impl Into<String>,
    ) -> Self {
        Self {
            status,
            app_name: app_name.into(),
            app_version: app_version.into(),
            pool_name: pool_name.into(),
        }
    }
}

/// Health response for liveness probes.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status (always "healthy" if responding).
    pub status: String,
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
}

/// Liveness probe handler.
///
/// Always returns OK if the server is running.
pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        name: state.app_name,
        version: state.app_version,
    })
}

/// Readiness probe handler.
///
/// Ready while the pool is inside a run.
pub async fn ready_handler(
    State(state): State<HealthState>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if state.status.is_running() {
        Ok((
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": { "pool": "running" }
            })),
        ))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "pool": "stopped" }
            })),
        ))
    }
}

fn state_label(state: RoundState) -> &'static str {
    match state {
        RoundState::Idle => "idle",
        RoundState::Dispatching => "dispatching",
        RoundState::AwaitingCompletion => "awaiting_completion",
        RoundState::RoundComplete => "round_complete",
    }
}

/// Pool status handler for monitoring.
pub async fn pool_status_handler(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({
        "pool": state.pool_name,
        "running": state.status.is_running(),
        "rounds_completed": state.status.rounds_completed(),
        "state": state_label(state.status.state()),
    }))
}

/// Prometheus metrics endpoint handler.
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::prometheus_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Metrics not initialized. Call metrics::init_metrics() at startup.".to_string(),
        )
            .into_response(),
    }
}

/// Create a router with the health, status and metrics endpoints.
pub fn health_router(state: HealthState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/pool/status", get(pool_status_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> HealthState {
        state_with(Arc::new(PoolStatus::default()))
    }

    fn state_with(status: Arc<PoolStatus>) -> HealthState {
        HealthState::new(
            status,
            "pool-runner",
            "1.0.0",
            "test_pool",
        )
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            name: "pool-runner".to_string(),
            version: "1.0.0".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"name\":\"pool-runner\""));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = health_router(state())
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_ready_when_pool_stopped() {
        let response = health_router(state())
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_pool_status_endpoint() {
        let response = health_router(state())
            .oneshot(Request::get("/pool/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["pool"], "test_pool");
        assert_eq!(value["running"], false);
        assert_eq!(value["rounds_completed"], 0);
        assert_eq!(value["state"], "idle");
    }

    #[tokio::test]
    async fn test_ready_while_pool_running() {
        let status = Arc::new(PoolStatus::default());
        status.set_running(true);

        let response = health_router(state_with(Arc::clone(&status)))
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ready");
        assert_eq!(value["checks"]["pool"], "running");
    }

    // Only test in this crate that installs the global recorder
    #[tokio::test]
    async fn test_metrics_endpoint_before_and_after_init() {
        let response = health_router(state())
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        assert!(crate::metrics::init_metrics().is_ok());
        assert!(crate::metrics::init_metrics().is_ok());
        crate::metrics::PoolMetrics::new("health_test").batch_acknowledged();

        let response = health_router(state())
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("worker_pool_batches_acknowledged_total"));
        assert!(text.contains("health_test"));
    }
}
