//! Pool Runner Service
//!
//! Hosts a `WorkerPool` over an in-process queue.
//!
//! ## Architecture
//!
//! ```text
//! InMemorySource (seeded with RUNNER_SEED_MESSAGES)
//!   ↓ (worker_count concurrent receives per round)
//! WorkerPool
//!   ↓
//! LoggingHandler → acknowledge
//! ```
//!
//! ## Features
//!
//! - Pool settings from `POOL_*` environment variables
//! - Graceful shutdown between rounds on SIGINT/SIGTERM
//! - Health, status and Prometheus endpoints

mod handler;

pub use handler::LoggingHandler;

use axum::Router;
use core_config::server::HealthServerConfig;
use core_config::{ConfigError, Environment, FromEnv, env_parse_or_default};
use eyre::{Result, WrapErr};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info};
use worker_pool::{
    HealthState, InMemorySource, Message, Metadata, PoolConfig, WorkerPool, health_router, metrics,
};

/// Runner settings that are not part of the pool itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum messages per received batch
    pub batch_size: usize,
    /// Messages placed on the queue at startup
    pub seed_messages: usize,
    /// How long an empty receive waits for data (0 = non-blocking)
    pub block_timeout_ms: u64,
}

impl RunnerConfig {
    /// Block timeout for the queue source, `None` when disabled
    pub fn block_timeout(&self) -> Option<Duration> {
        (self.block_timeout_ms > 0).then(|| Duration::from_millis(self.block_timeout_ms))
    }
}

impl FromEnv for RunnerConfig {
    /// Reads `RUNNER_BATCH_SIZE` (default 10), `RUNNER_SEED_MESSAGES`
    /// (default 100) and `RUNNER_BLOCK_TIMEOUT_MS` (default 1000).
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            batch_size: env_parse_or_default("RUNNER_BATCH_SIZE", 10)?,
            seed_messages: env_parse_or_default("RUNNER_SEED_MESSAGES", 100)?,
            block_timeout_ms: env_parse_or_default("RUNNER_BLOCK_TIMEOUT_MS", 1000)?,
        })
    }
}

/// Messages placed on the queue at startup
pub fn seed_messages(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let mut metadata = Metadata::new();
            metadata.insert("sequence".to_string(), json!(i));
            Message::with_body(format!("message: {}", i)).with_metadata(metadata)
        })
        .collect()
}

/// Start the health and metrics HTTP server
///
/// Serves until `shutdown` turns `true`.
async fn start_health_server(
    health_state: HealthState,
    config: HealthServerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let app: Router = health_router(health_state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(address = %addr, "Health server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // A dropped sender also ends the server
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .wrap_err("Health server failed")?;

    info!("Health server stopped");
    Ok(())
}

/// Run the pool runner
///
/// 1. Sets up error reporting and structured logging
/// 2. Loads pool and runner configuration from the environment
/// 3. Seeds the in-process queue
/// 4. Runs the pool until the stop condition or a shutdown signal
///
/// # Errors
///
/// Returns an error if configuration is invalid or the pool aborts.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    metrics::init_metrics().wrap_err("Failed to initialize metrics")?;

    let pool_config = PoolConfig::from_env().wrap_err("Failed to load pool configuration")?;
    let runner_config = RunnerConfig::from_env().wrap_err("Failed to load runner configuration")?;
    let health_config =
        HealthServerConfig::from_env().wrap_err("Failed to load health server configuration")?;

    info!(
        pool = %pool_config.pool_name,
        pool_id = %pool_config.pool_id,
        worker_count = %pool_config.worker_count,
        single_round = %pool_config.single_round,
        failure_policy = %pool_config.failure_policy,
        batch_size = %runner_config.batch_size,
        seed_messages = %runner_config.seed_messages,
        "Pool configuration loaded"
    );

    let pool = WorkerPool::new(pool_config).wrap_err("Invalid pool configuration")?;

    let source = Arc::new(
        InMemorySource::with_messages(
            runner_config.batch_size,
            seed_messages(runner_config.seed_messages),
        )
        .with_block_timeout(runner_config.block_timeout()),
    );
    let handler = Arc::new(LoggingHandler::new());

    // Set up a shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = signal_tx.send(true);
    });

    let health_state = HealthState::new(
        pool.status(),
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        pool.config().pool_name.clone(),
    );
    let health_shutdown = shutdown_rx.clone();
    let health_server = tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_config, health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    let result = pool
        .run_until(source.clone(), handler.clone(), shutdown_rx)
        .await;

    // The pool may stop on its own (single round or fatal error)
    let _ = shutdown_tx.send(true);
    if let Err(e) = health_server.await {
        error!(error = %e, "Health server task failed");
    }

    let report = result.wrap_err("Worker pool aborted")?;

    let remaining = source.len().await;
    info!(
        rounds = %report.rounds,
        batches = %report.batches,
        messages = %report.messages,
        acknowledged_batches = %report.acknowledged_batches,
        failures = %report.failures(),
        remaining = %remaining,
        "Pool runner stopped"
    );
    debug!(metrics = %metrics::render_metrics(), "Final metrics");

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.wrap_err("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_config_defaults() {
        temp_env::with_vars_unset(
            ["RUNNER_BATCH_SIZE", "RUNNER_SEED_MESSAGES", "RUNNER_BLOCK_TIMEOUT_MS"],
            || {
                let config = RunnerConfig::from_env().unwrap();
                assert_eq!(
                    config,
                    RunnerConfig {
                        batch_size: 10,
                        seed_messages: 100,
                        block_timeout_ms: 1000,
                    }
                );
            },
        );
    }

    #[test]
    fn test_runner_config_invalid() {
        temp_env::with_var("RUNNER_BATCH_SIZE", Some("ten"), || {
            assert!(RunnerConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_zero_block_timeout_disables_blocking() {
        let config = RunnerConfig {
            batch_size: 1,
            seed_messages: 0,
            block_timeout_ms: 0,
        };
        assert_eq!(config.block_timeout(), None);

        let config = RunnerConfig {
            block_timeout_ms: 250,
            ..config
        };
        assert_eq!(config.block_timeout(), Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_health_server_stops_on_shutdown() {
        let pool = WorkerPool::new(PoolConfig::new("health_server_test", 1)).unwrap();
        let state = HealthState::new(pool.status(), "pool_runner", "0.0.0", "health_server_test");
        let config = HealthServerConfig::new("127.0.0.1".to_string(), 0);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let server = tokio::spawn(start_health_server(state, config, shutdown_rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!server.is_finished());

        shutdown_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("health server did not stop");

        assert!(result.unwrap().is_ok());
    }

    #[test]
    fn test_seed_messages() {
        let messages = seed_messages(3);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].body(), Some("message: 1"));
        assert_eq!(messages[2].metadata_value("sequence"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_single_round_over_seeded_queue() {
        let source = Arc::new(InMemorySource::with_messages(5, seed_messages(12)));
        let handler = Arc::new(LoggingHandler::new());
        let pool = WorkerPool::new(PoolConfig::new("runner_test", 2).with_single_round(true)).unwrap();

        let report = pool.run(source.clone(), handler.clone()).await.unwrap();

        assert_eq!(report.messages, 10);
        assert_eq!(source.acknowledged_batches(), 2);
        assert_eq!(source.len().await, 2);
        assert_eq!(handler.messages_seen(), 10);
    }
}
