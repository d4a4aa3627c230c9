//! Pool configuration
//!
//! This module provides `PoolConfig` for configuring the worker pool.

use crate::error::PoolError;
use core_config::{env_or_default, env_parse_or_default, ConfigError, FromEnv};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// How task failures propagate for sources that support acknowledgment.
///
/// Sources without an acknowledge operation run in the handler-decides mode
/// (`WorkerPool::run_unacknowledged`) and ignore this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any receive, handle or acknowledge failure aborts the whole run
    /// once the current round has finished.
    #[default]
    Strict,
    /// Handle failures skip the acknowledgment, acknowledge failures are
    /// ignored. Sibling tasks and later rounds are unaffected.
    BestEffort,
}

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pool name used in logs and metric labels
    pub pool_name: String,

    /// Unique pool instance ID (auto-generated if not provided)
    pub pool_id: String,

    /// Number of concurrent tasks launched per round
    pub worker_count: usize,

    /// Stop after one round instead of looping forever
    pub single_round: bool,

    /// Failure propagation for acknowledging sources
    pub failure_policy: FailurePolicy,
}

impl PoolConfig {
    /// Create a new PoolConfig with explicit name and worker count
    pub fn new(pool_name: impl Into<String>, worker_count: usize) -> Self {
        Self {
            pool_name: pool_name.into(),
            pool_id: format!("pool-{}", Uuid::new_v4()),
            worker_count,
            single_round: false,
            failure_policy: FailurePolicy::Strict,
        }
    }

    /// Set the pool instance ID
    pub fn with_pool_id(mut self, id: impl Into<String>) -> Self {
        self.pool_id = id.into();
        self
    }

    /// Set the pool name
    pub fn with_pool_name(mut self, name: impl Into<String>) -> Self {
        self.pool_name = name.into();
        self
    }

    /// Set the number of workers per round
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Stop after a single round
    pub fn with_single_round(mut self, single_round: bool) -> Self {
        self.single_round = single_round;
        self
    }

    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Check the configuration before a run
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.worker_count == 0 {
            return Err(PoolError::Config(
                "worker_count must be greater than zero".to_string(),
            ));
        }
        if self.pool_name.trim().is_empty() {
            return Err(PoolError::Config("pool_name must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new("pool", 1)
    }
}

impl FromEnv for PoolConfig {
    /// Reads `POOL_NAME`, `POOL_WORKER_COUNT`, `POOL_SINGLE_ROUND` and
    /// `POOL_FAILURE_POLICY`, all optional.
    fn from_env() -> Result<Self, ConfigError> {
        let pool_name = env_or_default("POOL_NAME", "pool");
        let worker_count: usize = env_parse_or_default("POOL_WORKER_COUNT", 1)?;
        let single_round: bool = env_parse_or_default("POOL_SINGLE_ROUND", false)?;
        let failure_policy: FailurePolicy =
            env_parse_or_default("POOL_FAILURE_POLICY", FailurePolicy::Strict)?;

        Ok(Self::new(pool_name, worker_count)
            .with_single_round(single_round)
            .with_failure_policy(failure_policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let config = PoolConfig::new("orders", 4)
            .with_pool_id("pool-1")
            .with_single_round(true)
            .with_failure_policy(FailurePolicy::BestEffort);

        assert_eq!(config.pool_name, "orders");
        assert_eq!(config.pool_id, "pool-1");
        assert_eq!(config.worker_count, 4);
        assert!(config.single_round);
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
    }

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.pool_name, "pool");
        assert_eq!(config.worker_count, 1);
        assert!(!config.single_round);
        assert_eq!(config.failure_policy, FailurePolicy::Strict);
        assert!(config.pool_id.starts_with("pool-"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = PoolConfig::new("orders", 0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PoolError::Config(_)));
        assert!(err.to_string().contains("worker_count"));
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!(
            "best_effort".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::BestEffort
        );
        assert_eq!(FailurePolicy::Strict.to_string(), "strict");
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars_unset(
            [
                "POOL_NAME",
                "POOL_WORKER_COUNT",
                "POOL_SINGLE_ROUND",
                "POOL_FAILURE_POLICY",
            ],
            || {
                let config = PoolConfig::from_env().unwrap();
                assert_eq!(config.pool_name, "pool");
                assert_eq!(config.worker_count, 1);
                assert!(!config.single_round);
                assert_eq!(config.failure_policy, FailurePolicy::Strict);
            },
        );
    }

    #[test]
    fn test_from_env_values() {
        temp_env::with_vars(
            [
                ("POOL_NAME", Some("ingest")),
                ("POOL_WORKER_COUNT", Some("8")),
                ("POOL_SINGLE_ROUND", Some("true")),
                ("POOL_FAILURE_POLICY", Some("best_effort")),
            ],
            || {
                let config = PoolConfig::from_env().unwrap();
                assert_eq!(config.pool_name, "ingest");
                assert_eq!(config.worker_count, 8);
                assert!(config.single_round);
                assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
            },
        );
    }

    #[test]
    fn test_from_env_invalid_worker_count() {
        temp_env::with_var("POOL_WORKER_COUNT", Some("many"), || {
            let err = PoolConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("POOL_WORKER_COUNT"));
        });
    }
}
