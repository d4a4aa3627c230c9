//! Pool error types
//!
//! Errors are split by the step of a worker task that produced them. Whether
//! an error aborts the whole run depends on the [`FailurePolicy`] in use:
//! - **Strict**: any receive, handle or acknowledge failure ends the run
//! - **BestEffort**: failures stay inside the task that hit them
//!
//! Task panics are always fatal.

use crate::config::FailurePolicy;
use thiserror::Error;

/// Worker pool errors
#[derive(Error, Debug)]
pub enum PoolError {
    /// The source failed to produce a batch
    #[error("Receive error: {0}")]
    Receive(String),

    /// The handler reported a processing failure for a batch
    #[error("Handle error: {0}")]
    Handle(String),

    /// The source failed to commit an acknowledgment
    #[error("Acknowledge error: {0}")]
    Acknowledge(String),

    /// Invalid pool configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics recorder could not be installed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// A worker task panicked or was aborted
    #[error("Worker task panicked: {0}")]
    TaskPanicked(String),

    /// At least one task of a round failed under the strict policy
    #[error("Round {round} failed ({failures} task(s)): {first}")]
    RoundFailed {
        round: u64,
        failures: usize,
        first: Box<PoolError>,
    },
}

impl PoolError {
    /// Create a receive error
    pub fn receive(message: impl Into<String>) -> Self {
        PoolError::Receive(message.into())
    }

    /// Create a handle error
    pub fn handle(message: impl Into<String>) -> Self {
        PoolError::Handle(message.into())
    }

    /// Create an acknowledge error
    pub fn acknowledge(message: impl Into<String>) -> Self {
        PoolError::Acknowledge(message.into())
    }

    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::Receive(_) => "receive",
            PoolError::Handle(_) => "handle",
            PoolError::Acknowledge(_) => "acknowledge",
            PoolError::Config(_) => "config",
            PoolError::Metrics(_) => "metrics",
            PoolError::TaskPanicked(_) => "panic",
            PoolError::RoundFailed { .. } => "round",
        }
    }

    /// Check if this error must stop the pool under the given policy
    pub fn is_fatal_in(&self, policy: FailurePolicy) -> bool {
        match self {
            PoolError::TaskPanicked(_)
            | PoolError::Config(_)
            | PoolError::Metrics(_)
            | PoolError::RoundFailed { .. } => true,
            PoolError::Receive(_) | PoolError::Handle(_) | PoolError::Acknowledge(_) => {
                policy == FailurePolicy::Strict
            }
        }
    }
}

impl From<tokio::task::JoinError> for PoolError {
    fn from(err: tokio::task::JoinError) -> Self {
        PoolError::TaskPanicked(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PoolError::receive("x").kind(), "receive");
        assert_eq!(PoolError::handle("x").kind(), "handle");
        assert_eq!(PoolError::acknowledge("x").kind(), "acknowledge");
        assert_eq!(PoolError::Config("x".into()).kind(), "config");
    }

    #[test]
    fn test_fatality_by_policy() {
        let handle = PoolError::handle("boom");
        assert!(handle.is_fatal_in(FailurePolicy::Strict));
        assert!(!handle.is_fatal_in(FailurePolicy::BestEffort));

        let ack = PoolError::acknowledge("commit lost");
        assert!(ack.is_fatal_in(FailurePolicy::Strict));
        assert!(!ack.is_fatal_in(FailurePolicy::BestEffort));

        let panic = PoolError::TaskPanicked("worker 0".into());
        assert!(panic.is_fatal_in(FailurePolicy::BestEffort));
    }

    #[test]
    fn test_round_failed_display() {
        let err = PoolError::RoundFailed {
            round: 3,
            failures: 2,
            first: Box::new(PoolError::handle("bad batch")),
        };

        let text = err.to_string();
        assert!(text.contains("Round 3"));
        assert!(text.contains("2 task(s)"));
        assert!(text.contains("bad batch"));
    }
}
