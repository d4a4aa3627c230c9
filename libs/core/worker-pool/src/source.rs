//! Source capability traits.
//!
//! This module provides:
//! - `MessageSource` for transports that hand out batches
//! - `AckSource` for transports that can also commit a processed batch
//!
//! A source that only implements `MessageSource` can only be driven by
//! `WorkerPool::run_unacknowledged`.

use crate::error::PoolError;
use crate::message::{Batch, Message};
use async_trait::async_trait;

/// Trait for message transports.
///
/// Implementations must be safe to call from many worker tasks at once and
/// must not hand the same message to two concurrent `receive` calls.
///
/// # Example
///
/// ```rust,ignore
/// use worker_pool::{Batch, MessageSource, PoolError};
///
/// struct QueueSource {
///     client: QueueClient,
/// }
///
/// #[async_trait]
/// impl MessageSource for QueueSource {
///     async fn receive(&self) -> Result<Batch, PoolError> {
///         self.client
///             .pull(10)
///             .await
///             .map_err(|e| PoolError::receive(e.to_string()))
///     }
///
///     fn name(&self) -> &'static str {
///         "QueueSource"
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch the next batch. An empty batch is valid.
    ///
    /// May wait for data before returning.
    async fn receive(&self) -> Result<Batch, PoolError>;

    /// Get the source name for logging.
    fn name(&self) -> &'static str;
}

/// Trait for transports that support acknowledging a processed batch.
#[async_trait]
pub trait AckSource: MessageSource {
    /// Commit that `batch` was processed.
    ///
    /// Called at most once per batch, only after a successful handle, with
    /// exactly the messages that were handed to the handler.
    async fn acknowledge(&self, batch: &[Message]) -> Result<(), PoolError>;
}
