//! Handler capability trait.

use crate::error::PoolError;
use crate::message::Message;
use async_trait::async_trait;

/// What a worker task should do after a batch was handled successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Commit the batch back to the source.
    Acknowledge,
    /// Processing succeeded but the batch must not be acknowledged, e.g.
    /// because the handler committed it itself.
    Skip,
}

impl HandleOutcome {
    pub fn should_acknowledge(&self) -> bool {
        matches!(self, HandleOutcome::Acknowledge)
    }
}

/// Trait for batch processors.
///
/// A batch is processed as one unit. Sources may redeliver a batch after a
/// failure or crash, so handlers must tolerate seeing the same messages
/// again.
///
/// # Example
///
/// ```rust,ignore
/// use worker_pool::{HandleOutcome, Message, MessageHandler, PoolError};
///
/// struct IndexHandler {
///     index: Arc<SearchIndex>,
/// }
///
/// #[async_trait]
/// impl MessageHandler for IndexHandler {
///     async fn handle(&self, batch: &[Message]) -> Result<HandleOutcome, PoolError> {
///         for message in batch {
///             self.index.upsert(message.body().unwrap_or_default()).await
///                 .map_err(|e| PoolError::handle(e.to_string()))?;
///         }
///         Ok(HandleOutcome::Acknowledge)
///     }
///
///     fn name(&self) -> &'static str {
///         "IndexHandler"
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process a whole batch.
    ///
    /// Return `Ok` with the acknowledgment decision on success, `Err` on failure.
    async fn handle(&self, batch: &[Message]) -> Result<HandleOutcome, PoolError>;

    /// Get the handler name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_acknowledgment() {
        assert!(HandleOutcome::Acknowledge.should_acknowledge());
        assert!(!HandleOutcome::Skip.should_acknowledge());
    }
}
