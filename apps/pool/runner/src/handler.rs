use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use worker_pool::{HandleOutcome, Message, MessageHandler, PoolError};

/// Logs each batch and asks for it to be acknowledged.
///
/// Empty batches are skipped so that idle rounds don't acknowledge nothing.
#[derive(Debug, Default)]
pub struct LoggingHandler {
    messages_seen: AtomicU64,
}

impl LoggingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_seen(&self) -> u64 {
        self.messages_seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, batch: &[Message]) -> Result<HandleOutcome, PoolError> {
        if batch.is_empty() {
            debug!("Empty batch, nothing to do");
            return Ok(HandleOutcome::Skip);
        }

        let bytes: usize = batch.iter().map(Message::body_len).sum();
        let total = self
            .messages_seen
            .fetch_add(batch.len() as u64, Ordering::SeqCst)
            + batch.len() as u64;

        info!(
            batch_size = %batch.len(),
            bytes = %bytes,
            total_messages = %total,
            first = ?batch.first().and_then(Message::body),
            "Handled batch"
        );

        Ok(HandleOutcome::Acknowledge)
    }

    fn name(&self) -> &'static str {
        "LoggingHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_is_skipped() {
        let handler = LoggingHandler::new();

        let outcome = handler.handle(&[]).await.unwrap();

        assert_eq!(outcome, HandleOutcome::Skip);
        assert_eq!(handler.messages_seen(), 0);
    }

    #[tokio::test]
    async fn test_batch_is_acknowledged() {
        let handler = LoggingHandler::new();
        let batch = vec![Message::with_body("a"), Message::with_body("b")];

        let outcome = handler.handle(&batch).await.unwrap();

        assert_eq!(outcome, HandleOutcome::Acknowledge);
        assert_eq!(handler.messages_seen(), 2);
    }
}
