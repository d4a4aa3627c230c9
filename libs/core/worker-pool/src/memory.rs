//! In-process queue source
//!
//! A `VecDeque` behind an async mutex. Each `receive` pops up to
//! `batch_size` messages under the lock, so concurrent receivers never see
//! the same message.
//!
//! With a block timeout set, `receive` on an empty queue waits for new
//! messages up to that timeout before returning an empty batch.

use crate::error::PoolError;
use crate::message::{Batch, Message};
use crate::source::{AckSource, MessageSource};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// Queue-backed source with acknowledgment bookkeeping
#[derive(Debug)]
pub struct InMemorySource {
    queue: Mutex<VecDeque<Message>>,
    notify: Notify,
    batch_size: usize,
    block_timeout: Option<Duration>,
    acknowledged_batches: AtomicUsize,
    acknowledged_messages: AtomicUsize,
}

impl InMemorySource {
    /// Create an empty source handing out at most `batch_size` messages per receive
    pub fn new(batch_size: usize) -> Self {
        Self::with_messages(batch_size, Vec::new())
    }

    /// Create a source pre-filled with messages
    pub fn with_messages(batch_size: usize, messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            queue: Mutex::new(messages.into_iter().collect()),
            notify: Notify::new(),
            batch_size: batch_size.max(1),
            block_timeout: None,
            acknowledged_batches: AtomicUsize::new(0),
            acknowledged_messages: AtomicUsize::new(0),
        }
    }

    /// Wait up to `timeout` for messages when the queue is empty (None = non-blocking)
    pub fn with_block_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.block_timeout = timeout;
        self
    }

    /// Maximum messages per batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Enqueue a single message
    pub async fn push(&self, message: Message) {
        self.queue.lock().await.push_back(message);
        self.notify.notify_waiters();
    }

    /// Enqueue many messages
    pub async fn extend(&self, messages: impl IntoIterator<Item = Message>) {
        self.queue.lock().await.extend(messages);
        self.notify.notify_waiters();
    }

    fn take_batch(&self, queue: &mut VecDeque<Message>) -> Batch {
        let take = self.batch_size.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Messages still waiting to be received
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Number of acknowledged batches
    pub fn acknowledged_batches(&self) -> usize {
        self.acknowledged_batches.load(Ordering::SeqCst)
    }

    /// Number of messages across all acknowledged batches
    pub fn acknowledged_messages(&self) -> usize {
        self.acknowledged_messages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn receive(&self) -> Result<Batch, PoolError> {
        let mut queue = self.queue.lock().await;

        if queue.is_empty() {
            if let Some(timeout) = self.block_timeout {
                // Register before releasing the lock so a concurrent push can't be missed
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                drop(queue);

                if tokio::time::timeout(timeout, notified).await.is_err() {
                    debug!(timeout_ms = %timeout.as_millis(), "Block timeout, no messages");
                    return Ok(Vec::new());
                }
                queue = self.queue.lock().await;
            }
        }

        let batch = self.take_batch(&mut queue);
        debug!(
            batch_size = batch.len(),
            remaining = queue.len(),
            "Received batch from memory queue"
        );
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "InMemorySource"
    }
}

#[async_trait]
impl AckSource for InMemorySource {
    async fn acknowledge(&self, batch: &[Message]) -> Result<(), PoolError> {
        self.acknowledged_batches.fetch_add(1, Ordering::SeqCst);
        self.acknowledged_messages
            .fetch_add(batch.len(), Ordering::SeqCst);

        debug!(batch_size = batch.len(), "Acknowledged batch");
        Ok(())
    }
}
