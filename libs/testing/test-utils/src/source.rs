//! Fake sources.

use crate::numbered_batch;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use worker_pool::{AckSource, Batch, Message, MessageSource, PoolError};

/// Acknowledging source that serves a fresh batch of `batch_size`
/// messages on every receive and records what gets acknowledged.
#[derive(Debug, Default)]
pub struct RecordingSource {
    batch_size: usize,
    receives: AtomicUsize,
    fail_receive_on: HashSet<usize>,
    fail_acknowledge: AtomicBool,
    acknowledged: Mutex<Vec<Batch>>,
}

impl RecordingSource {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Fail the receive calls with these indexes (numbered from 0)
    pub fn failing_receive_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.fail_receive_on.extend(calls);
        self
    }

    /// Make every acknowledge call fail
    pub fn failing_acknowledge(self) -> Self {
        self.fail_acknowledge.store(true, Ordering::SeqCst);
        self
    }

    /// Number of receive calls so far
    pub fn receive_count(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    /// Every batch passed to acknowledge, in call order
    pub fn acknowledged_batches(&self) -> Vec<Batch> {
        self.acknowledged
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }

    /// Total messages across acknowledged batches
    pub fn acknowledged_messages(&self) -> usize {
        self.acknowledged_batches().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl MessageSource for RecordingSource {
    async fn receive(&self) -> Result<Batch, PoolError> {
        let call = self.receives.fetch_add(1, Ordering::SeqCst);
        if self.fail_receive_on.contains(&call) {
            return Err(PoolError::receive(format!("receive {} failed", call)));
        }
        Ok(numbered_batch(self.batch_size))
    }

    fn name(&self) -> &'static str {
        "RecordingSource"
    }
}

#[async_trait]
impl AckSource for RecordingSource {
    async fn acknowledge(&self, batch: &[Message]) -> Result<(), PoolError> {
        if self.fail_acknowledge.load(Ordering::SeqCst) {
            return Err(PoolError::acknowledge("acknowledge disabled for test"));
        }

        self.acknowledged
            .lock()
            .map_err(|e| PoolError::acknowledge(e.to_string()))?
            .push(batch.to_vec());
        Ok(())
    }
}

/// Source without an acknowledge operation, for handler-decides runs
#[derive(Debug, Default)]
pub struct UnackedSource {
    batch_size: usize,
    receives: AtomicUsize,
    fail_receive_on: HashSet<usize>,
}

impl UnackedSource {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Fail the receive calls with these indexes (numbered from 0)
    pub fn failing_receive_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.fail_receive_on.extend(calls);
        self
    }

    pub fn receive_count(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for UnackedSource {
    async fn receive(&self) -> Result<Batch, PoolError> {
        let call = self.receives.fetch_add(1, Ordering::SeqCst);
        if self.fail_receive_on.contains(&call) {
            return Err(PoolError::receive(format!("receive {} failed", call)));
        }
        Ok(numbered_batch(self.batch_size))
    }

    fn name(&self) -> &'static str {
        "UnackedSource"
    }
}
