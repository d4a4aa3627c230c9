//! Fake handler.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use worker_pool::{Batch, HandleOutcome, Message, MessageHandler, PoolError};

/// Handler that records every call.
///
/// Calls are numbered from 0 in arrival order. Calls listed with
/// [`RecordingHandler::failing_on`] return a handle error, every other call
/// returns the configured outcome.
#[derive(Debug)]
pub struct RecordingHandler {
    calls: AtomicUsize,
    messages: AtomicUsize,
    fail_on: HashSet<usize>,
    fail_all: bool,
    outcome: HandleOutcome,
    delay: Option<Duration>,
    batches: Mutex<Vec<Batch>>,
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            messages: AtomicUsize::new(0),
            fail_on: HashSet::new(),
            fail_all: false,
            outcome: HandleOutcome::Acknowledge,
            delay: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Fail the calls with these indexes
    pub fn failing_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.fail_on.extend(calls);
        self
    }

    /// Fail every call
    pub fn always_failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Outcome returned by successful calls
    pub fn with_outcome(mut self, outcome: HandleOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Sleep before finishing each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of handle calls, failed ones included
    pub fn times_called(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages across successfully handled batches
    pub fn messages_handled(&self) -> usize {
        self.messages.load(Ordering::SeqCst)
    }

    /// Every batch the handler was given, failed ones included
    pub fn batches(&self) -> Vec<Batch> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, batch: &[Message]) -> Result<HandleOutcome, PoolError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch.to_vec());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_all || self.fail_on.contains(&call) {
            debug!(call = %call, "Scripted handler failure");
            return Err(PoolError::handle(format!("scripted failure on call {}", call)));
        }

        self.messages.fetch_add(batch.len(), Ordering::SeqCst);
        Ok(self.outcome)
    }

    fn name(&self) -> &'static str {
        "RecordingHandler"
    }
}
