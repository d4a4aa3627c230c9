//! The round-based worker pool.
//!
//! Every round the pool spawns exactly `worker_count` tasks. Each task runs
//! receive → handle → (acknowledge) once and then ends. The round is a
//! barrier: the next round starts only after every task of the current one
//! has finished, however long the slowest task takes.
//!
//! ```text
//! Idle → Dispatching → AwaitingCompletion → RoundComplete ─┬─ single_round / shutdown → return
//!            ▲                                             │
//!            └─────────────────────────────────────────────┘
//! ```

use crate::config::{FailurePolicy, PoolConfig};
use crate::error::PoolError;
use crate::handler::MessageHandler;
use crate::metrics::PoolMetrics;
use crate::source::{AckSource, MessageSource};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Where the pool is inside the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    Dispatching,
    AwaitingCompletion,
    RoundComplete,
}

impl RoundState {
    fn as_u8(self) -> u8 {
        match self {
            RoundState::Idle => 0,
            RoundState::Dispatching => 1,
            RoundState::AwaitingCompletion => 2,
            RoundState::RoundComplete => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => RoundState::Dispatching,
            2 => RoundState::AwaitingCompletion,
            3 => RoundState::RoundComplete,
            _ => RoundState::Idle,
        }
    }
}

/// Live view of a pool, shared with health endpoints.
#[derive(Debug, Default)]
pub struct PoolStatus {
    running: AtomicBool,
    rounds_completed: AtomicU64,
    state: AtomicU8,
}

impl PoolStatus {
    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Rounds finished since the pool was created
    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed.load(Ordering::SeqCst)
    }

    /// Current round state
    pub fn state(&self) -> RoundState {
        RoundState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: RoundState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

/// Result of one worker task
#[derive(Debug)]
pub struct TaskReport {
    /// Index of the task within its round
    pub worker: usize,
    /// Size of the received batch (0 if receive failed)
    pub batch_size: usize,
    /// Whether the handler finished without error
    pub handled: bool,
    /// Whether the batch was acknowledged
    pub acknowledged: bool,
    /// The first failure the task hit
    pub failure: Option<PoolError>,
}

impl TaskReport {
    fn new(worker: usize) -> Self {
        Self {
            worker,
            batch_size: 0,
            handled: false,
            acknowledged: false,
            failure: None,
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Rounds that ran to completion
    pub rounds: u64,
    /// Batches handed to the handler
    pub batches: usize,
    /// Messages in batches handled successfully
    pub messages: usize,
    /// Batches acknowledged back to the source
    pub acknowledged_batches: usize,
    pub receive_failures: usize,
    pub handle_failures: usize,
    pub ack_failures: usize,
}

impl RunReport {
    fn absorb(&mut self, task: &TaskReport) {
        match &task.failure {
            Some(PoolError::Receive(_)) => self.receive_failures += 1,
            Some(PoolError::Handle(_)) => self.handle_failures += 1,
            Some(PoolError::Acknowledge(_)) => self.ack_failures += 1,
            _ => {}
        }

        let received = !matches!(task.failure, Some(PoolError::Receive(_)));
        if received {
            self.batches += 1;
        }
        if task.handled {
            self.messages += task.batch_size;
        }
        if task.acknowledged {
            self.acknowledged_batches += 1;
        }
    }

    /// Failures of any step
    pub fn failures(&self) -> usize {
        self.receive_failures + self.handle_failures + self.ack_failures
    }
}

/// Fixed-size pool that runs fetch-handle-acknowledge cycles in rounds.
///
/// # Variants
///
/// - [`WorkerPool::run`] drives an [`AckSource`]. `FailurePolicy::Strict`
///   turns any task failure into an error returned after the round barrier;
///   `FailurePolicy::BestEffort` keeps failures inside their task.
/// - [`WorkerPool::run_unacknowledged`] drives a plain [`MessageSource`]. The
///   handler's result is the only completion signal and no acknowledgment
///   is ever sent.
///
/// # Example
///
/// ```rust,ignore
/// use worker_pool::{InMemorySource, PoolConfig, WorkerPool};
///
/// let config = PoolConfig::new("orders", 4).with_single_round(true);
/// let pool = WorkerPool::new(config)?;
/// let report = pool.run(Arc::new(source), Arc::new(handler)).await?;
/// ```
pub struct WorkerPool {
    config: PoolConfig,
    metrics: PoolMetrics,
    status: Arc<PoolStatus>,
}

impl WorkerPool {
    /// Create a new pool, validating the configuration.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let metrics = PoolMetrics::new(config.pool_name.clone());

        Ok(Self {
            config,
            metrics,
            status: Arc::new(PoolStatus::default()),
        })
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get a handle to the live status, e.g. for health checks.
    pub fn status(&self) -> Arc<PoolStatus> {
        Arc::clone(&self.status)
    }

    /// Run with an acknowledging source until the stop condition is met.
    ///
    /// With `single_round = false` this only returns on a fatal error.
    pub async fn run<S, H>(&self, source: Arc<S>, handler: Arc<H>) -> Result<RunReport, PoolError>
    where
        S: AckSource + ?Sized + 'static,
        H: MessageHandler + ?Sized + 'static,
    {
        self.run_acknowledged(source, handler, None).await
    }

    /// Like [`WorkerPool::run`], but also stops once `shutdown` turns `true`.
    ///
    /// The signal is checked between rounds, so a started round always
    /// finishes.
    pub async fn run_until<S, H>(
        &self,
        source: Arc<S>,
        handler: Arc<H>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunReport, PoolError>
    where
        S: AckSource + ?Sized + 'static,
        H: MessageHandler + ?Sized + 'static,
    {
        self.run_acknowledged(source, handler, Some(shutdown)).await
    }

    /// Run with a source that has no acknowledge operation.
    pub async fn run_unacknowledged<S, H>(
        &self,
        source: Arc<S>,
        handler: Arc<H>,
    ) -> Result<RunReport, PoolError>
    where
        S: MessageSource + ?Sized + 'static,
        H: MessageHandler + ?Sized + 'static,
    {
        self.run_handler_decides(source, handler, None).await
    }

    /// Like [`WorkerPool::run_unacknowledged`], but also stops once `shutdown` turns `true`.
    pub async fn run_unacknowledged_until<S, H>(
        &self,
        source: Arc<S>,
        handler: Arc<H>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunReport, PoolError>
    where
        S: MessageSource + ?Sized + 'static,
        H: MessageHandler + ?Sized + 'static,
    {
        self.run_handler_decides(source, handler, Some(shutdown)).await
    }

    async fn run_acknowledged<S, H>(
        &self,
        source: Arc<S>,
        handler: Arc<H>,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> Result<RunReport, PoolError>
    where
        S: AckSource + ?Sized + 'static,
        H: MessageHandler + ?Sized + 'static,
    {
        let policy = self.config.failure_policy;
        info!(
            pool = %self.config.pool_name,
            pool_id = %self.config.pool_id,
            source = %source.name(),
            handler = %handler.name(),
            worker_count = %self.config.worker_count,
            single_round = %self.config.single_round,
            failure_policy = %policy,
            "Starting worker pool"
        );

        let metrics = self.metrics.clone();
        let task = move |worker: usize| {
            let source = Arc::clone(&source);
            let handler = Arc::clone(&handler);
            let metrics = metrics.clone();
            async move { process_acknowledged(worker, source, handler, policy, metrics).await }
        };

        self.run_rounds(policy == FailurePolicy::Strict, shutdown, task)
            .await
    }

    async fn run_handler_decides<S, H>(
        &self,
        source: Arc<S>,
        handler: Arc<H>,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> Result<RunReport, PoolError>
    where
        S: MessageSource + ?Sized + 'static,
        H: MessageHandler + ?Sized + 'static,
    {
        info!(
            pool = %self.config.pool_name,
            pool_id = %self.config.pool_id,
            source = %source.name(),
            handler = %handler.name(),
            worker_count = %self.config.worker_count,
            single_round = %self.config.single_round,
            "Starting worker pool (handler decides completion)"
        );

        let metrics = self.metrics.clone();
        let task = move |worker: usize| {
            let source = Arc::clone(&source);
            let handler = Arc::clone(&handler);
            let metrics = metrics.clone();
            async move { process_unacknowledged(worker, source, handler, metrics).await }
        };

        self.run_rounds(false, shutdown, task).await
    }

    /// Loop over rounds until single_round, shutdown or a fatal error.
    async fn run_rounds<F, Fut>(
        &self,
        fail_fast: bool,
        shutdown: Option<watch::Receiver<bool>>,
        task: F,
    ) -> Result<RunReport, PoolError>
    where
        F: Fn(usize) -> Fut,
        Fut: Future<Output = TaskReport> + Send + 'static,
    {
        let mut report = RunReport::default();
        let mut round: u64 = 0;
        self.status.set_running(true);

        let result = loop {
            if shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
                info!(pool = %self.config.pool_name, "Received shutdown signal, stopping pool");
                break Ok(());
            }

            round += 1;
            if let Err(e) = self.run_round(round, fail_fast, &task, &mut report).await {
                break Err(e);
            }

            if self.config.single_round {
                debug!(pool = %self.config.pool_name, "Single round finished, stopping pool");
                break Ok(());
            }
        };

        self.status.set_running(false);
        self.status.set_state(RoundState::Idle);

        match result {
            Ok(()) => {
                info!(
                    pool = %self.config.pool_name,
                    rounds = %report.rounds,
                    batches = %report.batches,
                    messages = %report.messages,
                    failures = %report.failures(),
                    "Worker pool stopped"
                );
                Ok(report)
            }
            Err(e) => {
                error!(
                    pool = %self.config.pool_name,
                    round = %round,
                    error = %e,
                    "Worker pool aborted"
                );
                Err(e)
            }
        }
    }

    /// Dispatch one round and wait for every task of it.
    async fn run_round<F, Fut>(
        &self,
        round: u64,
        fail_fast: bool,
        task: &F,
        report: &mut RunReport,
    ) -> Result<(), PoolError>
    where
        F: Fn(usize) -> Fut,
        Fut: Future<Output = TaskReport> + Send + 'static,
    {
        let started = Instant::now();
        let worker_count = self.config.worker_count;

        self.status.set_state(RoundState::Dispatching);
        let mut join_set: JoinSet<TaskReport> = JoinSet::new();
        for worker in 0..worker_count {
            join_set.spawn(task(worker));
        }
        debug!(pool = %self.config.pool_name, round = %round, tasks = %worker_count, "Round dispatched");

        // Barrier: collect every task, even after one has failed
        self.status.set_state(RoundState::AwaitingCompletion);
        let mut remaining = worker_count;
        self.metrics.in_flight(remaining);

        let mut failed: Vec<PoolError> = Vec::new();
        let mut panicked: Option<PoolError> = None;

        while let Some(joined) = join_set.join_next().await {
            remaining -= 1;
            self.metrics.in_flight(remaining);

            match joined {
                Ok(mut task_report) => {
                    report.absorb(&task_report);
                    if let Some(failure) = task_report.failure.take() {
                        failed.push(failure);
                    }
                }
                Err(e) => {
                    error!(pool = %self.config.pool_name, round = %round, error = %e, "Worker task panicked");
                    if panicked.is_none() {
                        panicked = Some(PoolError::from(e));
                    }
                }
            }
        }

        self.status.set_state(RoundState::RoundComplete);
        let elapsed = started.elapsed();

        if let Some(e) = panicked {
            return Err(e);
        }

        if fail_fast && !failed.is_empty() {
            let failures = failed.len();
            let first = failed.swap_remove(0);
            return Err(PoolError::RoundFailed {
                round,
                failures,
                first: Box::new(first),
            });
        }

        report.rounds += 1;
        self.status.rounds_completed.fetch_add(1, Ordering::SeqCst);
        self.metrics.round_completed(elapsed);

        debug!(
            pool = %self.config.pool_name,
            round = %round,
            failures = %failed.len(),
            duration_ms = %elapsed.as_millis(),
            "Round complete"
        );

        Ok(())
    }
}

/// One receive → handle → acknowledge cycle.
async fn process_acknowledged<S, H>(
    worker: usize,
    source: Arc<S>,
    handler: Arc<H>,
    policy: FailurePolicy,
    metrics: PoolMetrics,
) -> TaskReport
where
    S: AckSource + ?Sized,
    H: MessageHandler + ?Sized,
{
    let mut report = TaskReport::new(worker);

    let batch = match source.receive().await {
        Ok(batch) => batch,
        Err(e) => {
            metrics.task_failed(e.kind());
            log_task_failure(worker, &e, policy);
            report.failure = Some(e);
            return report;
        }
    };
    report.batch_size = batch.len();
    metrics.batch_received(batch.len());

    let start = Instant::now();
    let outcome = match handler.handle(&batch).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // A failed batch is never acknowledged
            metrics.task_failed(e.kind());
            log_task_failure(worker, &e, policy);
            report.failure = Some(e);
            return report;
        }
    };
    report.handled = true;
    metrics.batch_handled(batch.len(), start.elapsed());

    if !outcome.should_acknowledge() {
        debug!(worker = %worker, batch_size = %batch.len(), "Handler skipped acknowledgment");
        return report;
    }

    match source.acknowledge(&batch).await {
        Ok(()) => {
            report.acknowledged = true;
            metrics.batch_acknowledged();
            debug!(worker = %worker, batch_size = %batch.len(), "Batch acknowledged");
        }
        Err(e) => {
            metrics.task_failed(e.kind());
            log_task_failure(worker, &e, policy);
            report.failure = Some(e);
        }
    }

    report
}

/// One receive → handle cycle where the handler owns completion.
async fn process_unacknowledged<S, H>(
    worker: usize,
    source: Arc<S>,
    handler: Arc<H>,
    metrics: PoolMetrics,
) -> TaskReport
where
    S: MessageSource + ?Sized,
    H: MessageHandler + ?Sized,
{
    let mut report = TaskReport::new(worker);

    let batch = match source.receive().await {
        Ok(batch) => batch,
        Err(e) => {
            metrics.task_failed(e.kind());
            warn!(worker = %worker, error = %e, "Receive failed");
            report.failure = Some(e);
            return report;
        }
    };
    report.batch_size = batch.len();
    metrics.batch_received(batch.len());

    let start = Instant::now();
    match handler.handle(&batch).await {
        Ok(outcome) => {
            report.handled = true;
            metrics.batch_handled(batch.len(), start.elapsed());
            debug!(worker = %worker, batch_size = %batch.len(), outcome = ?outcome, "Batch handled");
        }
        Err(e) => {
            metrics.task_failed(e.kind());
            warn!(worker = %worker, batch_size = %batch.len(), error = %e, "Handler reported failure");
            report.failure = Some(e);
        }
    }

    report
}

fn log_task_failure(worker: usize, error: &PoolError, policy: FailurePolicy) {
    if error.is_fatal_in(policy) {
        error!(
            worker = %worker,
            step = %error.kind(),
            error = %error,
            "Task failed, pool will stop after this round"
        );
    } else {
        warn!(
            worker = %worker,
            step = %error.kind(),
            error = %error,
            "Task failed, continuing"
        );
    }
}
