//! Worker Pool
//!
//! A fixed-size, round-based worker pool that pulls batches of messages
//! from a pluggable source and hands them to a pluggable handler.
//!
//! ## Features
//!
//! - **Rounds**: `worker_count` concurrent tasks per round, joined as a barrier
//! - **Capability traits**: `MessageSource`, `AckSource` and `MessageHandler`
//! - **Failure policies**: strict (abort the run) or best-effort (isolate the task)
//! - **Handler-decides mode**: sources without acknowledgment
//! - **Prometheus metrics** and **health endpoints**
//!
//! ## Example
//!
//! ```ignore
//! use worker_pool::{HandleOutcome, InMemorySource, Message, MessageHandler, PoolConfig, WorkerPool};
//!
//! struct PrintHandler;
//!
//! #[async_trait]
//! impl MessageHandler for PrintHandler {
//!     async fn handle(&self, batch: &[Message]) -> Result<HandleOutcome, PoolError> {
//!         for message in batch {
//!             println!("{:?}", message.body());
//!         }
//!         Ok(HandleOutcome::Acknowledge)
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "PrintHandler"
//!     }
//! }
//!
//! let source = InMemorySource::with_messages(5, messages);
//! let config = PoolConfig::new("printer", 2).with_single_round(true);
//! let pool = WorkerPool::new(config)?;
//! let report = pool.run(Arc::new(source), Arc::new(PrintHandler)).await?;
//! ```

mod config;
mod error;
mod handler;
mod health;
mod memory;
mod message;
pub mod metrics;
mod pool;
mod source;

// Re-export main types
pub use config::{FailurePolicy, PoolConfig};
pub use error::PoolError;
pub use handler::{HandleOutcome, MessageHandler};
pub use health::{health_router, HealthState};
pub use memory::InMemorySource;
pub use message::{Batch, Message, Metadata};
pub use self::metrics::{init_metrics, PoolMetrics};
pub use pool::{PoolStatus, RoundState, RunReport, TaskReport, WorkerPool};
pub use source::{AckSource, MessageSource};
