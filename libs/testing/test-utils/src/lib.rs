//! Shared test utilities for worker pool testing
//!
//! This crate provides reusable fakes for the pool's capability traits:
//! - `RecordingSource`: acknowledging source that serves fixed-size batches
//!   and records every acknowledged batch
//! - `UnackedSource`: the same source without an acknowledge operation
//! - `RecordingHandler`: handler that counts calls and messages and can be
//!   scripted to fail, skip acknowledgment or stall
//! - `TestDataBuilder`: deterministic test data generation
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::{RecordingHandler, RecordingSource};
//!
//! #[tokio::test]
//! async fn my_pool_test() {
//!     let source = Arc::new(RecordingSource::new(5));
//!     let handler = Arc::new(RecordingHandler::new());
//!
//!     pool.run(source.clone(), handler.clone()).await.unwrap();
//!
//!     assert_eq!(handler.times_called(), 2);
//!     assert_eq!(source.acknowledged_batches().len(), 2);
//! }
//! ```

mod handler;
mod source;

pub use handler::RecordingHandler;
pub use source::{RecordingSource, UnackedSource};

use serde_json::json;
use uuid::Uuid;
use worker_pool::{Batch, Message, Metadata};

/// Build a batch of `count` messages with bodies "message: 0", "message: 1", ...
pub fn numbered_batch(count: usize) -> Batch {
    (0..count)
        .map(|i| Message::with_body(format!("message: {}", i)))
        .collect()
}

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by deriving all data from a seed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_single_round");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic correlation ID for message metadata
    pub fn correlation_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Generate a unique pool name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// let name = builder.pool_name("orders");
    /// assert!(name.starts_with("test-orders-"));
    /// ```
    pub fn pool_name(&self, prefix: &str) -> String {
        format!("test-{}-{}", prefix, self.seed)
    }

    /// A message carrying a body plus seed-derived metadata
    pub fn message(&self, index: usize) -> Message {
        let mut metadata = Metadata::new();
        metadata.insert(
            "correlation_id".to_string(),
            json!(self.correlation_id().to_string()),
        );
        metadata.insert("index".to_string(), json!(index));

        Message::with_body(format!("payload-{}-{}", self.seed, index)).with_metadata(metadata)
    }

    /// `count` messages from [`TestDataBuilder::message`]
    pub fn messages(&self, count: usize) -> Batch {
        (0..count).map(|i| self.message(i)).collect()
    }
}
