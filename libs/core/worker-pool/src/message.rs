//! Message model
//!
//! A message is a passive carrier: an optional text body plus optional
//! metadata. There is no message ID, so acknowledgment always refers to a
//! whole batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The messages returned by one `receive` call.
///
/// A batch is handled by exactly one worker task and is never split or
/// merged with another batch.
pub type Batch = Vec<Message>;

/// Metadata attached to a message. Keys are unique.
pub type Metadata = HashMap<String, Value>;

/// A message pulled from a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    body: Option<String>,
    metadata: Option<Metadata>,
}

impl Message {
    /// Create a message from its parts
    pub fn new(body: Option<String>, metadata: Option<Metadata>) -> Self {
        Self { body, metadata }
    }

    /// Create a message with a body and no metadata
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            metadata: None,
        }
    }

    /// Create a message with neither body nor metadata
    pub fn empty() -> Self {
        Self::default()
    }

    /// Return a copy of this message carrying the given metadata
    pub fn with_metadata(self, metadata: Metadata) -> Self {
        Self {
            body: self.body,
            metadata: Some(metadata),
        }
    }

    /// The message body, if any
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The metadata map, if any
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Look up a single metadata value
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }

    /// Body length in bytes (0 when there is no body)
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, String::len)
    }
}
