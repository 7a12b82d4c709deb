//! Vote queue consumers.
//!
//! Provides:
//! - The [`VoteQueue`] seam the worker pops from
//! - A Redis list implementation for production
//! - An in-process channel implementation for tests and embedding

pub mod memory;
pub mod redis;

pub use self::memory::{MemoryQueue, MemoryQueueSender};
pub use self::redis::RedisQueue;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to connect to queue: {0}")]
    Connect(String),

    #[error("Queue command failed: {0}")]
    Command(#[from] ::redis::RedisError),

    #[error("Queue closed")]
    Closed,
}

/// Outcome of one bounded wait on the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popped {
    /// Raw bytes of the next element, not yet validated
    Payload(Vec<u8>),
    /// Nothing arrived within the wait
    Empty,
    /// The queue can never yield another element
    Closed,
}

/// A FIFO source of raw vote payloads.
#[async_trait]
pub trait VoteQueue: Send {
    /// Wait up to `wait` for the next payload.
    ///
    /// Callers must drive the returned future to completion. An element
    /// removed by a call that is dropped midway is lost.
    async fn pop(&mut self, wait: Duration) -> Result<Popped, QueueError>;
}
