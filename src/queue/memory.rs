//! In-process vote queue backed by a tokio channel.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{Popped, QueueError, VoteQueue};

/// Producer half of a [`MemoryQueue`].
#[derive(Clone, Debug)]
pub struct MemoryQueueSender {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl MemoryQueueSender {
    /// Push a raw payload to the back of the queue.
    pub fn push(&self, payload: impl Into<Vec<u8>>) -> Result<(), QueueError> {
        self.tx.send(payload.into()).map_err(|_| QueueError::Closed)
    }
}

/// Unbounded FIFO queue living inside the process.
///
/// `pop` yields [`Popped::Closed`] once every sender is dropped and the
/// buffer is drained.
#[derive(Debug)]
pub struct MemoryQueue {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryQueue {
    /// Create a queue and its producer handle.
    pub fn new() -> (MemoryQueueSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MemoryQueueSender { tx }, Self { rx })
    }
}

#[async_trait]
impl VoteQueue for MemoryQueue {
    async fn pop(&mut self, wait: Duration) -> Result<Popped, QueueError> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(payload)) => Ok(Popped::Payload(payload)),
            Ok(None) => Ok(Popped::Closed),
            Err(_) => Ok(Popped::Empty),
        }
    }
}
