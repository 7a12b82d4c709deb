//! The vote processing loop.
//!
//! Pops one payload at a time, parses it and upserts it before popping
//! the next. Each pop waits at most one poll interval and always runs to
//! completion; the shutdown flag is checked between pops, so a payload
//! that has been popped is always processed.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::MalformedPolicy;
use crate::message::{MessageError, VoteMessage};
use crate::queue::{Popped, QueueError, VoteQueue};
use crate::storage::{StoreError, UpsertOutcome, VoteStore};

/// Error type that stops the worker loop.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Malformed vote message {payload:?}: {source}")]
    Malformed {
        payload: String,
        #[source]
        source: MessageError,
    },
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Votes written to the store
    pub processed: u64,
    /// Votes from first-time voters
    pub inserted: u64,
    /// Votes that replaced an earlier one
    pub updated: u64,
    /// Payloads dropped under [`MalformedPolicy::Skip`]
    pub skipped: u64,
}

/// Result of handling one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// Vote written to the store
    Stored {
        message: VoteMessage,
        outcome: UpsertOutcome,
    },
    /// Malformed payload dropped under [`MalformedPolicy::Skip`]
    Skipped,
}

/// Longest single wait on the queue before the shutdown flag is rechecked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sequential consumer owning one queue handle and one store handle.
pub struct Worker<Q, S> {
    queue: Q,
    store: S,
    on_malformed: MalformedPolicy,
    poll_interval: Duration,
    stats: WorkerStats,
}

impl<Q: VoteQueue, S: VoteStore> Worker<Q, S> {
    /// Create a worker over already-connected handles.
    pub fn new(queue: Q, store: S, on_malformed: MalformedPolicy) -> Self {
        Self {
            queue,
            store,
            on_malformed,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stats: WorkerStats::default(),
        }
    }

    /// Bound each queue wait, which is also the worst-case shutdown delay.
    ///
    /// Clamped to at least a millisecond: a zero wait means "block forever"
    /// to Redis.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Mutable access to the store, e.g. to inspect results in tests.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Run until shutdown is signalled, the queue closes, or an error occurs.
    pub async fn run(
        &mut self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<WorkerStats, WorkerError> {
        tracing::info!("Watching vote queue");

        while !*shutdown.borrow() {
            match self.queue.pop(self.poll_interval).await? {
                Popped::Payload(payload) => {
                    self.process(&payload).await?;
                }
                Popped::Empty => {}
                Popped::Closed => {
                    tracing::info!("Vote queue closed");
                    break;
                }
            }
        }

        tracing::info!(
            processed = self.stats.processed,
            inserted = self.stats.inserted,
            updated = self.stats.updated,
            skipped = self.stats.skipped,
            "Worker stopped"
        );
        Ok(self.stats)
    }

    /// Parse and store a single raw payload.
    #[tracing::instrument(skip(self, payload))]
    pub async fn process(&mut self, payload: &[u8]) -> Result<Processed, WorkerError> {
        let message = match VoteMessage::from_bytes(payload) {
            Ok(message) => message,
            Err(source) => match self.on_malformed {
                MalformedPolicy::Fail => {
                    return Err(WorkerError::Malformed {
                        payload: String::from_utf8_lossy(payload).into_owned(),
                        source,
                    });
                }
                MalformedPolicy::Skip => {
                    tracing::warn!(
                        payload = %String::from_utf8_lossy(payload),
                        error = %source,
                        "Skipping malformed vote message"
                    );
                    self.stats.skipped += 1;
                    return Ok(Processed::Skipped);
                }
            },
        };

        tracing::info!(
            voter_id = %message.voter_id,
            vote = %message.vote,
            "Processing vote for '{}' by '{}'",
            message.vote,
            message.voter_id
        );

        let outcome = self.store.upsert(&message.voter_id, &message.vote).await?;

        self.stats.processed += 1;
        match outcome {
            UpsertOutcome::Inserted => self.stats.inserted += 1,
            UpsertOutcome::Updated => self.stats.updated += 1,
        }

        Ok(Processed::Stored { message, outcome })
    }
}
