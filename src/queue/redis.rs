//! Redis list consumer.
//!
//! Votes are pushed onto a list by producers and removed here with
//! `BLPOP <key> <seconds>`. The wait is bounded so the worker can look at
//! the shutdown flag between calls without abandoning a request that is
//! still outstanding on the connection.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::watch;

use super::{Popped, QueueError, VoteQueue};
use crate::retry::{retry_forever, RetryAborted};

/// Single Redis connection popping from one list key.
pub struct RedisQueue {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisQueue {
    /// Open one connection and verify it with `PING`.
    pub async fn connect(url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(url).map_err(|e| QueueError::Connect(e.to_string()))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        Ok(Self {
            conn,
            key: key.into(),
        })
    }

    /// Connect, retrying every `delay` until Redis answers.
    pub async fn connect_with_retry(
        url: &str,
        key: &str,
        delay: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Self, RetryAborted> {
        retry_forever("redis", delay, shutdown, || Self::connect(url, key)).await
    }

    /// The list key this queue pops from.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl VoteQueue for RedisQueue {
    async fn pop(&mut self, wait: Duration) -> Result<Popped, QueueError> {
        // BLPOP replies with [key, element], or nil once the wait runs out.
        // Elements stay bytes here; UTF-8 is checked with the JSON.
        let reply: Option<(Vec<u8>, Vec<u8>)> = redis::cmd("BLPOP")
            .arg(&self.key)
            .arg(wait.as_secs_f64())
            .query_async(&mut self.conn)
            .await?;

        Ok(match reply {
            Some((_, payload)) => Popped::Payload(payload),
            None => Popped::Empty,
        })
    }
}
