//! Test utilities for VoteRelay integration tests.
//!
//! Provides:
//! - Temporary SQLite database fixtures
//! - A worker wired to an in-memory queue
//! - A scripted Redis server (see [`resp`])
//! - Polling helpers for asynchronous assertions

#![allow(dead_code)]

pub mod resp;

use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use voterelay::config::{Config, MalformedPolicy};
use voterelay::observability::tracing::init_test_tracing;
use voterelay::queue::{MemoryQueue, MemoryQueueSender};
use voterelay::storage::{SqliteStore, VoteStore};
use voterelay::worker::Worker;

/// Test fixture that manages a temporary database directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for test database
    pub temp_dir: TempDir,
    /// Path to the database file
    pub db_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with a temporary database directory.
    pub fn new() -> Self {
        init_test_tracing();
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("votes.db");
        Self { temp_dir, db_path }
    }

    /// Relay configuration pointing at this fixture's SQLite file.
    pub fn config(&self) -> Config {
        Config::test_config(self.db_path.clone())
    }

    /// Open a store on the fixture database with a freshly reset schema.
    pub async fn fresh_store(&self) -> SqliteStore {
        let mut store = SqliteStore::open(&self.db_path).expect("failed to open store");
        store.reset_schema().await.expect("failed to reset schema");
        store
    }

    /// Build a worker over a fresh store and an in-memory queue.
    pub async fn worker(
        &self,
        policy: MalformedPolicy,
    ) -> (MemoryQueueSender, Worker<MemoryQueue, SqliteStore>) {
        let (tx, queue) = MemoryQueue::new();
        let store = self.fresh_store().await;
        let worker = Worker::new(queue, store, policy).with_poll_interval(POLL_INTERVAL);
        (tx, worker)
    }

    /// Read a vote through a separate connection to the fixture database.
    ///
    /// Returns `None` while the row (or the table) does not exist yet.
    pub fn stored_vote(&self, voter_id: &str) -> Option<String> {
        let conn = rusqlite::Connection::open(&self.db_path).ok()?;
        conn.query_row(
            "SELECT vote FROM votes WHERE id = ?1",
            [voter_id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .ok()
        .flatten()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue wait used by test workers, short so shutdown is observed quickly.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Wait for a condition to become true with timeout.
///
/// # Returns
///
/// `true` if condition was met, `false` if timeout expired
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Serialize a vote the way producers push it onto the queue.
pub fn vote_json(voter_id: &str, vote: &str) -> String {
    serde_json::json!({ "voter_id": voter_id, "vote": vote }).to_string()
}
