//! SQLite backend.
//!
//! Used for local runs without a database server and as the store
//! behind the test suite. Resetting the schema drops and recreates the
//! `votes` table inside the database file.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;

use super::schema::{CREATE_VOTES_TABLE, DROP_VOTES_TABLE};
use super::{StoreError, VoteStore};
use crate::retry::{retry_forever, RetryAborted};

/// Single SQLite connection holding the `votes` table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Connect(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open the database file, retrying every `delay` until it succeeds.
    pub async fn connect_with_retry(
        path: &Path,
        delay: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Self, RetryAborted> {
        let path: PathBuf = path.to_path_buf();
        retry_forever("sqlite", delay, shutdown, || {
            let result = Self::open(&path);
            async move { result }
        })
        .await
    }
}

#[async_trait]
impl VoteStore for SqliteStore {
    async fn reset_schema(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute(DROP_VOTES_TABLE, [])
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        self.conn
            .execute(CREATE_VOTES_TABLE, [])
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        tracing::debug!("Recreated votes table");
        Ok(())
    }

    async fn insert_vote(&mut self, voter_id: &str, vote: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO votes (id, vote) VALUES (?1, ?2)",
            params![voter_id, vote],
        )?;
        Ok(())
    }

    async fn update_vote(&mut self, voter_id: &str, vote: &str) -> Result<u64, StoreError> {
        let changed = self.conn.execute(
            "UPDATE votes SET vote = ?1 WHERE id = ?2",
            params![vote, voter_id],
        )?;
        Ok(changed as u64)
    }

    async fn get_vote(&mut self, voter_id: &str) -> Result<Option<String>, StoreError> {
        let vote = self
            .conn
            .query_row(
                "SELECT vote FROM votes WHERE id = ?1",
                params![voter_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(vote)
    }

    async fn count_votes(&mut self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM votes", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
