//! Relational storage for votes.
//!
//! Provides:
//! - The [`VoteStore`] seam the worker writes through
//! - Insert-then-update upsert policy shared by every backend
//! - PostgreSQL and SQLite backends
//! - Schema reset performed on every startup

pub mod postgres;
pub mod schema;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to connect to database: {0}")]
    Connect(String),

    #[error("Schema setup failed: {0}")]
    Schema(String),

    #[error("Failed to store vote for '{voter_id}': insert failed ({insert}), update failed ({update})")]
    Write {
        voter_id: String,
        insert: String,
        update: String,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Which statement ended up storing the vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First vote from this voter
    Inserted,
    /// Existing vote replaced
    Updated,
}

/// A single connection to the `votes` table.
///
/// Methods take `&mut self`: one connection, one writer.
#[async_trait]
pub trait VoteStore: Send {
    /// Drop the `votes` table if present and create it empty.
    async fn reset_schema(&mut self) -> Result<(), StoreError>;

    /// `INSERT` a vote. Fails if the voter already has one.
    async fn insert_vote(&mut self, voter_id: &str, vote: &str) -> Result<(), StoreError>;

    /// `UPDATE` an existing vote, returning the number of rows changed.
    async fn update_vote(&mut self, voter_id: &str, vote: &str) -> Result<u64, StoreError>;

    /// Current vote for a voter, if any.
    async fn get_vote(&mut self, voter_id: &str) -> Result<Option<String>, StoreError>;

    /// Number of rows in the `votes` table.
    async fn count_votes(&mut self) -> Result<u64, StoreError>;

    /// Store a vote, replacing any earlier vote by the same voter.
    ///
    /// Tries the insert first and falls back to an update when it fails.
    /// This is not atomic: a concurrent writer for the same voter can make
    /// both statements fail. An update that matches no row counts as a
    /// failure, since the insert error was then not a duplicate key.
    async fn upsert(&mut self, voter_id: &str, vote: &str) -> Result<UpsertOutcome, StoreError> {
        let insert_err = match self.insert_vote(voter_id, vote).await {
            Ok(()) => return Ok(UpsertOutcome::Inserted),
            Err(e) => e,
        };

        tracing::debug!(voter_id, error = %insert_err, "Insert failed, updating existing vote");

        match self.update_vote(voter_id, vote).await {
            Ok(0) => Err(StoreError::Write {
                voter_id: voter_id.to_string(),
                insert: insert_err.to_string(),
                update: "no existing vote to update".into(),
            }),
            Ok(_) => Ok(UpsertOutcome::Updated),
            Err(update_err) => Err(StoreError::Write {
                voter_id: voter_id.to_string(),
                insert: insert_err.to_string(),
                update: update_err.to_string(),
            }),
        }
    }
}

#[async_trait]
impl<T: VoteStore + ?Sized> VoteStore for Box<T> {
    async fn reset_schema(&mut self) -> Result<(), StoreError> {
        (**self).reset_schema().await
    }

    async fn insert_vote(&mut self, voter_id: &str, vote: &str) -> Result<(), StoreError> {
        (**self).insert_vote(voter_id, vote).await
    }

    async fn update_vote(&mut self, voter_id: &str, vote: &str) -> Result<u64, StoreError> {
        (**self).update_vote(voter_id, vote).await
    }

    async fn get_vote(&mut self, voter_id: &str) -> Result<Option<String>, StoreError> {
        (**self).get_vote(voter_id).await
    }

    async fn count_votes(&mut self) -> Result<u64, StoreError> {
        (**self).count_votes().await
    }

    async fn upsert(&mut self, voter_id: &str, vote: &str) -> Result<UpsertOutcome, StoreError> {
        (**self).upsert(voter_id, vote).await
    }
}
