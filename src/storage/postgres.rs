//! PostgreSQL backend.
//!
//! Startup is destructive: the relay connects to the maintenance
//! database, drops and recreates the votes database, then holds a single
//! connection to the new database for the rest of the process.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use std::time::Duration;
use tokio::sync::watch;

use super::schema::{quote_identifier, CREATE_VOTES_TABLE, DROP_VOTES_TABLE};
use super::{StoreError, VoteStore};
use crate::config::Config;
use crate::retry::{retry_forever, RetryAborted};

/// Database every PostgreSQL server has, used to (re)create the votes database.
const MAINTENANCE_DATABASE: &str = "postgres";

/// Single PostgreSQL connection holding the `votes` table.
pub struct PostgresStore {
    conn: PgConnection,
}

impl PostgresStore {
    /// Server connection options from the relay configuration, without a database.
    pub fn options(config: &Config) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_user)
            .password(&config.db_password)
    }

    /// Open one connection to `database`.
    pub async fn connect(options: &PgConnectOptions, database: &str) -> Result<Self, StoreError> {
        let options = options.clone().database(database);
        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Connect to `database`, retrying every `delay` until the server answers.
    pub async fn connect_with_retry(
        options: &PgConnectOptions,
        database: &str,
        delay: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Self, RetryAborted> {
        retry_forever("postgres", delay, shutdown, || Self::connect(options, database)).await
    }

    /// Connect to the maintenance database, which always exists.
    pub async fn connect_admin_with_retry(
        options: &PgConnectOptions,
        delay: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Self, RetryAborted> {
        Self::connect_with_retry(options, MAINTENANCE_DATABASE, delay, shutdown).await
    }

    /// Close the connection, sending a clean terminate to the server.
    pub async fn close(self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "Error closing database connection");
        }
    }

    /// Drop `database` if it exists and create it empty.
    pub async fn recreate_database(&mut self, database: &str) -> Result<(), StoreError> {
        let name = quote_identifier(database);

        self.conn
            .execute(format!("DROP DATABASE IF EXISTS {name}").as_str())
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        self.conn
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;

        tracing::info!(database, "Recreated votes database");
        Ok(())
    }
}

#[async_trait]
impl VoteStore for PostgresStore {
    async fn reset_schema(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute(DROP_VOTES_TABLE)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        self.conn
            .execute(CREATE_VOTES_TABLE)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        tracing::debug!("Recreated votes table");
        Ok(())
    }

    async fn insert_vote(&mut self, voter_id: &str, vote: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO votes (id, vote) VALUES ($1, $2)")
            .bind(voter_id)
            .bind(vote)
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn update_vote(&mut self, voter_id: &str, vote: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE votes SET vote = $1 WHERE id = $2")
            .bind(vote)
            .bind(voter_id)
            .execute(&mut self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_vote(&mut self, voter_id: &str) -> Result<Option<String>, StoreError> {
        let vote = sqlx::query_scalar::<_, String>("SELECT vote FROM votes WHERE id = $1")
            .bind(voter_id)
            .fetch_optional(&mut self.conn)
            .await?;
        Ok(vote)
    }

    async fn count_votes(&mut self) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(count as u64)
    }
}
