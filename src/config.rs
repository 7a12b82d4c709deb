//! Configuration parsing for VoteRelay.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Defaults matching the compose-style hostnames (`redis`, `db`)

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Storage backend the relay writes votes into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// PostgreSQL server reached over the network
    Postgres,
    /// Local SQLite database file
    Sqlite,
}

/// What to do with a queue payload that is not a valid vote.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MalformedPolicy {
    /// Stop the worker with an error
    #[default]
    Fail,
    /// Log the payload and move on to the next message
    Skip,
}

/// VoteRelay: moves vote events from a Redis list into a relational table.
#[derive(Parser, Debug, Clone)]
#[command(name = "voterelay")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Redis host holding the vote queue
    #[arg(long, env = "REDIS_HOST", default_value = "redis")]
    pub redis_host: String,

    /// Redis port
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Name of the Redis list votes are popped from
    #[arg(long, env = "VOTERELAY_QUEUE_KEY", default_value = "votes")]
    pub queue_key: String,

    /// Storage backend
    #[arg(long, env = "VOTERELAY_STORE", value_enum, default_value_t = StoreKind::Postgres)]
    pub store: StoreKind,

    /// Database host
    #[arg(long, env = "DB_HOST", default_value = "db")]
    pub db_host: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database user
    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub db_password: String,

    /// Database that is dropped and recreated on startup
    #[arg(long, env = "DB_NAME", default_value = "Votes")]
    pub db_name: String,

    /// SQLite database file (only used with `--store sqlite`)
    #[arg(long, env = "VOTERELAY_SQLITE_PATH", default_value = "./votes.db")]
    pub sqlite_path: PathBuf,

    /// Delay between connection attempts, in milliseconds
    #[arg(long, env = "VOTERELAY_RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Longest single wait on the queue before checking for shutdown, in milliseconds
    #[arg(long, env = "VOTERELAY_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Handling of payloads that are not valid vote JSON
    #[arg(long, env = "VOTERELAY_ON_MALFORMED", value_enum, default_value_t = MalformedPolicy::Fail)]
    pub on_malformed: MalformedPolicy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Redis connection URL for the queue host.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    /// Fixed delay between connection attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Longest single wait on the queue.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Create a configuration for tests backed by a SQLite file.
    pub fn test_config(sqlite_path: PathBuf) -> Self {
        Self {
            redis_host: "127.0.0.1".into(),
            store: StoreKind::Sqlite,
            sqlite_path,
            retry_delay_ms: 10,
            poll_interval_ms: 20,
            log_level: "debug".into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_host: "redis".into(),
            redis_port: 6379,
            queue_key: "votes".into(),
            store: StoreKind::Postgres,
            db_host: "db".into(),
            db_port: 5432,
            db_user: "postgres".into(),
            db_password: "postgres".into(),
            db_name: "Votes".into(),
            sqlite_path: PathBuf::from("./votes.db"),
            retry_delay_ms: 1000,
            poll_interval_ms: 1000,
            on_malformed: MalformedPolicy::Fail,
            log_level: "info".into(),
        }
    }
}
