//! VoteRelay: moves vote events from a Redis list into a relational table.
//!
//! On startup the relay waits for Redis and the database, wipes and
//! recreates the votes schema, then pops votes one at a time and stores
//! each with insert-or-update semantics. The latest vote per voter wins.
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`message`]: Vote message parsing
//! - [`observability`]: Tracing setup
//! - [`queue`]: Queue consumers (Redis, in-memory)
//! - [`relay`]: Startup wiring and lifecycle
//! - [`retry`]: Fixed-delay connection retry
//! - [`storage`]: Vote persistence (PostgreSQL, SQLite)
//! - [`worker`]: The processing loop

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // queue::redis::RedisQueue is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::needless_raw_string_hashes  // r#""# is fine for SQL
)]

pub mod config;
pub mod message;
pub mod observability;
pub mod queue;
pub mod relay;
pub mod retry;
pub mod storage;
pub mod worker;
