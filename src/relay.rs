//! Relay startup and lifecycle.
//!
//! Wires the process together:
//! - Connects to the queue, retrying until Redis answers
//! - Connects to the store, retrying, then resets the schema
//! - Hands both handles to the [`Worker`] loop

use thiserror::Error;
use tokio::sync::watch;

use crate::config::{Config, StoreKind};
use crate::queue::{RedisQueue, VoteQueue};
use crate::retry::RetryAborted;
use crate::storage::{PostgresStore, SqliteStore, StoreError, VoteStore};
use crate::worker::{Worker, WorkerError, WorkerStats};

/// Error type for a relay run.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Aborted(#[from] RetryAborted),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Connect the configured store and give it a fresh, empty schema.
pub async fn connect_store(
    config: &Config,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Box<dyn VoteStore>, RelayError> {
    let delay = config.retry_delay();

    match config.store {
        StoreKind::Postgres => {
            let options = PostgresStore::options(config);

            let mut admin = PostgresStore::connect_admin_with_retry(&options, delay, shutdown).await?;
            admin.recreate_database(&config.db_name).await?;
            admin.close().await;

            let mut store = PostgresStore::connect(&options, &config.db_name).await?;
            store.reset_schema().await?;
            Ok(Box::new(store))
        }
        StoreKind::Sqlite => {
            let mut store =
                SqliteStore::connect_with_retry(&config.sqlite_path, delay, shutdown).await?;
            store.reset_schema().await?;
            Ok(Box::new(store))
        }
    }
}

/// Run the relay until shutdown or a fatal error.
///
/// An interrupted startup is a clean exit and reports empty stats.
pub async fn run_relay(
    config: Config,
    mut shutdown: watch::Receiver<bool>,
) -> Result<WorkerStats, RelayError> {
    let result = start_and_run(&config, &mut shutdown).await;

    match result {
        Err(RelayError::Aborted(aborted)) => {
            tracing::info!(%aborted, "Startup interrupted");
            Ok(WorkerStats::default())
        }
        other => other,
    }
}

async fn start_and_run(
    config: &Config,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<WorkerStats, RelayError> {
    let queue = RedisQueue::connect_with_retry(
        &config.redis_url(),
        &config.queue_key,
        config.retry_delay(),
        shutdown,
    )
    .await?;
    tracing::info!(key = queue.key(), "Connected to vote queue");

    let store = connect_store(config, shutdown).await?;
    tracing::info!(store = ?config.store, "Votes schema ready");
    run_worker(queue, store, config, shutdown.clone()).await
}

/// Run a worker over already-connected handles.
pub async fn run_worker<Q: VoteQueue, S: VoteStore>(
    queue: Q,
    store: S,
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> Result<WorkerStats, RelayError> {
    let mut worker =
        Worker::new(queue, store, config.on_malformed).with_poll_interval(config.poll_interval());
    Ok(worker.run(shutdown).await?)
}
