//! VoteRelay: moves vote events from a Redis list into a relational table.
//!
//! # Usage
//!
//! ```bash
//! voterelay --redis-host redis --db-host db --log-level info
//! ```
//!
//! Environment variables can also be used:
//! - `REDIS_HOST` / `DB_HOST`: Dependency hostnames
//! - `VOTERELAY_STORE`: `postgres` or `sqlite`
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use voterelay::config::{Config, StoreKind};
use voterelay::observability::tracing::init_tracing;
use voterelay::relay::run_relay;
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let store = match config.store {
        StoreKind::Postgres => format!(
            "postgres://{}@{}:{}/{}",
            config.db_user, config.db_host, config.db_port, config.db_name
        ),
        StoreKind::Sqlite => format!("sqlite://{}", config.sqlite_path.display()),
    };
    eprintln!(
        r#"
  VoteRelay v{}

  Configuration:
    Queue:      {} (key "{}")
    Store:      {}
    Retry:      every {} ms
    Malformed:  {:?}
    Log Level:  {}

  The votes table is recreated empty on every start.
"#,
        version,
        config.redis_url(),
        config.queue_key,
        store,
        config.retry_delay_ms,
        config.on_malformed,
        config.log_level
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    // Print startup banner
    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        // Wait for SIGTERM or SIGINT (Ctrl+C)
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = ctrl_c.await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        // Signal shutdown
        let _ = shutdown_tx.send(true);
    });

    // Run the relay; any error exits with status 1
    let stats = run_relay(config, shutdown_rx).await.map_err(|e| {
        tracing::error!(error = %e, "VoteRelay stopped on fatal error");
        e
    })?;

    tracing::info!(processed = stats.processed, "VoteRelay shutdown complete");
    Ok(())
}
