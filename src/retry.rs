//! Fixed-delay connection retry.
//!
//! Dependencies are retried forever with a constant delay between
//! attempts. The only way out besides success is the shutdown signal.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Returned when shutdown is requested while still retrying.
#[derive(Debug, Error)]
#[error("Shutdown requested while connecting to {target}")]
pub struct RetryAborted {
    pub target: &'static str,
}

/// Run `attempt` until it succeeds, sleeping `delay` after each failure.
///
/// Every failure is logged at warn level with the attempt number.
pub async fn retry_forever<T, E, F, Fut>(
    target: &'static str,
    delay: Duration,
    shutdown: &mut watch::Receiver<bool>,
    mut attempt: F,
) -> Result<T, RetryAborted>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts: u64 = 0;
    loop {
        if *shutdown.borrow() {
            return Err(RetryAborted { target });
        }

        attempts += 1;
        match attempt().await {
            Ok(value) => {
                tracing::info!(target_service = target, attempts, "Connected to {target}");
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(
                    target_service = target,
                    attempts,
                    error = %e,
                    "Failed to connect to {target} - retrying"
                );
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                // A dropped sender means nobody can ask us to stop any more
                if changed.is_ok() && *shutdown.borrow() {
                    return Err(RetryAborted { target });
                }
            }
        }
    }
}
