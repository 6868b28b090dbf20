//! Expired token purge background task.
//!
//! Expired access tokens and assertion IDs are never consulted again
//! (introspection reports them inactive either way), so they are deleted
//! periodically to keep the store bounded.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is cancelled, after finishing
//! any purge already in progress.

use crate::repositories::TokenStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Run purges every `interval` until `cancel_token` is cancelled.
#[instrument(skip_all, name = "as.task.token_purge")]
pub async fn start_token_purge(
    store: Arc<dyn TokenStore>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "as.task.token_purge",
        interval_seconds = interval.as_secs(),
        "Starting token purge task"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_purge(store.as_ref()).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "as.task.token_purge",
                    "Token purge task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}

/// Single purge iteration. Errors are logged and retried on the next tick.
pub(crate) async fn run_purge(store: &dyn TokenStore) -> u64 {
    match store.purge_expired(Utc::now()).await {
        Ok(count) => {
            if count > 0 {
                info!(
                    target: "as.task.token_purge",
                    purged_count = count,
                    "Purged expired tokens and assertion ids"
                );
            }
            count
        }
        Err(e) => {
            tracing::error!(
                target: "as.task.token_purge",
                error = %e,
                "Failed to purge expired tokens"
            );
            0
        }
    }
}
