//! JWKS refresher background task.
//!
//! Refreshes the [`JwksCache`] on a fixed interval for the life of the
//! process. A failed refresh is logged and the previous key set keeps
//! serving until the next tick.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is triggered, including while
//! a fetch is in flight. An interrupted fetch never reaches the cache.

use crate::auth::JwksCache;
use crate::config::MAX_JWKS_REFRESH_INTERVAL_SECONDS;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the refresh loop until `cancel_token` is cancelled.
///
/// The first refresh happens one `refresh_interval` after start, since the
/// cache was loaded during startup. The interval is capped at
/// `MAX_JWKS_REFRESH_INTERVAL_SECONDS`.
pub async fn start_jwks_refresher(
    jwks: Arc<JwksCache>,
    refresh_interval: Duration,
    cancel_token: CancellationToken,
) {
    let refresh_interval =
        refresh_interval.min(Duration::from_secs(MAX_JWKS_REFRESH_INTERVAL_SECONDS));

    info!(
        target: "gw.task.jwks_refresher",
        interval_seconds = refresh_interval.as_secs(),
        "Starting JWKS refresher task"
    );

    let mut interval = interval_at(Instant::now() + refresh_interval, refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tokio::select! {
                    result = jwks.refresh() => {
                        if let Err(e) = result {
                            let snapshot = jwks.get();
                            error!(
                                target: "gw.task.jwks_refresher",
                                error = %e,
                                key_count = snapshot.key_set.len(),
                                age_seconds = snapshot.age_seconds(),
                                "JWKS refresh failed, keeping previous key set"
                            );
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        info!(target: "gw.task.jwks_refresher", "JWKS refresh interrupted by shutdown");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                break;
            }
        }
    }

    info!(target: "gw.task.jwks_refresher", "JWKS refresher task stopped");
}
