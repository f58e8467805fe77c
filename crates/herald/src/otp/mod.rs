//! OTP lifecycle: generation, expiring storage, issuance and validation.

mod generator;
pub(crate) mod service;
pub mod store;

pub use generator::OtpGenerator;
pub use service::{OtpService, ServiceSettings};
pub use store::{MemoryOtpStore, OtpStore, RedisOtpStore};

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::rate_limit::RateLimiter;

/// Periodically purge expired records and idle rate-limit windows
pub async fn sweep_worker(
    store: Arc<dyn OtpStore>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Sweep worker shutting down");
                break;
            }
            _ = ticker.tick() => {
                match store.purge_expired(clock.now()).await {
                    Ok(0) => {}
                    Ok(purged) => tracing::debug!(purged, "Purged expired OTP records"),
                    Err(e) => tracing::warn!(error = %e, "OTP sweep failed"),
                }

                let idle = limiter.prune().await;
                if idle > 0 {
                    tracing::debug!(idle, "Pruned idle rate-limit windows");
                }
            }
        }
    }
}
