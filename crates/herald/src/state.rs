//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::channel::{BridgeChannel, ConsoleChannel, MessageChannel, ReadinessGate};
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, ChannelKind, StoreBackend};
use crate::otp::{MemoryOtpStore, OtpService, OtpStore, RedisOtpStore, ServiceSettings};
use crate::rate_limit::RateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Issuance and validation
    pub otp_service: Arc<OtpService>,

    /// Messaging channel readiness, fed by lifecycle events
    pub gate: Arc<ReadinessGate>,

    /// Record store (also pinged by `/ready`)
    pub store: Arc<dyn OtpStore>,

    /// Issuance throttle
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// A Redis outage here is logged and tolerated; store calls keep
    /// retrying the connection.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn OtpStore> = match config.store.backend {
            StoreBackend::Redis => {
                let store = RedisOtpStore::new(&config.redis_url, config.otp.ttl_secs)
                    .context("Invalid Redis URL")?;
                match store.connect().await {
                    Ok(()) => tracing::info!("✅ Redis connected: {}", config.redis_url),
                    Err(e) => tracing::error!(
                        error = %e,
                        "Redis unavailable at startup, OTP requests will fail until it recovers"
                    ),
                }
                Arc::new(store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory OTP store, records are lost on restart");
                Arc::new(MemoryOtpStore::new())
            }
        };

        let channel: Arc<dyn MessageChannel> = match config.channel.kind {
            ChannelKind::Bridge => Arc::new(BridgeChannel::new(
                &config.channel.bridge_url,
                Duration::from_secs(config.channel.send_timeout_secs),
            )?),
            ChannelKind::Console => Arc::new(ConsoleChannel::new()),
        };

        let gate = Arc::new(ReadinessGate::new());
        if config.channel.kind == ChannelKind::Console {
            // Nothing to pair with, so the channel is usable immediately.
            gate.on_connecting();
            gate.on_ready();
        }

        Self::from_parts(config, store, channel, gate, Arc::new(SystemClock))
    }

    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn OtpStore>,
        channel: Arc<dyn MessageChannel>,
        gate: Arc<ReadinessGate>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(
            crate::config::seconds(config.rate_limit.window_secs, "rate_limit.window_secs")?,
            config.rate_limit.max_requests,
            clock.clone(),
        ));

        let otp_service = Arc::new(OtpService::new(
            store.clone(),
            channel,
            gate.clone(),
            clock,
            ServiceSettings::from_config(&config)?,
        ));

        Ok(Self {
            config: Arc::new(config),
            otp_service,
            gate,
            store,
            rate_limiter,
        })
    }
}
