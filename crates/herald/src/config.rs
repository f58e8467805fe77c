//! Configuration management for Herald.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use herald_common::constants::{
    DEFAULT_ADDRESS_SUFFIX, DEFAULT_COUNTRY_CODE, DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL,
    OTP_TTL_SECS, RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// OTP issuance settings
    #[serde(default)]
    pub otp: OtpConfig,

    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Issuance throttle settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Messaging channel settings
    #[serde(default)]
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Record validity in seconds
    #[serde(default = "default_otp_ttl")]
    pub ttl_secs: u64,

    /// Message body; `{code}` is replaced with the generated code
    #[serde(default = "default_message_template")]
    pub message_template: String,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_otp_ttl(),
            message_template: default_message_template(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// How often expired records and idle rate-limit windows are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Sliding window length in seconds
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Maximum admitted issuance requests per source per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Key on the first X-Forwarded-For address instead of the peer address
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            max_requests: default_max_requests(),
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    #[default]
    Bridge,
    Console,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub kind: ChannelKind,

    /// Prepended to phone numbers when building channel addresses
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Appended to phone numbers when building channel addresses
    #[serde(default = "default_address_suffix")]
    pub address_suffix: String,

    /// Base URL of the messaging bridge
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Per-send timeout in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    /// Shared secret required on `POST /channel/events`
    #[serde(default)]
    pub event_token: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: ChannelKind::default(),
            country_code: default_country_code(),
            address_suffix: default_address_suffix(),
            bridge_url: default_bridge_url(),
            send_timeout_secs: default_send_timeout(),
            event_token: None,
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_otp_ttl() -> u64 { OTP_TTL_SECS }
fn default_message_template() -> String {
    "Your OTP is {code}. It is valid for 5 minutes.".to_string()
}
fn default_sweep_interval() -> u64 { 60 }
fn default_window() -> u64 { RATE_LIMIT_WINDOW_SECS } // 15 minutes
fn default_max_requests() -> u32 { RATE_LIMIT_MAX_REQUESTS }
fn default_country_code() -> String { DEFAULT_COUNTRY_CODE.to_string() }
fn default_address_suffix() -> String { DEFAULT_ADDRESS_SUFFIX.to_string() }
fn default_bridge_url() -> String { "http://127.0.0.1:3001".to_string() }
fn default_send_timeout() -> u64 { 10 }

/// Convert a configured second count, rejecting values chrono cannot represent
pub fn seconds(value: u64, key: &str) -> Result<chrono::Duration> {
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .with_context(|| format!("{} is out of range: {}", key, value))
}

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = Self::from_file(config_path)?;
        config.validate()?;

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }

        Ok(config)
    }

    /// Reject durations that would overflow time arithmetic
    pub fn validate(&self) -> Result<()> {
        seconds(self.otp.ttl_secs, "otp.ttl_secs")?;
        seconds(self.rate_limit.window_secs, "rate_limit.window_secs")?;
        Ok(())
    }

    fn from_file(config_path: &str) -> Result<Self> {
        if !Path::new(config_path).exists() {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path))
            .build()
            .context("Failed to load config file")?;

        settings
            .try_deserialize()
            .context("Failed to parse config")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            otp: OtpConfig::default(),
            store: StoreConfig::default(),
            rate_limit: RateLimitConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}
