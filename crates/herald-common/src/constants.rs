//! Shared constants for Herald components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Herald HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// OTP validity window (5 minutes)
pub const OTP_TTL_SECS: u64 = 300;

/// Number of digits in a generated code
pub const OTP_LENGTH: usize = 6;

/// Smallest code value (inclusive)
pub const OTP_MIN: u32 = 100_000;

/// Largest code value (inclusive)
pub const OTP_MAX: u32 = 999_999;

/// Rate limit window for OTP issuance (15 minutes)
pub const RATE_LIMIT_WINDOW_SECS: u64 = 900;

/// Maximum admitted issuance requests per source per window
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 15;

/// Default country code prepended to outbound addresses
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Default messaging-domain suffix appended to outbound addresses
pub const DEFAULT_ADDRESS_SUFFIX: &str = "@c.us";

/// Redis key prefixes
pub mod redis_keys {
    /// OTP records: otp:{phone}:{code_hash}
    pub const OTP_PREFIX: &str = "otp:";
}

/// HTTP header names
pub mod headers {
    /// Shared secret presented by the messaging bridge on lifecycle events
    pub const X_CHANNEL_TOKEN: &str = "X-Channel-Token";

    /// Client address as seen by a fronting proxy
    pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";

    /// Issuance requests left in the current window (lowercase: used with `from_static`)
    pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
}
