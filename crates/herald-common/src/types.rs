//! Core types shared across Herald components.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A stored one-time passcode for a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Opaque record identity, distinct per issuance
    pub id: String,

    /// Phone number as supplied by the caller (not normalized)
    pub phone_number: String,

    /// Fixed-length numeric secret
    pub code: String,

    /// Issuance time
    pub created_at: DateTime<Utc>,

    /// `created_at + ttl`
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn new(
        id: String,
        phone_number: String,
        code: String,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id,
            phone_number,
            code,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// A record is unusable at or after its expiry instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Exact `(phone, code)` match on a live record
    pub fn matches(&self, phone_number: &str, code: &str, now: DateTime<Utc>) -> bool {
        self.phone_number == phone_number && self.code == code && !self.is_expired(now)
    }
}

/// Connectivity state of the outbound messaging channel.
///
/// ```text
/// Disconnected → Connecting → Ready → Disconnected
///                    ↓          ↓
///                 AuthFailed ←──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChannelState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Ready = 2,
    /// Stays here until the collaborator re-enters `Connecting`
    AuthFailed = 3,
}

impl ChannelState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Ready,
            3 => Self::AuthFailed,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::AuthFailed => "auth_failed",
        }
    }
}

/// Lifecycle events emitted by the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// The collaborator (re)started its handshake
    Connecting,

    /// A pairing code is available for presentation (implies connecting)
    Qr { code: String },

    /// The channel can accept send requests
    Ready,

    /// The channel lost its session
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },

    /// The channel rejected its credentials
    AuthFailure {
        #[serde(default)]
        detail: Option<String>,
    },
}

/// Body of `POST /send-otp`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: String,
}

/// Body of `POST /validate-otp`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOtpRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub otp: String,
}

/// Strings pass through and nonzero numbers are stringified. Anything else
/// (null, zero, booleans, arrays, objects) reads as empty, i.e. missing.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => String::new(),
    })
}

/// Successful API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Failed API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_expiry_boundary() {
        let created = Utc::now();
        let record = OtpRecord::new(
            "id".to_string(),
            "1000000000".to_string(),
            "123456".to_string(),
            created,
            Duration::seconds(300),
        );

        assert!(!record.is_expired(created + Duration::seconds(299)));
        assert!(record.is_expired(created + Duration::seconds(300)));
        assert!(record.matches("1000000000", "123456", created));
        assert!(!record.matches("1000000001", "123456", created));
        assert!(!record.matches("1000000000", "654321", created));
    }

    #[test]
    fn test_channel_event_wire_format() {
        let event: ChannelEvent =
            serde_json::from_str(r#"{"event":"disconnected","reason":"NAVIGATION"}"#).unwrap();
        assert_eq!(
            event,
            ChannelEvent::Disconnected {
                reason: Some("NAVIGATION".to_string())
            }
        );

        let event: ChannelEvent = serde_json::from_str(r#"{"event":"auth_failure"}"#).unwrap();
        assert_eq!(event, ChannelEvent::AuthFailure { detail: None });
    }

    #[test]
    fn test_channel_state_u8_roundtrip() {
        for state in [
            ChannelState::Disconnected,
            ChannelState::Connecting,
            ChannelState::Ready,
            ChannelState::AuthFailed,
        ] {
            assert_eq!(ChannelState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn test_request_bodies_coerce_loose_json() {
        let req: SendOtpRequest = serde_json::from_str(r#"{"phoneNumber":null}"#).unwrap();
        assert!(req.phone_number.is_empty());

        let req: SendOtpRequest = serde_json::from_str(r#"{"phoneNumber":1000000000}"#).unwrap();
        assert_eq!(req.phone_number, "1000000000");

        let req: SendOtpRequest = serde_json::from_str(r#"{"phoneNumber":0}"#).unwrap();
        assert!(req.phone_number.is_empty());

        let req: ValidateOtpRequest =
            serde_json::from_str(r#"{"phoneNumber":"1","otp":null}"#).unwrap();
        assert!(req.otp.is_empty());

        let req: ValidateOtpRequest =
            serde_json::from_str(r#"{"phoneNumber":["1"],"otp":123456}"#).unwrap();
        assert!(req.phone_number.is_empty());
        assert_eq!(req.otp, "123456");
    }

    #[test]
    fn test_request_bodies_tolerate_missing_fields() {
        let req: ValidateOtpRequest = serde_json::from_str(r#"{"phoneNumber":"1"}"#).unwrap();
        assert_eq!(req.phone_number, "1");
        assert!(req.otp.is_empty());
    }
}
