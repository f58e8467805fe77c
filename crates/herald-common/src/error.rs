//! Error taxonomy for OTP issuance and validation.

use thiserror::Error;

/// Errors surfaced by the OTP core to its callers.
///
/// None of these carry the generated code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    /// A required request field was missing or empty
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// The outbound messaging channel is not connected
    #[error("Messaging channel is not ready")]
    ChannelNotReady,

    /// The destination is not a registered address on the messaging network
    #[error("Recipient is not registered on the messaging channel")]
    RecipientNotRegistered,

    /// Transport-level dispatch failure (including timeouts)
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    /// No valid record matched the submitted phone number and code
    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,

    /// The request source exceeded its issuance budget
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The backing store could not be reached or returned garbage
    #[error("Store error: {0}")]
    Store(String),
}

impl OtpError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::ChannelNotReady => 500,
            Self::RecipientNotRegistered => 400,
            Self::DispatchFailed(_) => 500,
            Self::InvalidOrExpiredOtp => 400,
            Self::RateLimitExceeded => 429,
            Self::Store(_) => 500,
        }
    }

    /// Message safe to return to API callers
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(msg) => *msg,
            Self::ChannelNotReady => "WhatsApp client is not ready",
            Self::RecipientNotRegistered => "Recipient is not registered on WhatsApp",
            Self::DispatchFailed(_) => "Failed to send OTP",
            Self::InvalidOrExpiredOtp => "Invalid OTP or OTP expired",
            Self::RateLimitExceeded => "Too many requests, please try again later.",
            Self::Store(_) => "Internal server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_messages_hide_details() {
        let err = OtpError::DispatchFailed("connection reset by 10.0.0.7".to_string());
        assert_eq!(err.public_message(), "Failed to send OTP");
        assert_eq!(err.status_code(), 500);

        let err = OtpError::Store("redis: connection refused".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_invalid_input_carries_message() {
        let err = OtpError::InvalidInput("Phone number is required");
        assert_eq!(err.public_message(), "Phone number is required");
        assert_eq!(err.status_code(), 400);
    }
}
