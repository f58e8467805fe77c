//! Outbound messaging channel.
//!
//! The transport itself lives outside Herald. This module holds the
//! readiness gate fed by the transport's lifecycle events and the
//! `MessageChannel` adapters used to hand off messages.

mod bridge;
mod console;
mod gate;

pub use bridge::BridgeChannel;
pub use console::ConsoleChannel;
pub use gate::ReadinessGate;

use async_trait::async_trait;
use thiserror::Error;

/// Why a send request did not go through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("recipient is not registered")]
    NotRegistered,

    #[error("transport timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Deliver `text` to a channel-formatted address
    async fn send_message(&self, address: &str, text: &str) -> Result<(), DispatchError>;

    fn name(&self) -> &'static str;
}

/// Build the channel address for a phone number,
/// e.g. `1000000000` → `911000000000@c.us`
pub fn format_address(country_code: &str, phone_number: &str, suffix: &str) -> String {
    format!("{}{}{}", country_code, phone_number, suffix)
}

/// Mask all but the last 4 digits for logging
pub fn mask_phone(phone: &str) -> String {
    let visible = phone.len().saturating_sub(4);
    phone
        .char_indices()
        .map(|(i, c)| if i < visible { '*' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        assert_eq!(format_address("91", "1000000000", "@c.us"), "911000000000@c.us");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("1000004321"), "******4321");
        assert_eq!(mask_phone("12"), "12");
    }
}
