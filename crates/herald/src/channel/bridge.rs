//! HTTP client for an external messaging bridge.
//!
//! The bridge owns the messaging session (QR pairing, reconnects) and
//! reports lifecycle changes back to `POST /channel/events`. Herald only
//! asks it to deliver text:
//!
//! ```text
//! POST {base_url}/messages  {"chatId": "911000000000@c.us", "text": "..."}
//!   2xx      delivered
//!   404/422  recipient not registered
//!   other    transport failure
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

use super::{DispatchError, MessageChannel};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct BridgeChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl BridgeChannel {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build bridge HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl MessageChannel for BridgeChannel {
    async fn send_message(&self, address: &str, text: &str) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessageBody {
                chat_id: address,
                text,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout
                } else {
                    DispatchError::Transport(e.to_string())
                }
            })?;

        classify_status(response.status())
    }

    fn name(&self) -> &'static str {
        "bridge"
    }
}

fn classify_status(status: StatusCode) -> Result<(), DispatchError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(DispatchError::NotRegistered)
        }
        s => Err(DispatchError::Transport(format!("bridge returned {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let channel = BridgeChannel::new("http://127.0.0.1:3001/", Duration::from_secs(5)).unwrap();
        assert_eq!(channel.endpoint, "http://127.0.0.1:3001/messages");
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), Ok(()));
        assert_eq!(classify_status(StatusCode::ACCEPTED), Ok(()));
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            Err(DispatchError::NotRegistered)
        );
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            Err(DispatchError::NotRegistered)
        );
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            Err(DispatchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_bridge_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let channel = BridgeChannel::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = channel.send_message("911000000000@c.us", "hi").await;
        assert!(matches!(
            result,
            Err(DispatchError::Transport(_) | DispatchError::Timeout)
        ));
    }
}
