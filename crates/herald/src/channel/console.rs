//! Development channel that writes messages to the log instead of sending them.

use async_trait::async_trait;

use super::{DispatchError, MessageChannel};

#[derive(Debug, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageChannel for ConsoleChannel {
    async fn send_message(&self, address: &str, text: &str) -> Result<(), DispatchError> {
        tracing::warn!("Console channel in use, message not delivered");
        tracing::debug!(address = %address, text = %text, "Console message");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
