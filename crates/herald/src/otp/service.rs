//! OTP issuance and validation.

use chrono::Duration;
use herald_common::{OtpError, OtpRecord};
use std::sync::Arc;

use super::{OtpGenerator, OtpStore};
use crate::channel::{DispatchError, MessageChannel, ReadinessGate, format_address, mask_phone};
use crate::clock::Clock;
use crate::config::AppConfig;

/// Tunables taken from configuration
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub ttl: Duration,
    pub message_template: String,
    pub country_code: String,
    pub address_suffix: String,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            ttl: crate::config::seconds(config.otp.ttl_secs, "otp.ttl_secs")?,
            message_template: config.otp.message_template.clone(),
            country_code: config.channel.country_code.clone(),
            address_suffix: config.channel.address_suffix.clone(),
        })
    }
}

pub struct OtpService {
    store: Arc<dyn OtpStore>,
    channel: Arc<dyn MessageChannel>,
    gate: Arc<ReadinessGate>,
    clock: Arc<dyn Clock>,
    generator: OtpGenerator,
    settings: ServiceSettings,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        channel: Arc<dyn MessageChannel>,
        gate: Arc<ReadinessGate>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            channel,
            gate,
            clock,
            generator: OtpGenerator::new(),
            settings,
        }
    }

    /// Generate, store and dispatch a code for `phone_number`.
    ///
    /// The stored record is kept when dispatch fails; it expires unused.
    pub async fn issue(&self, phone_number: &str) -> Result<(), OtpError> {
        if phone_number.trim().is_empty() {
            return Err(OtpError::InvalidInput("Phone number is required"));
        }

        if !self.gate.is_ready() {
            tracing::warn!(state = self.gate.state().as_str(), "OTP requested while channel not ready");
            return Err(OtpError::ChannelNotReady);
        }

        let code = self.generator.generate();
        let record = OtpRecord::new(
            self.generator.record_id(),
            phone_number.to_string(),
            code,
            self.clock.now(),
            self.settings.ttl,
        );
        self.store.put(&record).await?;

        let address = format_address(
            &self.settings.country_code,
            phone_number,
            &self.settings.address_suffix,
        );
        let text = self.settings.message_template.replace("{code}", &record.code);

        match self.channel.send_message(&address, &text).await {
            Ok(()) => {
                tracing::info!(
                    phone = %mask_phone(phone_number),
                    channel = self.channel.name(),
                    "OTP dispatched"
                );
                Ok(())
            }
            Err(DispatchError::NotRegistered) => {
                tracing::info!(phone = %mask_phone(phone_number), "Recipient not registered on channel");
                Err(OtpError::RecipientNotRegistered)
            }
            Err(e) => {
                tracing::error!(phone = %mask_phone(phone_number), error = %e, "OTP dispatch failed");
                Err(OtpError::DispatchFailed(e.to_string()))
            }
        }
    }

    /// Check a submitted code and consume the matching record
    pub async fn validate(&self, phone_number: &str, code: &str) -> Result<(), OtpError> {
        if phone_number.trim().is_empty() || code.trim().is_empty() {
            return Err(OtpError::InvalidInput("Phone number and OTP are required"));
        }

        let now = self.clock.now();
        let Some(record) = self.store.find_valid(phone_number, code, now).await? else {
            tracing::debug!(phone = %mask_phone(phone_number), "OTP validation miss");
            return Err(OtpError::InvalidOrExpiredOtp);
        };

        // Another request may have consumed the record since the lookup.
        if !self.store.delete(&record).await? {
            tracing::debug!(phone = %mask_phone(phone_number), "OTP already consumed");
            return Err(OtpError::InvalidOrExpiredOtp);
        }

        tracing::info!(phone = %mask_phone(phone_number), "OTP validated");
        Ok(())
    }
}
