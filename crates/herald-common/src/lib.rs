//! # Herald Common
//!
//! Shared types, errors, and constants used across Herald components.
//!
//! ## Modules
//! - `types` - Core data structures (OtpRecord, ChannelState, API bodies)
//! - `error` - The OTP error taxonomy
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::OtpError;
pub use types::*;
