//! Expiring OTP record storage.
//!
//! Two backends share the `OtpStore` contract:
//! - `RedisOtpStore` - sorted sets with native key expiry
//! - `MemoryOtpStore` - in-process map with lazy checks and a sweep worker
//!
//! Either way an expired record is never returned by `find_valid`, whether
//! or not it has been physically purged yet.

mod memory;
mod redis_store;

pub use self::memory::MemoryOtpStore;
pub use self::redis_store::RedisOtpStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common::{OtpError, OtpRecord};

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Insert a record. Never replaces other records for the same phone number.
    async fn put(&self, record: &OtpRecord) -> Result<(), OtpError>;

    /// Exact `(phone, code)` match on a record that is still live at `now`
    async fn find_valid(
        &self,
        phone_number: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpRecord>, OtpError>;

    /// Remove a record by identity, returning whether it was still present.
    /// Removing an absent record is not an error.
    async fn delete(&self, record: &OtpRecord) -> Result<bool, OtpError>;

    /// Physically drop records expired at `now`, returning how many went
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, OtpError>;

    /// Backend reachability check
    async fn ping(&self) -> bool;

    fn backend_name(&self) -> &'static str;
}
