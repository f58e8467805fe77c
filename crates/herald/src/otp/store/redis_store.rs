//! Redis-backed record store.
//!
//! Layout: one sorted set per `(phone, sha256(code))` at
//! `otp:{phone}:{code_hash}`. Members are `StoredOtp` JSON scored by their
//! expiry in epoch milliseconds. The plain code is never written to Redis.
//! Each put refreshes the key TTL to the record TTL, so Redis drops the
//! whole set once its newest member has expired.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common::constants::redis_keys::OTP_PREFIX;
use herald_common::{OtpError, OtpRecord};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::OtpStore;

/// Sorted-set member for one record
#[derive(Debug, Serialize, Deserialize)]
struct StoredOtp {
    id: String,
    created_at_ms: i64,
    expires_at_ms: i64,
}

impl From<&OtpRecord> for StoredOtp {
    fn from(record: &OtpRecord) -> Self {
        Self {
            id: record.id.clone(),
            created_at_ms: record.created_at.timestamp_millis(),
            expires_at_ms: record.expires_at.timestamp_millis(),
        }
    }
}

impl StoredOtp {
    fn score(&self) -> f64 {
        self.expires_at_ms as f64
    }

    /// Same rule as `live_min_bound`: live while the score is strictly above now
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_ms > now.timestamp_millis()
    }
}

/// Exclusive ZRANGEBYSCORE lower bound: a record expiring exactly at `now` is dead
fn live_min_bound(now: DateTime<Utc>) -> String {
    format!("({}", now.timestamp_millis())
}

/// Inclusive ZREMRANGEBYSCORE upper bound for members already expired at `now`
fn expired_max_bound(now: DateTime<Utc>) -> f64 {
    now.timestamp_millis() as f64
}

pub struct RedisOtpStore {
    client: redis::Client,
    /// Established on first use so an outage at startup is recoverable
    conn: Mutex<Option<ConnectionManager>>,
    ttl_secs: u64,
}

impl RedisOtpStore {
    /// Parse the URL. Does not touch the network.
    pub fn new(redis_url: &str, ttl_secs: u64) -> Result<Self, OtpError> {
        let client = redis::Client::open(redis_url).map_err(store_err)?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            ttl_secs,
        })
    }

    /// Try to connect now, keeping the connection for later operations
    pub async fn connect(&self) -> Result<(), OtpError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<ConnectionManager, OtpError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = ConnectionManager::new(self.client.clone())
            .await
            .map_err(store_err)?;
        tracing::info!("Redis connection established");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    fn key(phone_number: &str, code: &str) -> String {
        format!("{}{}:{}", OTP_PREFIX, phone_number, hash_code(code))
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, record: &OtpRecord) -> Result<(), OtpError> {
        let mut conn = self.connection().await?;
        let key = Self::key(&record.phone_number, &record.code);
        let stored = StoredOtp::from(record);
        let member = serde_json::to_string(&stored).map_err(store_err)?;

        let _: () = redis::pipe()
            .atomic()
            .zadd(&key, &member, stored.score())
            .ignore()
            .zrembyscore(&key, "-inf", expired_max_bound(record.created_at))
            .ignore()
            .expire(&key, self.ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn find_valid(
        &self,
        phone_number: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpRecord>, OtpError> {
        let mut conn = self.connection().await?;
        let key = Self::key(phone_number, code);
        let members: Vec<String> = conn
            .zrangebyscore_limit(&key, live_min_bound(now), "+inf", 0, 1)
            .await
            .map_err(store_err)?;

        let Some(member) = members.into_iter().next() else {
            return Ok(None);
        };

        let stored: StoredOtp = serde_json::from_str(&member).map_err(store_err)?;
        if !stored.is_live(now) {
            return Ok(None);
        }

        let (Some(created_at), Some(expires_at)) = (
            DateTime::from_timestamp_millis(stored.created_at_ms),
            DateTime::from_timestamp_millis(stored.expires_at_ms),
        ) else {
            return Err(OtpError::Store(format!("corrupt timestamps on record {}", stored.id)));
        };

        Ok(Some(OtpRecord {
            id: stored.id,
            phone_number: phone_number.to_string(),
            code: code.to_string(),
            created_at,
            expires_at,
        }))
    }

    async fn delete(&self, record: &OtpRecord) -> Result<bool, OtpError> {
        let mut conn = self.connection().await?;
        let key = Self::key(&record.phone_number, &record.code);
        let member = serde_json::to_string(&StoredOtp::from(record)).map_err(store_err)?;

        let removed: i64 = conn.zrem(&key, member).await.map_err(store_err)?;
        Ok(removed > 0)
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, OtpError> {
        // Members are trimmed on put and whole keys expire natively.
        Ok(0)
    }

    async fn ping(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

fn hash_code(code: &str) -> String {
    format!("{:x}", Sha256::digest(code.as_bytes()))
}

fn store_err(err: impl std::fmt::Display) -> OtpError {
    OtpError::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_key_hides_code() {
        let key = RedisOtpStore::key("1000000000", "123456");
        assert!(key.starts_with("otp:1000000000:"));
        assert!(!key.contains("123456"));
        assert_eq!(key.len(), "otp:1000000000:".len() + 64);
    }

    #[test]
    fn test_member_is_stable_for_delete() {
        let created = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let record = OtpRecord::new(
            "abc".to_string(),
            "1000000000".to_string(),
            "123456".to_string(),
            created,
            Duration::seconds(300),
        );

        let member = serde_json::to_string(&StoredOtp::from(&record)).unwrap();
        let decoded: StoredOtp = serde_json::from_str(&member).unwrap();
        assert_eq!(decoded.expires_at_ms, 1_700_000_300_123);
        assert_eq!(serde_json::to_string(&decoded).unwrap(), member);
    }

    #[test]
    fn test_live_bound_excludes_expiry_instant() {
        let created = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let record = OtpRecord::new(
            "abc".to_string(),
            "1000000000".to_string(),
            "123456".to_string(),
            created,
            Duration::seconds(300),
        );
        let stored = StoredOtp::from(&record);

        assert_eq!(live_min_bound(record.expires_at), "(1700000300000");
        assert_eq!(stored.score(), 1_700_000_300_000.0);

        assert!(stored.is_live(record.expires_at - Duration::milliseconds(1)));
        assert!(!stored.is_live(record.expires_at));
        assert!(!stored.is_live(record.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_put_trims_only_expired_members() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let bound = expired_max_bound(now);

        let expired = StoredOtp {
            id: "old".to_string(),
            created_at_ms: 1_699_999_700_000,
            expires_at_ms: 1_700_000_000_000,
        };
        let live = StoredOtp {
            id: "new".to_string(),
            created_at_ms: 1_699_999_700_001,
            expires_at_ms: 1_700_000_000_001,
        };

        // ZREMRANGEBYSCORE -inf bound is inclusive
        assert!(expired.score() <= bound);
        assert!(!expired.is_live(now));
        assert!(live.score() > bound);
        assert!(live.is_live(now));
    }

    #[test]
    fn test_invalid_url_is_store_error() {
        let result = RedisOtpStore::new("not a url", 300);
        assert!(matches!(result, Err(OtpError::Store(_))));
    }
}
