//! In-process record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common::{OtpError, OtpRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::OtpStore;

/// Records grouped by phone number
#[derive(Default)]
pub struct MemoryOtpStore {
    records: RwLock<HashMap<String, Vec<OtpRecord>>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically stored records, expired or not
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn put(&self, record: &OtpRecord) -> Result<(), OtpError> {
        self.records
            .write()
            .await
            .entry(record.phone_number.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn find_valid(
        &self,
        phone_number: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpRecord>, OtpError> {
        let records = self.records.read().await;
        let found = records
            .get(phone_number)
            .and_then(|list| list.iter().find(|r| r.matches(phone_number, code, now)))
            .cloned();
        Ok(found)
    }

    async fn delete(&self, record: &OtpRecord) -> Result<bool, OtpError> {
        let mut records = self.records.write().await;
        let Some(list) = records.get_mut(&record.phone_number) else {
            return Ok(false);
        };

        let before = list.len();
        list.retain(|r| r.id != record.id);
        let removed = list.len() < before;
        if list.is_empty() {
            records.remove(&record.phone_number);
        }
        Ok(removed)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, OtpError> {
        let mut records = self.records.write().await;
        let mut purged = 0;
        records.retain(|_, list| {
            let before = list.len();
            list.retain(|r| !r.is_expired(now));
            purged += before - list.len();
            !list.is_empty()
        });
        Ok(purged)
    }

    async fn ping(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
