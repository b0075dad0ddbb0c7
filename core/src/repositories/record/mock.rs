//! In-memory mock implementation of the record store for testing

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::entities::otp_record::{OtpRecord, Purpose};
use crate::errors::{OtpError, OtpResult};

use super::r#trait::RecordStore;

/// In-memory record store keyed by (identifier, purpose)
///
/// Mirrors the durable store's contract closely enough for unit tests:
/// upserts replace, reads are live-only, sweeps honor the batch size.
pub struct MockRecordStore {
    records: Arc<Mutex<HashMap<(String, Purpose), OtpRecord>>>,
    should_fail: bool,
}

impl MockRecordStore {
    pub fn new(should_fail: bool) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            should_fail,
        }
    }

    /// Direct insertion for test setup, bypassing the trait
    pub fn insert(&self, record: OtpRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.identifier.clone(), record.purpose), record);
    }

    /// Snapshot of the stored record for a key, live or not
    pub fn get_raw(&self, identifier: &str, purpose: Purpose) -> Option<OtpRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(identifier.to_string(), purpose))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    fn check_available(&self) -> OtpResult<()> {
        if self.should_fail {
            Err(OtpError::StoreUnavailable {
                message: "mock store failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn upsert(&self, record: &OtpRecord) -> OtpResult<()> {
        self.check_available()?;
        self.records
            .lock()
            .unwrap()
            .insert((record.identifier.clone(), record.purpose), record.clone());
        Ok(())
    }

    async fn get_latest(&self, identifier: &str, purpose: Purpose) -> OtpResult<Option<OtpRecord>> {
        self.check_available()?;
        let now = Utc::now();
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(identifier.to_string(), purpose))
            .filter(|record| !record.is_expired_at(now))
            .cloned())
    }

    async fn increment_attempts(&self, identifier: &str, purpose: Purpose) -> OtpResult<u32> {
        self.check_available()?;
        let now = Utc::now();
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&(identifier.to_string(), purpose)) {
            Some(record) if !record.is_expired_at(now) => {
                record.attempt_count += 1;
                Ok(record.attempt_count)
            }
            _ => Ok(0),
        }
    }

    async fn delete(&self, identifier: &str, purpose: Purpose) -> OtpResult<()> {
        self.check_available()?;
        self.records
            .lock()
            .unwrap()
            .remove(&(identifier.to_string(), purpose));
        Ok(())
    }

    async fn delete_matching(&self, identifier: &str, purpose: Purpose, code: &str) -> OtpResult<()> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();
        let key = (identifier.to_string(), purpose);
        if records.get(&key).map(|r| r.code == code).unwrap_or(false) {
            records.remove(&key);
        }
        Ok(())
    }

    async fn count_since(&self, identifier: &str, window: Duration) -> OtpResult<u32> {
        self.check_available()?;
        let cutoff = Utc::now() - window;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.identifier == identifier && record.created_at > cutoff)
            .count() as u32)
    }

    async fn code_in_use(&self, code: &str) -> OtpResult<bool> {
        self.check_available()?;
        let now = Utc::now();
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .any(|record| record.code == code && !record.is_expired_at(now)))
    }

    async fn sweep_expired(&self, batch_size: u32) -> OtpResult<u32> {
        self.check_available()?;
        let now = Utc::now();
        let mut records = self.records.lock().unwrap();
        let expired: Vec<(String, Purpose)> = records
            .iter()
            .filter(|(_, record)| record.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .take(batch_size as usize)
            .collect();

        for key in &expired {
            records.remove(key);
        }
        Ok(expired.len() as u32)
    }
}
