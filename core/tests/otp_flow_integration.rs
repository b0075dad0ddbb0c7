//! Integration tests for the full issue -> notify -> verify flow

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::{Map, Value};

    use og_core::domain::entities::otp_record::{
        OtpRecord, Payload, Purpose, RecordView, DEFAULT_EXPIRATION_MINUTES,
    };
    use og_core::errors::{OtpError, OtpResult};
    use og_core::repositories::RecordStore;
    use og_core::services::otp::{
        NotificationSender, OtpCache, OtpService, OtpServiceConfig,
    };

    const ALICE: &str = "alice@example.com";

    // In-memory record store
    #[derive(Default)]
    struct InMemoryStore {
        records: Mutex<HashMap<(String, Purpose), OtpRecord>>,
    }

    impl InMemoryStore {
        fn snapshot(&self, identifier: &str, purpose: Purpose) -> Option<OtpRecord> {
            self.records
                .lock()
                .unwrap()
                .get(&(identifier.to_string(), purpose))
                .cloned()
        }
    }

    #[async_trait]
    impl RecordStore for InMemoryStore {
        async fn upsert(&self, record: &OtpRecord) -> OtpResult<()> {
            self.records
                .lock()
                .unwrap()
                .insert((record.identifier.clone(), record.purpose), record.clone());
            Ok(())
        }

        async fn get_latest(
            &self,
            identifier: &str,
            purpose: Purpose,
        ) -> OtpResult<Option<OtpRecord>> {
            let now = Utc::now();
            Ok(self
                .snapshot(identifier, purpose)
                .filter(|record| !record.is_expired_at(now)))
        }

        async fn increment_attempts(&self, identifier: &str, purpose: Purpose) -> OtpResult<u32> {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(&(identifier.to_string(), purpose)) {
                Some(record) => {
                    record.attempt_count += 1;
                    Ok(record.attempt_count)
                }
                None => Ok(0),
            }
        }

        async fn delete(&self, identifier: &str, purpose: Purpose) -> OtpResult<()> {
            self.records
                .lock()
                .unwrap()
                .remove(&(identifier.to_string(), purpose));
            Ok(())
        }

        async fn delete_matching(
            &self,
            identifier: &str,
            purpose: Purpose,
            code: &str,
        ) -> OtpResult<()> {
            let mut records = self.records.lock().unwrap();
            let key = (identifier.to_string(), purpose);
            if records.get(&key).map(|r| r.code == code).unwrap_or(false) {
                records.remove(&key);
            }
            Ok(())
        }

        async fn count_since(&self, identifier: &str, window: Duration) -> OtpResult<u32> {
            let cutoff = Utc::now() - window;
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.identifier == identifier && r.created_at > cutoff)
                .count() as u32)
        }

        async fn code_in_use(&self, code: &str) -> OtpResult<bool> {
            let now = Utc::now();
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .any(|r| r.code == code && !r.is_expired_at(now)))
        }

        async fn sweep_expired(&self, batch_size: u32) -> OtpResult<u32> {
            let now = Utc::now();
            let mut records = self.records.lock().unwrap();
            let expired: Vec<(String, Purpose)> = records
                .iter()
                .filter(|(_, r)| r.is_expired_at(now))
                .map(|(k, _)| k.clone())
                .take(batch_size as usize)
                .collect();
            for key in &expired {
                records.remove(key);
            }
            Ok(expired.len() as u32)
        }
    }

    // In-memory cache with views, counters, and lock markers
    #[derive(Default)]
    struct InMemoryCache {
        views: Mutex<HashMap<(String, Purpose), RecordView>>,
        counters: Mutex<HashMap<String, u32>>,
        locks: Mutex<HashSet<(String, Purpose)>>,
    }

    #[async_trait]
    impl OtpCache for InMemoryCache {
        async fn put_record(
            &self,
            identifier: &str,
            purpose: Purpose,
            view: &RecordView,
            _ttl_seconds: u64,
        ) -> Result<(), String> {
            self.views
                .lock()
                .unwrap()
                .insert((identifier.to_string(), purpose), view.clone());
            Ok(())
        }

        async fn get_record(
            &self,
            identifier: &str,
            purpose: Purpose,
        ) -> Result<Option<RecordView>, String> {
            Ok(self
                .views
                .lock()
                .unwrap()
                .get(&(identifier.to_string(), purpose))
                .cloned())
        }

        async fn invalidate_record(
            &self,
            identifier: &str,
            purpose: Purpose,
        ) -> Result<(), String> {
            self.views
                .lock()
                .unwrap()
                .remove(&(identifier.to_string(), purpose));
            Ok(())
        }

        async fn increment_attempts(
            &self,
            identifier: &str,
            purpose: Purpose,
        ) -> Result<Option<u32>, String> {
            let mut views = self.views.lock().unwrap();
            Ok(views
                .get_mut(&(identifier.to_string(), purpose))
                .map(|view| {
                    view.attempt_count += 1;
                    view.attempt_count
                }))
        }

        async fn get_issuance_count(&self, identifier: &str) -> Result<Option<u32>, String> {
            Ok(self.counters.lock().unwrap().get(identifier).copied())
        }

        async fn put_issuance_count(
            &self,
            identifier: &str,
            count: u32,
            _ttl_seconds: u64,
        ) -> Result<(), String> {
            self.counters
                .lock()
                .unwrap()
                .insert(identifier.to_string(), count);
            Ok(())
        }

        async fn increment_issuance_count(&self, identifier: &str) -> Result<Option<u32>, String> {
            let mut counters = self.counters.lock().unwrap();
            Ok(counters.get_mut(identifier).map(|count| {
                *count += 1;
                *count
            }))
        }

        async fn acquire_issuance_lock(
            &self,
            identifier: &str,
            purpose: Purpose,
            _ttl_seconds: u64,
        ) -> Result<bool, String> {
            Ok(self
                .locks
                .lock()
                .unwrap()
                .insert((identifier.to_string(), purpose)))
        }

        async fn release_issuance_lock(
            &self,
            identifier: &str,
            purpose: Purpose,
        ) -> Result<(), String> {
            self.locks
                .lock()
                .unwrap()
                .remove(&(identifier.to_string(), purpose));
            Ok(())
        }
    }

    // Notification sender that records what it delivered
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String, Purpose)>>,
    }

    impl RecordingSender {
        fn last_code_for(&self, identifier: &str) -> Option<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(to, _, _)| to == identifier)
                .map(|(_, code, _)| code.clone())
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(
            &self,
            identifier: &str,
            code: &str,
            purpose: Purpose,
        ) -> Result<bool, String> {
            self.sent.lock().unwrap().push((
                identifier.to_string(),
                code.to_string(),
                purpose,
            ));
            Ok(true)
        }
    }

    fn build_service(
        config: OtpServiceConfig,
    ) -> (
        Arc<InMemoryStore>,
        Arc<InMemoryCache>,
        OtpService<InMemoryStore, InMemoryCache>,
    ) {
        let store = Arc::new(InMemoryStore::default());
        let cache = Arc::new(InMemoryCache::default());
        let service = OtpService::new(Arc::clone(&store), Arc::clone(&cache), config);
        (store, cache, service)
    }

    fn registration_payload() -> Payload {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String("Alice".to_string()));
        fields.insert(
            "plan".to_string(),
            Value::String("starter".to_string()),
        );
        Payload::Registration { fields }
    }

    #[tokio::test]
    async fn test_full_login_flow() {
        let (store, _cache, service) = build_service(OtpServiceConfig::default());
        let sender = RecordingSender::default();

        // the application layer issues, then hands the code to the channel
        let issued = service.issue(ALICE, Purpose::Login, Payload::None).await.unwrap();
        let delivered = sender.send(ALICE, &issued.code, Purpose::Login).await.unwrap();
        assert!(delivered);

        // the user comes back with the code they received
        let submitted = sender.last_code_for(ALICE).unwrap();
        let verified = service.verify(ALICE, &submitted, Purpose::Login).await.unwrap();
        assert!(verified.payload.is_none());

        // single use: the record is gone once the deferred delete lands
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert!(store.snapshot(ALICE, Purpose::Login).is_none());

        let again = service.verify(ALICE, &submitted, Purpose::Login).await;
        assert!(matches!(again, Err(OtpError::NotFound)));
    }

    #[tokio::test]
    async fn test_attempt_ceiling_scenario() {
        let (store, _cache, service) = build_service(OtpServiceConfig::default());

        // seed a known code the way an issuance would have stored it
        let record = OtpRecord::new(
            ALICE.to_string(),
            Purpose::Register,
            "4821".to_string(),
            registration_payload(),
            DEFAULT_EXPIRATION_MINUTES,
        );
        store.upsert(&record).await.unwrap();

        // four wrong attempts count down 4, 3, 2, 1
        for expected_remaining in (1..=4).rev() {
            let result = service.verify(ALICE, "4820", Purpose::Register).await;
            match result {
                Err(OtpError::InvalidCode { attempts_remaining }) => {
                    assert_eq!(attempts_remaining, expected_remaining);
                }
                other => panic!("expected InvalidCode, got {:?}", other),
            }
        }

        // the fifth wrong attempt exhausts the code
        let fifth = service.verify(ALICE, "4820", Purpose::Register).await;
        assert!(matches!(fifth, Err(OtpError::MaxAttemptsExceeded)));

        // even the correct code is refused now; attempts are not reset
        let sixth = service.verify(ALICE, "4821", Purpose::Register).await;
        assert!(matches!(sixth, Err(OtpError::MaxAttemptsExceeded)));
    }

    #[tokio::test]
    async fn test_immediately_expiring_code_is_rejected() {
        let config = OtpServiceConfig {
            code_ttl_minutes: 0,
            ..Default::default()
        };
        let (store, _cache, service) = build_service(config);

        let issued = service.issue(ALICE, Purpose::Login, Payload::None).await.unwrap();

        let result = service.verify(ALICE, &issued.code, Purpose::Login).await;
        assert!(matches!(
            result,
            Err(OtpError::Expired) | Err(OtpError::NotFound)
        ));

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        let _ = store; // record removal is covered by the unit tests
    }

    #[tokio::test]
    async fn test_resend_preserves_registration_payload_end_to_end() {
        let (_store, _cache, service) = build_service(OtpServiceConfig::default());
        let sender = RecordingSender::default();

        let payload = registration_payload();
        let first = service
            .issue(ALICE, Purpose::Register, payload.clone())
            .await
            .unwrap();
        sender.send(ALICE, &first.code, Purpose::Register).await.unwrap();

        // user asks for a new code; the pending registration context survives
        let second = service.issue(ALICE, Purpose::Register, Payload::None).await.unwrap();
        sender.send(ALICE, &second.code, Purpose::Register).await.unwrap();

        let submitted = sender.last_code_for(ALICE).unwrap();
        let verified = service
            .verify(ALICE, &submitted, Purpose::Register)
            .await
            .unwrap();
        assert_eq!(verified.payload, payload);
    }

    #[tokio::test]
    async fn test_distinct_keys_issue_independently() {
        let (store, _cache, service) = build_service(OtpServiceConfig::default());

        let login = service.issue(ALICE, Purpose::Login, Payload::None).await.unwrap();
        let reset = service
            .issue(
                ALICE,
                Purpose::PasswordReset,
                Payload::ResetTarget { account_id: uuid::Uuid::new_v4() },
            )
            .await
            .unwrap();

        assert!(store.snapshot(ALICE, Purpose::Login).is_some());
        assert!(store.snapshot(ALICE, Purpose::PasswordReset).is_some());

        // codes are scoped: the login code does not unlock the reset flow
        if login.code != reset.code {
            let result = service.verify(ALICE, &login.code, Purpose::PasswordReset).await;
            assert!(matches!(
                result,
                Err(OtpError::InvalidCode { .. }) | Err(OtpError::MaxAttemptsExceeded)
            ));
        }
    }
}
