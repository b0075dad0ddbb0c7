//! Redis implementation of the OTP fast-path cache
//!
//! This module backs the three cache-derived structures of the OTP core:
//! - Record views, JSON-serialized under a short TTL
//! - Per-identifier issuance counters for the rate window
//! - Issuance lock markers, set atomically with NX
//!
//! Key patterns:
//! - `otp:view:{purpose}:{identifier}` - cached record view
//! - `otp:rate:{sha256(identifier)}` - rate window counter
//! - `otp:lock:{purpose}:{identifier}` - issuance lock marker

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use og_core::domain::entities::otp_record::{Purpose, RecordView};
use og_core::services::otp::OtpCache;
use og_shared::utils::email::mask_email;

use crate::cache::RedisClient;

/// Redis key prefix for cached record views
const VIEW_KEY_PREFIX: &str = "otp:view";

/// Redis key prefix for rate window counters
const RATE_KEY_PREFIX: &str = "otp:rate";

/// Redis key prefix for issuance lock markers
const LOCK_KEY_PREFIX: &str = "otp:lock";

/// Redis-backed fast-path cache for the OTP lifecycle
#[derive(Clone)]
pub struct RedisOtpCache {
    /// Redis client for cache operations
    redis_client: RedisClient,
}

impl RedisOtpCache {
    /// Create a new Redis OTP cache
    pub fn new(redis_client: RedisClient) -> Self {
        Self { redis_client }
    }

    /// Format Redis key for a cached record view
    fn view_key(identifier: &str, purpose: Purpose) -> String {
        format!("{}:{}:{}", VIEW_KEY_PREFIX, purpose.as_str(), identifier)
    }

    /// Format Redis key for a rate window counter
    ///
    /// The identifier is hashed so raw addresses never appear in key
    /// listings or monitoring output.
    fn rate_key(identifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        format!("{}:{:x}", RATE_KEY_PREFIX, hasher.finalize())
    }

    /// Format Redis key for an issuance lock marker
    fn lock_key(identifier: &str, purpose: Purpose) -> String {
        format!("{}:{}:{}", LOCK_KEY_PREFIX, purpose.as_str(), identifier)
    }
}

#[async_trait]
impl OtpCache for RedisOtpCache {
    async fn put_record(
        &self,
        identifier: &str,
        purpose: Purpose,
        view: &RecordView,
        ttl_seconds: u64,
    ) -> Result<(), String> {
        let key = Self::view_key(identifier, purpose);

        // a zero TTL means the record is on its expiry boundary already
        if ttl_seconds == 0 {
            let _ = self.redis_client.delete(&key).await;
            return Ok(());
        }

        let view_json = serde_json::to_string(view)
            .map_err(|e| format!("failed to serialize record view: {}", e))?;

        self.redis_client
            .set_with_expiry(&key, &view_json, ttl_seconds)
            .await
            .map_err(|e| e.to_string())?;

        debug!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            ttl_seconds = ttl_seconds,
            "cached record view"
        );

        Ok(())
    }

    async fn get_record(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<Option<RecordView>, String> {
        let key = Self::view_key(identifier, purpose);

        match self.redis_client.get(&key).await.map_err(|e| e.to_string())? {
            Some(view_json) => {
                let view: RecordView = serde_json::from_str(&view_json)
                    .map_err(|e| format!("failed to deserialize record view: {}", e))?;
                Ok(Some(view))
            }
            None => Ok(None),
        }
    }

    async fn invalidate_record(&self, identifier: &str, purpose: Purpose) -> Result<(), String> {
        let key = Self::view_key(identifier, purpose);
        self.redis_client
            .delete(&key)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn increment_attempts(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<Option<u32>, String> {
        let key = Self::view_key(identifier, purpose);

        let view_json = match self.redis_client.get(&key).await.map_err(|e| e.to_string())? {
            Some(json) => json,
            None => return Ok(None),
        };

        let mut view: RecordView = serde_json::from_str(&view_json)
            .map_err(|e| format!("failed to deserialize record view: {}", e))?;
        view.attempt_count += 1;

        // keep whatever window the entry had left
        let remaining_ttl = self
            .redis_client
            .ttl(&key)
            .await
            .map_err(|e| e.to_string())?
            .unwrap_or(1)
            .max(1) as u64;

        let updated_json = serde_json::to_string(&view)
            .map_err(|e| format!("failed to serialize record view: {}", e))?;
        self.redis_client
            .set_with_expiry(&key, &updated_json, remaining_ttl)
            .await
            .map_err(|e| e.to_string())?;

        debug!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            attempt_count = view.attempt_count,
            "bumped cached attempt count"
        );

        Ok(Some(view.attempt_count))
    }

    async fn get_issuance_count(&self, identifier: &str) -> Result<Option<u32>, String> {
        let key = Self::rate_key(identifier);

        match self.redis_client.get(&key).await.map_err(|e| e.to_string())? {
            Some(count_str) => match count_str.parse::<u32>() {
                Ok(count) => Ok(Some(count)),
                Err(_) => {
                    warn!(
                        identifier = %mask_email(identifier),
                        "rate counter held a non-numeric value; dropping it"
                    );
                    let _ = self.redis_client.delete(&key).await;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn put_issuance_count(
        &self,
        identifier: &str,
        count: u32,
        ttl_seconds: u64,
    ) -> Result<(), String> {
        let key = Self::rate_key(identifier);
        self.redis_client
            .set_with_expiry(&key, &count.to_string(), ttl_seconds.max(1))
            .await
            .map_err(|e| e.to_string())
    }

    async fn increment_issuance_count(&self, identifier: &str) -> Result<Option<u32>, String> {
        let key = Self::rate_key(identifier);

        // an absent counter signals the caller to recompute from the store
        if !self.redis_client.exists(&key).await.map_err(|e| e.to_string())? {
            return Ok(None);
        }

        let count = self
            .redis_client
            .increment(&key, None)
            .await
            .map_err(|e| e.to_string())?;

        Ok(Some(count.max(0) as u32))
    }

    async fn acquire_issuance_lock(
        &self,
        identifier: &str,
        purpose: Purpose,
        ttl_seconds: u64,
    ) -> Result<bool, String> {
        let key = Self::lock_key(identifier, purpose);
        let acquired = self
            .redis_client
            .set_if_absent(&key, "locked", ttl_seconds.max(1))
            .await
            .map_err(|e| e.to_string())?;

        debug!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            acquired = acquired,
            "issuance lock attempt"
        );

        Ok(acquired)
    }

    async fn release_issuance_lock(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<(), String> {
        let key = Self::lock_key(identifier, purpose);
        self.redis_client
            .delete(&key)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_and_lock_keys_are_purpose_scoped() {
        let login = RedisOtpCache::view_key("alice@example.com", Purpose::Login);
        let register = RedisOtpCache::view_key("alice@example.com", Purpose::Register);
        assert_ne!(login, register);
        assert!(login.starts_with("otp:view:login:"));

        let lock = RedisOtpCache::lock_key("alice@example.com", Purpose::PasswordReset);
        assert_eq!(lock, "otp:lock:password_reset:alice@example.com");
    }

    #[test]
    fn test_rate_key_hashes_identifier() {
        let key = RedisOtpCache::rate_key("alice@example.com");
        assert!(key.starts_with("otp:rate:"));
        assert!(!key.contains("alice"));
        // stable across calls
        assert_eq!(key, RedisOtpCache::rate_key("alice@example.com"));
    }
}
