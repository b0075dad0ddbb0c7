//! Main OTP service implementation

use std::sync::Arc;

use chrono::Utc;
use constant_time_eq::constant_time_eq;
use tracing::{debug, info, warn};

use og_shared::utils::email::{is_valid_email, mask_email, normalize_email};

use crate::domain::entities::otp_record::{OtpRecord, Payload, Purpose, RecordView, CODE_LENGTH};
use crate::errors::{OtpError, OtpResult};
use crate::repositories::record::r#trait::RecordStore;

use super::config::OtpServiceConfig;
use super::generator::CodeGenerator;
use super::lock::IssuanceLock;
use super::rate_limiter::RateLimiter;
use super::reaper::{sweep_until_exhausted, DEFAULT_SWEEP_BATCH_SIZE};
use super::traits::OtpCache;
use super::types::{IssuedOtp, VerifiedOtp};

/// OTP service orchestrating issuance, verification, and housekeeping
///
/// The record store and cache are the only shared mutable resources; every
/// write is scoped to a single (identifier, purpose) key, so no cross-key
/// locking is needed. Durable follow-up writes after a verification are
/// dispatched asynchronously and never change the outcome already returned.
pub struct OtpService<R: RecordStore + 'static, C: OtpCache + 'static> {
    /// Durable record store
    store: Arc<R>,
    /// Fast-path cache
    cache: Arc<C>,
    /// Per-identifier issuance rate limiter
    rate_limiter: RateLimiter<R, C>,
    /// Per-key duplicate-issuance suppression
    lock: IssuanceLock<C>,
    /// Service configuration
    config: OtpServiceConfig,
}

impl<R: RecordStore + 'static, C: OtpCache + 'static> OtpService<R, C> {
    /// Create a new OTP service
    ///
    /// # Arguments
    ///
    /// * `store` - Durable record store implementation
    /// * `cache` - Fast-path cache implementation
    /// * `config` - Service configuration
    pub fn new(store: Arc<R>, cache: Arc<C>, config: OtpServiceConfig) -> Self {
        let rate_limiter = RateLimiter::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            config.rate_limit_max,
            config.rate_window_seconds,
        );
        let lock = IssuanceLock::new(Arc::clone(&cache), config.lock_ttl_seconds);

        Self {
            store,
            cache,
            rate_limiter,
            lock,
            config,
        }
    }

    /// Issue a one-time code for an identifier and purpose
    ///
    /// This method:
    /// 1. Validates and normalizes the identifier
    /// 2. Checks the per-identifier rate window
    /// 3. Acquires the issuance lock, refusing concurrent duplicates
    /// 4. Carries the prior payload forward on a resend
    /// 5. Generates a collision-checked code and upserts the record
    /// 6. Populates the fast-path cache and charges the rate window
    ///
    /// The caller hands the returned code to the notification channel; the
    /// service itself never formats or transmits messages.
    pub async fn issue(
        &self,
        identifier: &str,
        purpose: Purpose,
        payload: Payload,
    ) -> OtpResult<IssuedOtp> {
        let identifier = self.validate_identifier(identifier)?;

        if !self.rate_limiter.admit(&identifier).await? {
            warn!(
                identifier = %mask_email(&identifier),
                purpose = %purpose,
                event = "issue_rate_limited",
                "issuance refused by rate window"
            );
            return Err(OtpError::RateLimited {
                window_seconds: self.config.rate_window_seconds,
            });
        }

        if !self.lock.try_acquire(&identifier, purpose).await {
            return Err(OtpError::DuplicateInFlight);
        }

        let result = self.issue_locked(&identifier, purpose, payload).await;
        self.lock.release(&identifier, purpose).await;
        result
    }

    /// Verify a submitted code for an identifier and purpose
    ///
    /// Consults the fast-path cache first; on a miss the durable store is
    /// read, the cache repopulated, and the check re-run exactly once. A
    /// matching code removes the record (single use); a mismatch consumes
    /// one attempt.
    pub async fn verify(
        &self,
        identifier: &str,
        code: &str,
        purpose: Purpose,
    ) -> OtpResult<VerifiedOtp> {
        let identifier = self.validate_identifier(identifier)?;
        self.validate_code_format(code)?;

        // Fast path
        match self.cache.get_record(&identifier, purpose).await {
            Ok(Some(view)) => return self.check_view(&identifier, purpose, view, code).await,
            Ok(None) => {}
            Err(e) => {
                warn!(
                    identifier = %mask_email(&identifier),
                    purpose = %purpose,
                    error = %e,
                    "cache read failed; falling back to store"
                );
            }
        }

        // Cache miss is advisory; the store decides whether a code exists
        let record = self
            .store
            .get_latest(&identifier, purpose)
            .await?
            .ok_or(OtpError::NotFound)?;

        let view = record.view();
        let ttl = self.view_cache_ttl(&view);
        if let Err(e) = self
            .cache
            .put_record(&identifier, purpose, &view, ttl)
            .await
        {
            warn!(
                identifier = %mask_email(&identifier),
                purpose = %purpose,
                error = %e,
                event = "cache_populate_failed",
                "failed to repopulate record view"
            );
        }

        self.check_view(&identifier, purpose, view, code).await
    }

    /// Delete all expired records from the durable store
    ///
    /// Invoked by an external scheduler. Best-effort housekeeping: failures
    /// are logged, nothing is propagated, since expired records are already
    /// rejected by the verification path.
    pub async fn purge_expired(&self) {
        let outcome = sweep_until_exhausted(self.store.as_ref(), DEFAULT_SWEEP_BATCH_SIZE).await;

        info!(
            deleted = outcome.deleted,
            event = "purge_expired",
            "expired-record purge finished"
        );
    }

    /// Read-only rate-limit pre-check for an identifier
    pub async fn is_rate_limited(&self, identifier: &str) -> OtpResult<bool> {
        let identifier = self.validate_identifier(identifier)?;
        self.rate_limiter.is_limited(&identifier).await
    }

    /// Issuance body executed while holding the issuance lock
    async fn issue_locked(
        &self,
        identifier: &str,
        purpose: Purpose,
        payload: Payload,
    ) -> OtpResult<IssuedOtp> {
        // A resend without an explicit payload keeps the prior context
        let payload = if payload.is_none() {
            self.store
                .get_latest(identifier, purpose)
                .await?
                .map(|prior| prior.payload)
                .unwrap_or(Payload::None)
        } else {
            payload
        };

        let code = CodeGenerator::generate_unique(self.store.as_ref()).await?;
        let record = OtpRecord::new(
            identifier.to_string(),
            purpose,
            code.clone(),
            payload,
            self.config.code_ttl_minutes,
        );

        self.store.upsert(&record).await?;

        info!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            event = "otp_issued",
            session_id = %record.id,
            "issued one-time code"
        );

        let view = record.view();
        let ttl = self.view_cache_ttl(&view);
        if let Err(e) = self.cache.put_record(identifier, purpose, &view, ttl).await {
            warn!(
                identifier = %mask_email(identifier),
                purpose = %purpose,
                error = %e,
                event = "cache_populate_failed",
                "failed to cache freshly issued record"
            );
        }

        // Charged only now that the issuance actually succeeded
        self.rate_limiter.record_issuance(identifier).await;

        Ok(IssuedOtp {
            code,
            expires_at: record.expires_at,
        })
    }

    /// Run the expiry, ceiling, and comparison checks against a record view
    async fn check_view(
        &self,
        identifier: &str,
        purpose: Purpose,
        view: RecordView,
        code: &str,
    ) -> OtpResult<VerifiedOtp> {
        let now = Utc::now();

        if view.is_expired_at(now) {
            self.invalidate_view(identifier, purpose).await;
            self.spawn_durable_delete(identifier, purpose, None);
            info!(
                identifier = %mask_email(identifier),
                purpose = %purpose,
                event = "otp_expired",
                "rejected expired code"
            );
            return Err(OtpError::Expired);
        }

        if view.attempt_count >= self.config.max_attempts {
            self.invalidate_view(identifier, purpose).await;
            warn!(
                identifier = %mask_email(identifier),
                purpose = %purpose,
                event = "max_attempts_exceeded",
                "code exhausted; no attempts consumed"
            );
            return Err(OtpError::MaxAttemptsExceeded);
        }

        // Exact string equality on the zero-padded code
        if constant_time_eq(view.code.as_bytes(), code.as_bytes()) {
            self.invalidate_view(identifier, purpose).await;
            self.spawn_durable_delete(identifier, purpose, Some(view.code.clone()));
            info!(
                identifier = %mask_email(identifier),
                purpose = %purpose,
                event = "otp_verified",
                "code verified"
            );
            return Ok(VerifiedOtp {
                payload: view.payload,
            });
        }

        let new_count = match self.cache.increment_attempts(identifier, purpose).await {
            Ok(Some(count)) => count,
            Ok(None) => view.attempt_count + 1,
            Err(e) => {
                warn!(
                    identifier = %mask_email(identifier),
                    purpose = %purpose,
                    error = %e,
                    "failed to bump cached attempt count"
                );
                view.attempt_count + 1
            }
        };
        self.spawn_durable_attempt_update(identifier, purpose);

        if new_count >= self.config.max_attempts {
            warn!(
                identifier = %mask_email(identifier),
                purpose = %purpose,
                event = "max_attempts_exceeded",
                "wrong code consumed the last attempt"
            );
            return Err(OtpError::MaxAttemptsExceeded);
        }

        let attempts_remaining = self.config.max_attempts - new_count;
        warn!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            event = "otp_mismatch",
            attempts_remaining = attempts_remaining,
            "wrong code submitted"
        );
        Err(OtpError::InvalidCode { attempts_remaining })
    }

    /// Normalize the identifier, rejecting malformed input before any
    /// cache or store access
    fn validate_identifier(&self, identifier: &str) -> OtpResult<String> {
        let normalized = normalize_email(identifier);
        if !is_valid_email(&normalized) {
            return Err(OtpError::InvalidInput {
                message: "malformed identifier".to_string(),
            });
        }
        Ok(normalized)
    }

    /// Reject codes that are not exactly CODE_LENGTH digits
    fn validate_code_format(&self, code: &str) -> OtpResult<()> {
        if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpError::InvalidInput {
                message: "malformed code".to_string(),
            });
        }
        Ok(())
    }

    /// Cache TTL for a view: the configured TTL, clamped so the cached view
    /// can never outlive its record
    fn view_cache_ttl(&self, view: &RecordView) -> u64 {
        let remaining = (view.expires_at - Utc::now()).num_seconds().max(0) as u64;
        self.config.cache_ttl_seconds.min(remaining)
    }

    async fn invalidate_view(&self, identifier: &str, purpose: Purpose) {
        if let Err(e) = self.cache.invalidate_record(identifier, purpose).await {
            warn!(
                identifier = %mask_email(identifier),
                purpose = %purpose,
                error = %e,
                "failed to invalidate cached record view"
            );
        }
    }

    /// Dispatch the durable record delete that follows a verification
    ///
    /// With a code the delete is guarded against a concurrent resend having
    /// superseded the record. Failures are logged; the verification outcome
    /// already returned stands.
    fn spawn_durable_delete(&self, identifier: &str, purpose: Purpose, code: Option<String>) {
        let store = Arc::clone(&self.store);
        let identifier = identifier.to_string();

        tokio::spawn(async move {
            let result = match &code {
                Some(code) => store.delete_matching(&identifier, purpose, code).await,
                None => store.delete(&identifier, purpose).await,
            };
            match result {
                Ok(()) => debug!(
                    identifier = %mask_email(&identifier),
                    purpose = %purpose,
                    "deferred record delete applied"
                ),
                Err(e) => warn!(
                    identifier = %mask_email(&identifier),
                    purpose = %purpose,
                    error = %e,
                    event = "durable_cleanup_failed",
                    "deferred record delete failed"
                ),
            }
        });
    }

    /// Dispatch the durable attempt-count bump that follows a mismatch
    fn spawn_durable_attempt_update(&self, identifier: &str, purpose: Purpose) {
        let store = Arc::clone(&self.store);
        let identifier = identifier.to_string();

        tokio::spawn(async move {
            if let Err(e) = store.increment_attempts(&identifier, purpose).await {
                warn!(
                    identifier = %mask_email(&identifier),
                    purpose = %purpose,
                    error = %e,
                    event = "durable_cleanup_failed",
                    "deferred attempt-count update failed"
                );
            }
        });
    }
}
