//! Issuance lock suppressing concurrent duplicate issuance
//!
//! The lock is an atomic set-if-absent marker in the cache, scoped to one
//! (identifier, purpose) key and held only for the duration of a single
//! issuance call. Its short TTL is the backstop that frees the key when a
//! holder crashes mid-operation.

use std::sync::Arc;

use tracing::{debug, warn};

use og_shared::utils::email::mask_email;

use crate::domain::entities::otp_record::Purpose;

use super::traits::OtpCache;

/// Short-TTL mutual-exclusion marker per (identifier, purpose)
pub struct IssuanceLock<C: OtpCache> {
    cache: Arc<C>,
    ttl_seconds: u64,
}

impl<C: OtpCache> IssuanceLock<C> {
    pub fn new(cache: Arc<C>, ttl_seconds: u64) -> Self {
        Self { cache, ttl_seconds }
    }

    /// Attempt to acquire the lock for a key
    ///
    /// Returns `false` when a concurrent issuance already holds it; the
    /// caller must then reject the request as a duplicate. A cache failure
    /// degrades to an acquired lock so issuance stays available without its
    /// duplicate suppression.
    pub async fn try_acquire(&self, identifier: &str, purpose: Purpose) -> bool {
        match self
            .cache
            .acquire_issuance_lock(identifier, purpose, self.ttl_seconds)
            .await
        {
            Ok(acquired) => {
                if !acquired {
                    debug!(
                        identifier = %mask_email(identifier),
                        purpose = %purpose,
                        event = "issuance_lock_contended",
                        "concurrent issuance already holds the lock"
                    );
                }
                acquired
            }
            Err(e) => {
                warn!(
                    identifier = %mask_email(identifier),
                    purpose = %purpose,
                    error = %e,
                    "issuance lock unavailable; proceeding without duplicate suppression"
                );
                true
            }
        }
    }

    /// Release the lock after the issuance completes
    ///
    /// Best effort: the TTL reclaims the key if this fails.
    pub async fn release(&self, identifier: &str, purpose: Purpose) {
        if let Err(e) = self.cache.release_issuance_lock(identifier, purpose).await {
            warn!(
                identifier = %mask_email(identifier),
                purpose = %purpose,
                error = %e,
                "failed to release issuance lock; TTL will reclaim it"
            );
        }
    }
}
