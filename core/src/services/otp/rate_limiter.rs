//! Sliding-window issuance rate limiting
//!
//! The window count lives in the cache; on a cache miss it is recomputed
//! from the record store's creation timestamps and written back with the
//! window as its TTL.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};

use og_shared::utils::email::mask_email;

use crate::errors::OtpResult;
use crate::repositories::record::r#trait::RecordStore;

use super::traits::OtpCache;

/// Per-identifier issuance rate limiter
pub struct RateLimiter<R: RecordStore, C: OtpCache> {
    store: Arc<R>,
    cache: Arc<C>,
    max_per_window: u32,
    window_seconds: u64,
}

impl<R: RecordStore, C: OtpCache> RateLimiter<R, C> {
    pub fn new(store: Arc<R>, cache: Arc<C>, max_per_window: u32, window_seconds: u64) -> Self {
        Self {
            store,
            cache,
            max_per_window,
            window_seconds,
        }
    }

    /// Decide whether another issuance is admitted for this identifier
    pub async fn admit(&self, identifier: &str) -> OtpResult<bool> {
        Ok(self.current_count(identifier).await? < self.max_per_window)
    }

    /// Read-only pre-check usable before attempting an issuance
    pub async fn is_limited(&self, identifier: &str) -> OtpResult<bool> {
        Ok(!self.admit(identifier).await?)
    }

    /// Charge one rate-limit unit for a completed issuance
    ///
    /// Called only after the durable upsert succeeded; a request that was
    /// refused earlier never consumes a unit. Failures here are logged and
    /// swallowed since the issuance itself already happened.
    pub async fn record_issuance(&self, identifier: &str) {
        match self.cache.increment_issuance_count(identifier).await {
            Ok(Some(count)) => {
                debug!(
                    identifier = %mask_email(identifier),
                    window_count = count,
                    "issuance counted against rate window"
                );
            }
            Ok(None) => {
                // counter evicted; recompute counts the record just written
                if let Err(e) = self.recompute(identifier).await {
                    warn!(
                        identifier = %mask_email(identifier),
                        error = %e,
                        "failed to recompute rate window after issuance"
                    );
                }
            }
            Err(e) => {
                warn!(
                    identifier = %mask_email(identifier),
                    error = %e,
                    "failed to count issuance against rate window"
                );
            }
        }
    }

    /// Current window count, recomputed from the store on a cache miss
    async fn current_count(&self, identifier: &str) -> OtpResult<u32> {
        match self.cache.get_issuance_count(identifier).await {
            Ok(Some(count)) => Ok(count),
            Ok(None) => self.recompute(identifier).await,
            Err(e) => {
                warn!(
                    identifier = %mask_email(identifier),
                    error = %e,
                    "rate window cache read failed; recomputing from store"
                );
                self.recompute(identifier).await
            }
        }
    }

    async fn recompute(&self, identifier: &str) -> OtpResult<u32> {
        let window = Duration::seconds(self.window_seconds as i64);
        let count = self.store.count_since(identifier, window).await?;

        if let Err(e) = self
            .cache
            .put_issuance_count(identifier, count, self.window_seconds)
            .await
        {
            warn!(
                identifier = %mask_email(identifier),
                error = %e,
                "failed to repopulate rate window cache"
            );
        }

        Ok(count)
    }
}
