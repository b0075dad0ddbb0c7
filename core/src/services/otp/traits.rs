//! Traits for cache and notification integration

use async_trait::async_trait;

use crate::domain::entities::otp_record::{Purpose, RecordView};

/// Trait for the fast-path cache and the markers derived from it
///
/// The cache is advisory on the verification path: a miss or an error must
/// never be read as "no OTP exists"; the durable store stays the fallback.
#[async_trait]
pub trait OtpCache: Send + Sync {
    /// Store a record view for a key with a TTL
    async fn put_record(
        &self,
        identifier: &str,
        purpose: Purpose,
        view: &RecordView,
        ttl_seconds: u64,
    ) -> Result<(), String>;

    /// Fetch the cached record view for a key
    async fn get_record(&self, identifier: &str, purpose: Purpose)
        -> Result<Option<RecordView>, String>;

    /// Drop the cached record view for a key
    async fn invalidate_record(&self, identifier: &str, purpose: Purpose) -> Result<(), String>;

    /// Increment the cached attempt count; `None` when no view is cached
    async fn increment_attempts(&self, identifier: &str, purpose: Purpose)
        -> Result<Option<u32>, String>;

    /// Read the cached issuance count for an identifier
    async fn get_issuance_count(&self, identifier: &str) -> Result<Option<u32>, String>;

    /// Replace the cached issuance count with a TTL
    async fn put_issuance_count(
        &self,
        identifier: &str,
        count: u32,
        ttl_seconds: u64,
    ) -> Result<(), String>;

    /// Increment the cached issuance count; `None` when no counter exists,
    /// signalling the caller to recompute from the durable store
    async fn increment_issuance_count(&self, identifier: &str) -> Result<Option<u32>, String>;

    /// Atomically set the issuance lock marker if absent
    ///
    /// Returns `true` when this call acquired the lock, `false` when a
    /// concurrent issuance already holds it.
    async fn acquire_issuance_lock(
        &self,
        identifier: &str,
        purpose: Purpose,
        ttl_seconds: u64,
    ) -> Result<bool, String>;

    /// Release the issuance lock marker
    async fn release_issuance_lock(&self, identifier: &str, purpose: Purpose)
        -> Result<(), String>;
}

/// Trait for the notification channel that delivers codes
///
/// The application layer invokes this after a successful issuance; the OTP
/// core decides content and timing but never formats or transmits messages.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver a code to an identifier
    ///
    /// Returns `true` when the channel accepted the message.
    async fn send(&self, identifier: &str, code: &str, purpose: Purpose) -> Result<bool, String>;
}
