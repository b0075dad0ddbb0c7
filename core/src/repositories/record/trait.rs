//! Record store trait defining the interface for durable OTP persistence.

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::entities::otp_record::{OtpRecord, Purpose};
use crate::errors::OtpResult;

/// Repository trait for durable `OtpRecord` persistence
///
/// Implementations keep at most one live record per (identifier, purpose)
/// and must provide atomic single-key operations; the verifier and the
/// issuance path both rely on never observing a half-written record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Atomically replace or insert the record for its (identifier, purpose)
    ///
    /// This must be a single atomic operation, not delete-then-insert, so a
    /// concurrent verifier never observes a window with no record.
    async fn upsert(&self, record: &OtpRecord) -> OtpResult<()>;

    /// Fetch the live record for a key
    ///
    /// # Returns
    /// * `Ok(Some(OtpRecord))` - A record exists and has not expired
    /// * `Ok(None)` - No record, or only an expired one
    async fn get_latest(&self, identifier: &str, purpose: Purpose) -> OtpResult<Option<OtpRecord>>;

    /// Increment the attempt count for a key
    ///
    /// # Returns
    /// * `Ok(u32)` - The new attempt count; 0 when no live record exists
    async fn increment_attempts(&self, identifier: &str, purpose: Purpose) -> OtpResult<u32>;

    /// Delete the record for a key
    async fn delete(&self, identifier: &str, purpose: Purpose) -> OtpResult<()>;

    /// Delete the record for a key only if it still holds `code`
    ///
    /// Guards deferred cleanup against deleting a record that a concurrent
    /// resend has already superseded.
    async fn delete_matching(&self, identifier: &str, purpose: Purpose, code: &str) -> OtpResult<()>;

    /// Count records created for an identifier inside the trailing window
    ///
    /// Used by the rate limiter to recompute its window on a cache miss.
    async fn count_since(&self, identifier: &str, window: Duration) -> OtpResult<u32>;

    /// Check whether any currently-valid record holds `code`
    ///
    /// Collision probe for the code generator; expired records don't count.
    async fn code_in_use(&self, code: &str) -> OtpResult<bool>;

    /// Delete up to `batch_size` expired records
    ///
    /// # Returns
    /// * `Ok(u32)` - Number of records deleted; a count below `batch_size`
    ///   signals exhaustion to the sweeping caller
    async fn sweep_expired(&self, batch_size: u32) -> OtpResult<u32>;
}
