//! Configuration for the OTP service

use og_shared::config::otp::OtpSettings;

use crate::domain::entities::otp_record::{DEFAULT_EXPIRATION_MINUTES, MAX_ATTEMPTS};

/// Configuration for the OTP service
///
/// Read once per operation from the injected instance; there is no global
/// settings singleton.
#[derive(Debug, Clone)]
pub struct OtpServiceConfig {
    /// Number of minutes before a code expires
    pub code_ttl_minutes: i64,
    /// Maximum number of verification attempts allowed per code
    pub max_attempts: u32,
    /// Maximum issuances per identifier inside the rate window
    pub rate_limit_max: u32,
    /// Rate window length in seconds
    pub rate_window_seconds: u64,
    /// Issuance lock TTL in seconds
    pub lock_ttl_seconds: u64,
    /// Fast-path cache TTL in seconds, clamped to the code's remaining life
    pub cache_ttl_seconds: u64,
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self {
            code_ttl_minutes: DEFAULT_EXPIRATION_MINUTES,
            max_attempts: MAX_ATTEMPTS,
            rate_limit_max: 5,
            rate_window_seconds: 3600,
            lock_ttl_seconds: 30,
            cache_ttl_seconds: 120,
        }
    }
}

impl From<&OtpSettings> for OtpServiceConfig {
    fn from(settings: &OtpSettings) -> Self {
        Self {
            code_ttl_minutes: settings.code_ttl_minutes,
            max_attempts: settings.max_attempts,
            rate_limit_max: settings.rate_limit_max,
            rate_window_seconds: settings.rate_window_seconds,
            lock_ttl_seconds: settings.lock_ttl_seconds,
            cache_ttl_seconds: settings.cache_ttl_seconds,
        }
    }
}
