//! OTP lifecycle configuration module

use serde::{Deserialize, Serialize};

/// OTP lifecycle settings
///
/// These values gate every issuance and verification: how long a code
/// lives, how many wrong guesses it survives, and how often one identifier
/// may request a new code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpSettings {
    /// Minutes before an issued code expires
    pub code_ttl_minutes: i64,

    /// Maximum number of verification attempts per code
    pub max_attempts: u32,

    /// Maximum issuances per identifier inside the rate window
    pub rate_limit_max: u32,

    /// Rate window length in seconds
    pub rate_window_seconds: u64,

    /// Issuance lock TTL in seconds
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,

    /// Fast-path cache TTL in seconds; always clamped to the code's
    /// remaining life when a record view is cached
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            code_ttl_minutes: 10,
            max_attempts: 5,
            rate_limit_max: 5,
            rate_window_seconds: 3600,
            lock_ttl_seconds: default_lock_ttl(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl OtpSettings {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            code_ttl_minutes: env_parse("OTP_CODE_TTL_MINUTES", defaults.code_ttl_minutes),
            max_attempts: env_parse("OTP_MAX_ATTEMPTS", defaults.max_attempts),
            rate_limit_max: env_parse("OTP_RATE_LIMIT_MAX", defaults.rate_limit_max),
            rate_window_seconds: env_parse("OTP_RATE_WINDOW_SECONDS", defaults.rate_window_seconds),
            lock_ttl_seconds: env_parse("OTP_LOCK_TTL_SECONDS", defaults.lock_ttl_seconds),
            cache_ttl_seconds: env_parse("OTP_CACHE_TTL_SECONDS", defaults.cache_ttl_seconds),
        }
    }

    /// Code lifetime in seconds
    pub fn code_ttl_seconds(&self) -> u64 {
        (self.code_ttl_minutes.max(0) as u64) * 60
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_lock_ttl() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    120 // 2 minutes
}
