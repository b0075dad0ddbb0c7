//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical business areas:
//! - `cache` - Redis connection settings for the fast-path cache
//! - `database` - MySQL connection and pool settings for the record store
//! - `otp` - OTP lifecycle settings (expiry, attempt ceiling, rate window)

pub mod cache;
pub mod database;
pub mod otp;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use otp::OtpSettings;

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Cache configuration
    pub cache: CacheConfig,

    /// OTP lifecycle configuration
    pub otp: OtpSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            otp: OtpSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            otp: OtpSettings::from_env(),
        }
    }
}
