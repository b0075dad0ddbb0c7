//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer for the OtpGate
//! application, following Clean Architecture principles. It provides
//! concrete implementations for the durable record store, the fast-path
//! cache, and the mail notification channel.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL record store using SQLx
//! - **Cache**: Redis client backing the fast-path cache, rate windows,
//!   and issuance lock markers
//! - **Email**: Mail delivery implementations (HTTP mail API, mock)
//!
//! ## Features
//!
//! - `mysql`: Enable the MySQL record store (default)
//! - `redis-cache`: Enable Redis caching support (default)
//! - `mock-services`: Enable mock implementations for testing

// Re-export core types for convenience
pub use og_core::errors::*;

/// Database module - MySQL record store using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Cache module - Redis client and the fast-path cache
pub mod cache;

/// Email module - mail delivery for issued codes
pub mod email;

/// Configuration module for infrastructure services
pub mod config {
    //! Configuration management for infrastructure services
    //!
    //! Handles:
    //! - Database connection strings
    //! - Redis configuration
    //! - Mail API credentials

    use og_shared::config::{cache::CacheConfig, database::DatabaseConfig};
    use serde::{Deserialize, Serialize};

    /// Infrastructure configuration settings
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct InfrastructureConfig {
        /// Database configuration
        pub database: DatabaseConfig,
        /// Redis cache configuration
        pub cache: CacheConfig,
        /// Mail service configuration
        pub mailer: MailerConfig,
    }

    /// Mail service configuration
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MailerConfig {
        /// Mail provider ("http", "mock")
        pub provider: String,
        /// Mail API endpoint URL
        pub api_url: String,
        /// Mail API key
        pub api_key: String,
        /// From address for outgoing mail
        pub from_address: String,
    }

    impl Default for InfrastructureConfig {
        fn default() -> Self {
            Self {
                database: DatabaseConfig::default(),
                cache: CacheConfig::default(),
                mailer: MailerConfig {
                    provider: "mock".to_string(),
                    api_url: String::new(),
                    api_key: String::new(),
                    from_address: "no-reply@otpgate.test".to_string(),
                },
            }
        }
    }
}

/// Load infrastructure configuration from environment
pub fn load_config() -> config::InfrastructureConfig {
    dotenvy::dotenv().ok(); // Load .env file if present

    let database = og_shared::config::database::DatabaseConfig::from_env();
    let cache = og_shared::config::cache::CacheConfig::from_env();

    let mailer = config::MailerConfig {
        provider: std::env::var("MAIL_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
        api_url: std::env::var("MAIL_API_URL").unwrap_or_default(),
        api_key: std::env::var("MAIL_API_KEY").unwrap_or_default(),
        from_address: std::env::var("MAIL_FROM_ADDRESS")
            .unwrap_or_else(|_| "no-reply@otpgate.test".to_string()),
    };

    config::InfrastructureConfig {
        database,
        cache,
        mailer,
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mail service error
    #[error("Mail service error: {0}")]
    Mail(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}
