//! Shared utilities and common types for the OtpGate server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types
//! - Email utility functions (validation, normalization, masking)

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{AppConfig, CacheConfig, DatabaseConfig, OtpSettings};
pub use utils::email;
