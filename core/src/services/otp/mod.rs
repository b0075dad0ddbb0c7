//! OTP lifecycle module
//!
//! This module provides the complete one-time-code workflow:
//! - Code generation with collision avoidance
//! - Issuance with rate limiting, duplicate suppression, and payload carry-over
//! - Cache-first verification with a durable fallback
//! - Periodic reaping of expired records

mod config;
mod generator;
mod lock;
mod rate_limiter;
mod reaper;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::OtpServiceConfig;
pub use generator::CodeGenerator;
pub use lock::IssuanceLock;
pub use rate_limiter::RateLimiter;
pub use reaper::{Reaper, ReaperConfig, SweepOutcome, DEFAULT_SWEEP_BATCH_SIZE};
pub use service::OtpService;
pub use traits::{NotificationSender, OtpCache};
pub use types::{IssuedOtp, VerifiedOtp};
