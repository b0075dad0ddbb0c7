//! Business services containing domain logic and use cases.

pub mod otp;

// Re-export commonly used types
pub use otp::{
    CodeGenerator, IssuanceLock, IssuedOtp, NotificationSender, OtpCache,
    OtpService, OtpServiceConfig, RateLimiter, Reaper, ReaperConfig,
    SweepOutcome, VerifiedOtp,
};
