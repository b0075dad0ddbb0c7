//! Domain-specific error types and error handling.
//!
//! Every refusal the OTP core can produce carries a stable reason code so
//! the calling layer can present purpose-specific messaging without parsing
//! error text.

use thiserror::Error;

/// Errors returned by the OTP core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Too many codes requested inside the last {window_seconds} seconds")]
    RateLimited { window_seconds: u64 },

    #[error("An issuance for this identifier and purpose is already in flight")]
    DuplicateInFlight,

    #[error("No valid code found; request a new one")]
    NotFound,

    #[error("Code has expired; request a new one")]
    Expired,

    #[error("Maximum verification attempts exceeded; request a new code")]
    MaxAttemptsExceeded,

    #[error("Invalid code; {attempts_remaining} attempt(s) remaining")]
    InvalidCode { attempts_remaining: u32 },

    #[error("Durable store unavailable: {message}")]
    StoreUnavailable { message: String },
}

impl OtpError {
    /// Stable reason code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::DuplicateInFlight => "DUPLICATE_IN_FLIGHT",
            Self::NotFound => "OTP_NOT_FOUND",
            Self::Expired => "OTP_EXPIRED",
            Self::MaxAttemptsExceeded => "MAX_ATTEMPTS_EXCEEDED",
            Self::InvalidCode { .. } => "INVALID_OTP",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
        }
    }

    /// Attempts left on the current code, when the error carries that count
    pub fn attempts_remaining(&self) -> Option<u32> {
        match self {
            Self::InvalidCode { attempts_remaining } => Some(*attempts_remaining),
            _ => None,
        }
    }
}

pub type OtpResult<T> = Result<T, OtpError>;
