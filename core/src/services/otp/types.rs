//! Types for OTP service results

use chrono::{DateTime, Utc};

use crate::domain::entities::otp_record::Payload;

/// Result of a successful issuance
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    /// The issued code, ready to hand to the notification channel
    pub code: String,
    /// When the code stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful verification
#[derive(Debug, Clone)]
pub struct VerifiedOtp {
    /// Payload captured at issuance (registration fields or reset target)
    pub payload: Payload,
}
