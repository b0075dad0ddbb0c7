//! Domain entities representing core business objects.

pub mod otp_record;

// Re-export commonly used types
pub use otp_record::{
    OtpRecord, Payload, Purpose, RecordView,
    MAX_ATTEMPTS, CODE_LENGTH, DEFAULT_EXPIRATION_MINUTES,
};
