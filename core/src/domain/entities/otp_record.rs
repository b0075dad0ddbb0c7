//! OTP record entity for email-gated login, registration, and reset flows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Maximum number of verification attempts allowed
pub const MAX_ATTEMPTS: u32 = 5;

/// Length of the one-time code
pub const CODE_LENGTH: usize = 4;

/// Default expiration time for one-time codes (10 minutes)
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 10;

/// The flow an OTP is scoped to
///
/// A code issued for one purpose is never accepted by another; the purpose
/// is part of the record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Login,
    Register,
    PasswordReset,
}

impl Purpose {
    /// All purposes, in a fixed order
    pub const ALL: [Purpose; 3] = [Purpose::Login, Purpose::Register, Purpose::PasswordReset];

    /// Stable string tag used in storage and cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Login => "login",
            Purpose::Register => "register",
            Purpose::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(Purpose::Login),
            "register" => Ok(Purpose::Register),
            "password_reset" => Ok(Purpose::PasswordReset),
            other => Err(format!("unknown OTP purpose: {}", other)),
        }
    }
}

/// Purpose-specific data carried alongside a code
///
/// Registration keeps the pending form fields until the email is proven;
/// password reset keeps the target account reference. Login carries nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    None,
    Registration { fields: Map<String, Value> },
    ResetTarget { account_id: Uuid },
}

impl Payload {
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::None
    }
}

/// One-time code record, at most one live per (identifier, purpose)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Normalized email address the code was issued against
    pub identifier: String,

    /// The flow this code is scoped to
    pub purpose: Purpose,

    /// The zero-padded numeric code
    pub code: String,

    /// Purpose-specific context captured at issuance
    pub payload: Payload,

    /// Timestamp when the code was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the code expires
    pub expires_at: DateTime<Utc>,

    /// Number of failed verification attempts made
    pub attempt_count: u32,
}

impl OtpRecord {
    /// Creates a new record for an already-generated code
    ///
    /// # Arguments
    ///
    /// * `identifier` - Normalized email address
    /// * `purpose` - The flow the code gates
    /// * `code` - The zero-padded numeric code
    /// * `payload` - Purpose-specific context (may be `Payload::None`)
    /// * `ttl_minutes` - Minutes until the code expires
    pub fn new(
        identifier: String,
        purpose: Purpose,
        code: String,
        payload: Payload,
        ttl_minutes: i64,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            identifier,
            purpose,
            code,
            payload,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
            attempt_count: 0,
        }
    }

    /// Checks expiry against a supplied instant
    ///
    /// The boundary is closed-open: a record whose `expires_at` equals
    /// `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Checks whether the attempt ceiling has been reached
    pub fn is_exhausted(&self, ceiling: u32) -> bool {
        self.attempt_count >= ceiling
    }

    /// Time left before expiry, zero once passed
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }

    /// Cache projection of this record
    pub fn view(&self) -> RecordView {
        RecordView {
            code: self.code.clone(),
            expires_at: self.expires_at,
            attempt_count: self.attempt_count,
            payload: self.payload.clone(),
        }
    }
}

/// The slice of a record the fast-path cache carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    /// The zero-padded numeric code
    pub code: String,

    /// Timestamp when the code expires
    pub expires_at: DateTime<Utc>,

    /// Number of failed verification attempts made
    pub attempt_count: u32,

    /// Purpose-specific context captured at issuance
    pub payload: Payload,
}

impl RecordView {
    /// Checks expiry against a supplied instant (closed-open boundary)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration_fields() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String("Alice".to_string()));
        fields.insert("email".to_string(), Value::String("alice@example.com".to_string()));
        fields
    }

    #[test]
    fn test_new_record() {
        let record = OtpRecord::new(
            "alice@example.com".to_string(),
            Purpose::Login,
            "0042".to_string(),
            Payload::None,
            DEFAULT_EXPIRATION_MINUTES,
        );

        assert_eq!(record.identifier, "alice@example.com");
        assert_eq!(record.code.len(), CODE_LENGTH);
        assert_eq!(record.attempt_count, 0);
        assert_eq!(
            record.expires_at,
            record.created_at + Duration::minutes(DEFAULT_EXPIRATION_MINUTES)
        );
        assert!(!record.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary_is_closed_open() {
        let record = OtpRecord::new(
            "alice@example.com".to_string(),
            Purpose::Login,
            "4821".to_string(),
            Payload::None,
            DEFAULT_EXPIRATION_MINUTES,
        );

        // exactly at expires_at counts as expired
        assert!(record.is_expired_at(record.expires_at));
        // one tick before is still live
        assert!(!record.is_expired_at(record.expires_at - Duration::milliseconds(1)));
    }

    #[test]
    fn test_is_exhausted() {
        let mut record = OtpRecord::new(
            "alice@example.com".to_string(),
            Purpose::Register,
            "1234".to_string(),
            Payload::None,
            DEFAULT_EXPIRATION_MINUTES,
        );

        assert!(!record.is_exhausted(MAX_ATTEMPTS));
        record.attempt_count = MAX_ATTEMPTS;
        assert!(record.is_exhausted(MAX_ATTEMPTS));
    }

    #[test]
    fn test_remaining_ttl_floors_at_zero() {
        let record = OtpRecord::new(
            "alice@example.com".to_string(),
            Purpose::Login,
            "1234".to_string(),
            Payload::None,
            DEFAULT_EXPIRATION_MINUTES,
        );

        assert!(record.remaining_ttl(record.created_at) > Duration::zero());
        assert_eq!(
            record.remaining_ttl(record.expires_at + Duration::minutes(1)),
            Duration::zero()
        );
    }

    #[test]
    fn test_view_projection() {
        let record = OtpRecord::new(
            "alice@example.com".to_string(),
            Purpose::Register,
            "9001".to_string(),
            Payload::Registration { fields: registration_fields() },
            DEFAULT_EXPIRATION_MINUTES,
        );

        let view = record.view();
        assert_eq!(view.code, record.code);
        assert_eq!(view.expires_at, record.expires_at);
        assert_eq!(view.attempt_count, record.attempt_count);
        assert_eq!(view.payload, record.payload);
    }

    #[test]
    fn test_purpose_round_trip() {
        for purpose in Purpose::ALL {
            let parsed: Purpose = purpose.as_str().parse().unwrap();
            assert_eq!(parsed, purpose);
        }
        assert!("sms_2fa".parse::<Purpose>().is_err());
    }

    #[test]
    fn test_payload_serialization() {
        let payload = Payload::Registration { fields: registration_fields() };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"registration\""));

        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_record_view_serialization() {
        let record = OtpRecord::new(
            "alice@example.com".to_string(),
            Purpose::PasswordReset,
            "0007".to_string(),
            Payload::ResetTarget { account_id: Uuid::new_v4() },
            DEFAULT_EXPIRATION_MINUTES,
        );

        let json = serde_json::to_string(&record.view()).unwrap();
        let back: RecordView = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record.view());
    }
}
