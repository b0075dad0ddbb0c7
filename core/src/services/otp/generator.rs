//! Fixed-width numeric code generation with collision avoidance

use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use tracing::warn;

use crate::domain::entities::otp_record::CODE_LENGTH;
use crate::errors::OtpResult;
use crate::repositories::record::r#trait::RecordStore;

/// Number of generation tries before falling back to a time-derived code
const MAX_GENERATION_TRIES: usize = 3;

/// Size of the numeric code space (10^CODE_LENGTH)
const CODE_SPACE: u64 = 10_000;

/// Generator for zero-padded numeric one-time codes
pub struct CodeGenerator;

impl CodeGenerator {
    /// Generate a random zero-padded code drawn from the full code space
    ///
    /// Uses OsRng (OS-provided CSPRNG) for secure random number generation.
    pub fn generate() -> String {
        let mut rng = OsRng;
        let mut bytes = [0u8; 8];
        rng.fill_bytes(&mut bytes);
        let num = u64::from_le_bytes(bytes) % CODE_SPACE;
        format!("{:0width$}", num, width = CODE_LENGTH)
    }

    /// Generate a code that no other currently-valid record holds
    ///
    /// Tries up to [`MAX_GENERATION_TRIES`] times, probing the store for a
    /// collision on each try. When every try collides, falls back to a code
    /// derived from the current time, keeping issuance available under
    /// pathological collision rates at the cost of uniform randomness.
    pub async fn generate_unique<R: RecordStore + ?Sized>(store: &R) -> OtpResult<String> {
        for _ in 0..MAX_GENERATION_TRIES {
            let code = Self::generate();
            if !store.code_in_use(&code).await? {
                return Ok(code);
            }
        }

        warn!(
            event = "code_collision_fallback",
            "all generation tries collided; deriving code from the clock"
        );
        Ok(Self::time_derived())
    }

    /// Clock-derived fallback code used when generation keeps colliding
    fn time_derived() -> String {
        let micros = Utc::now().timestamp_micros().unsigned_abs();
        format!("{:0width$}", micros % CODE_SPACE, width = CODE_LENGTH)
    }
}
