//! MySQL record store for durable OTP persistence
//!
//! One row per (email, purpose), enforced by a composite unique key so the
//! upsert is a single atomic `INSERT ... ON DUPLICATE KEY UPDATE`.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE otp_codes (
//!     id            CHAR(36)     NOT NULL,
//!     email         VARCHAR(100) NOT NULL,
//!     purpose       VARCHAR(20)  NOT NULL,
//!     code          VARCHAR(8)   NOT NULL,
//!     payload       JSON         NULL,
//!     created_at    DATETIME(6)  NOT NULL,
//!     expires_at    DATETIME(6)  NOT NULL,
//!     attempt_count INT UNSIGNED NOT NULL DEFAULT 0,
//!     PRIMARY KEY (id),
//!     UNIQUE KEY uq_email_purpose (email, purpose),
//!     KEY idx_expires_at (expires_at),
//!     KEY idx_email_created (email, created_at)
//! );
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

use og_core::domain::entities::otp_record::{OtpRecord, Payload, Purpose};
use og_core::errors::{OtpError, OtpResult};
use og_core::repositories::RecordStore;
use og_shared::config::database::DatabaseConfig;
use og_shared::utils::email::mask_email;

use crate::InfrastructureError;

/// MySQL implementation of the durable record store
pub struct MySqlRecordStore {
    /// Database connection pool
    pool: Pool<MySql>,
}

impl MySqlRecordStore {
    /// Create a new record store over an existing pool
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Connect a new pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout))
            .max_lifetime(std::time::Duration::from_secs(config.max_lifetime))
            .connect(&config.url)
            .await?;

        info!("Connected MySQL record store pool");

        Ok(Self::new(pool))
    }

    fn store_error(context: &str, error: sqlx::Error) -> OtpError {
        error!(error = %error, "{}", context);
        OtpError::StoreUnavailable {
            message: format!("{}: {}", context, error),
        }
    }

    fn row_to_record(row: &sqlx::mysql::MySqlRow) -> OtpResult<OtpRecord> {
        let corrupt = |context: &str, detail: String| OtpError::StoreUnavailable {
            message: format!("{}: {}", context, detail),
        };

        let id_str: String = row
            .try_get("id")
            .map_err(|e| corrupt("failed to read id", e.to_string()))?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| corrupt("invalid record id", e.to_string()))?;

        let purpose_str: String = row
            .try_get("purpose")
            .map_err(|e| corrupt("failed to read purpose", e.to_string()))?;
        let purpose = Purpose::from_str(&purpose_str)
            .map_err(|e| corrupt("invalid purpose tag", e))?;

        let payload_json: Option<String> = row
            .try_get("payload")
            .map_err(|e| corrupt("failed to read payload", e.to_string()))?;
        let payload = match payload_json {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| corrupt("invalid payload JSON", e.to_string()))?,
            None => Payload::None,
        };

        Ok(OtpRecord {
            id,
            identifier: row
                .try_get("email")
                .map_err(|e| corrupt("failed to read email", e.to_string()))?,
            purpose,
            code: row
                .try_get("code")
                .map_err(|e| corrupt("failed to read code", e.to_string()))?,
            payload,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| corrupt("failed to read created_at", e.to_string()))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| corrupt("failed to read expires_at", e.to_string()))?,
            attempt_count: row
                .try_get::<u32, _>("attempt_count")
                .map_err(|e| corrupt("failed to read attempt_count", e.to_string()))?,
        })
    }

    fn payload_json(payload: &Payload) -> OtpResult<Option<String>> {
        if payload.is_none() {
            return Ok(None);
        }
        serde_json::to_string(payload)
            .map(Some)
            .map_err(|e| OtpError::StoreUnavailable {
                message: format!("failed to serialize payload: {}", e),
            })
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn upsert(&self, record: &OtpRecord) -> OtpResult<()> {
        let query = r#"
            INSERT INTO otp_codes (
                id, email, purpose, code, payload,
                created_at, expires_at, attempt_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                id = VALUES(id),
                code = VALUES(code),
                payload = VALUES(payload),
                created_at = VALUES(created_at),
                expires_at = VALUES(expires_at),
                attempt_count = VALUES(attempt_count)
        "#;

        sqlx::query(query)
            .bind(record.id.to_string())
            .bind(&record.identifier)
            .bind(record.purpose.as_str())
            .bind(&record.code)
            .bind(Self::payload_json(&record.payload)?)
            .bind(record.created_at)
            .bind(record.expires_at)
            .bind(record.attempt_count)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::store_error("failed to upsert OTP record", e))?;

        debug!(
            identifier = %mask_email(&record.identifier),
            purpose = %record.purpose,
            "upserted OTP record"
        );

        Ok(())
    }

    async fn get_latest(&self, identifier: &str, purpose: Purpose) -> OtpResult<Option<OtpRecord>> {
        let query = r#"
            SELECT id, email, purpose, code, payload,
                   created_at, expires_at, attempt_count
            FROM otp_codes
            WHERE email = ? AND purpose = ? AND expires_at > ?
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(identifier)
            .bind(purpose.as_str())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::store_error("failed to fetch OTP record", e))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn increment_attempts(&self, identifier: &str, purpose: Purpose) -> OtpResult<u32> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE otp_codes
            SET attempt_count = attempt_count + 1
            WHERE email = ? AND purpose = ? AND expires_at > ?
            "#,
        )
        .bind(identifier)
        .bind(purpose.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::store_error("failed to increment attempt count", e))?;

        let count = sqlx::query(
            r#"
            SELECT attempt_count FROM otp_codes
            WHERE email = ? AND purpose = ? AND expires_at > ?
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .bind(purpose.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::store_error("failed to read attempt count", e))?
        .and_then(|row| row.try_get::<u32, _>("attempt_count").ok())
        .unwrap_or(0);

        debug!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            attempt_count = count,
            "incremented attempt count"
        );

        Ok(count)
    }

    async fn delete(&self, identifier: &str, purpose: Purpose) -> OtpResult<()> {
        sqlx::query("DELETE FROM otp_codes WHERE email = ? AND purpose = ?")
            .bind(identifier)
            .bind(purpose.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Self::store_error("failed to delete OTP record", e))?;

        debug!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            "deleted OTP record"
        );

        Ok(())
    }

    async fn delete_matching(
        &self,
        identifier: &str,
        purpose: Purpose,
        code: &str,
    ) -> OtpResult<()> {
        // the code guard leaves a record alone when a resend superseded it
        sqlx::query("DELETE FROM otp_codes WHERE email = ? AND purpose = ? AND code = ?")
            .bind(identifier)
            .bind(purpose.as_str())
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::store_error("failed to delete matching OTP record", e))?;

        Ok(())
    }

    async fn count_since(&self, identifier: &str, window: Duration) -> OtpResult<u32> {
        let cutoff = Utc::now() - window;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM otp_codes WHERE email = ? AND created_at > ?",
        )
        .bind(identifier)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::store_error("failed to count recent issuances", e))?;

        Ok(count.max(0) as u32)
    }

    async fn code_in_use(&self, code: &str) -> OtpResult<bool> {
        let row = sqlx::query("SELECT 1 FROM otp_codes WHERE code = ? AND expires_at > ? LIMIT 1")
            .bind(code)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::store_error("failed to probe for code collision", e))?;

        Ok(row.is_some())
    }

    async fn sweep_expired(&self, batch_size: u32) -> OtpResult<u32> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at <= ? LIMIT ?")
            .bind(Utc::now())
            .bind(batch_size)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::store_error("failed to sweep expired OTP records", e))?;

        let deleted = result.rows_affected() as u32;

        if deleted > 0 {
            info!(deleted = deleted, "swept expired OTP records");
        }

        Ok(deleted)
    }
}
