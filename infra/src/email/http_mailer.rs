//! HTTP mail API client
//!
//! Delivers one-time codes through a JSON mail API, with automatic retry
//! and exponential backoff on transient failures. Recipient addresses are
//! masked in every log line.

use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use og_core::domain::entities::otp_record::Purpose;
use og_core::services::otp::NotificationSender;
use og_shared::utils::email::{is_valid_email, mask_email};

use crate::InfrastructureError;

use super::{body_for, subject_for};

/// HTTP mailer configuration
#[derive(Debug, Clone)]
pub struct HttpMailerConfig {
    /// Mail API endpoint URL
    pub api_url: String,
    /// Mail API key
    pub api_key: String,
    /// From address for outgoing mail
    pub from_address: String,
    /// Maximum retry attempts for failed requests
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Timeout for API requests in seconds
    pub request_timeout_secs: u64,
}

impl Default for HttpMailerConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            from_address: "no-reply@otpgate.test".to_string(),
            max_retries: 3,
            retry_delay_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

impl HttpMailerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, InfrastructureError> {
        let api_url = std::env::var("MAIL_API_URL")
            .map_err(|_| InfrastructureError::Config("MAIL_API_URL not set".to_string()))?;
        let api_key = std::env::var("MAIL_API_KEY")
            .map_err(|_| InfrastructureError::Config("MAIL_API_KEY not set".to_string()))?;
        let from_address = std::env::var("MAIL_FROM_ADDRESS")
            .map_err(|_| InfrastructureError::Config("MAIL_FROM_ADDRESS not set".to_string()))?;

        Ok(Self {
            api_url,
            api_key,
            from_address,
            ..Default::default()
        })
    }
}

/// Mail delivery via an HTTP mail API
pub struct HttpMailer {
    client: reqwest::Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    /// Create a new HTTP mailer
    pub fn new(config: HttpMailerConfig) -> Result<Self, InfrastructureError> {
        if config.api_url.is_empty() {
            return Err(InfrastructureError::Config(
                "mail API URL must not be empty".to_string(),
            ));
        }
        if !is_valid_email(&config.from_address) {
            return Err(InfrastructureError::Config(format!(
                "invalid from address: {}",
                config.from_address
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        info!(
            "HTTP mailer initialized with from address: {}",
            mask_email(&config.from_address)
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self, InfrastructureError> {
        Self::new(HttpMailerConfig::from_env()?)
    }

    fn auth_header(&self) -> String {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("api:{}", self.config.api_key));
        format!("Basic {}", credentials)
    }

    async fn post_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), InfrastructureError> {
        let payload = serde_json::json!({
            "from": self.config.from_address,
            "to": to,
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            Err(InfrastructureError::Mail(format!(
                "mail API returned {}: {}",
                status, detail
            )))
        }
    }
}

#[async_trait]
impl NotificationSender for HttpMailer {
    async fn send(&self, identifier: &str, code: &str, purpose: Purpose) -> Result<bool, String> {
        let subject = subject_for(purpose);
        let body = body_for(code, purpose);

        let mut delay = self.config.retry_delay_ms;

        for attempt in 1..=self.config.max_retries {
            match self.post_message(identifier, subject, &body).await {
                Ok(()) => {
                    info!(
                        identifier = %mask_email(identifier),
                        purpose = %purpose,
                        attempt = attempt,
                        event = "otp_mail_sent",
                        "delivered one-time code"
                    );
                    return Ok(true);
                }
                Err(e) if attempt < self.config.max_retries => {
                    warn!(
                        identifier = %mask_email(identifier),
                        purpose = %purpose,
                        attempt = attempt,
                        error = %e,
                        "mail delivery failed, retrying..."
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    // Exponential backoff with cap at 10 seconds
                    delay = (delay * 2).min(10_000);
                }
                Err(e) => {
                    error!(
                        identifier = %mask_email(identifier),
                        purpose = %purpose,
                        error = %e,
                        event = "otp_mail_failed",
                        "mail delivery failed after all retries"
                    );
                    return Err(e.to_string());
                }
            }
        }

        debug!("mailer configured with zero retries; treating send as failed");
        Err("mail delivery not attempted".to_string())
    }
}
