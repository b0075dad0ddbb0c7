//! Mock mailer for development and testing
//!
//! Logs the code instead of sending it and records every delivery so tests
//! can assert on what would have gone out.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use og_core::domain::entities::otp_record::Purpose;
use og_core::services::otp::NotificationSender;
use og_shared::utils::email::mask_email;

/// A delivery captured by the mock mailer
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub code: String,
    pub purpose: Purpose,
}

/// Mock mail sender that records instead of transmitting
pub struct MockMailer {
    sent: Mutex<Vec<SentMail>>,
    send_success: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::with_outcome(true)
    }

    /// Create a mock that reports delivery failure
    pub fn with_outcome(send_success: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            send_success,
        }
    }

    /// All deliveries captured so far
    pub fn sent_mail(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recent code sent to an identifier
    pub fn last_code_for(&self, identifier: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|mail| mail.to == identifier)
            .map(|mail| mail.code.clone())
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSender for MockMailer {
    async fn send(&self, identifier: &str, code: &str, purpose: Purpose) -> Result<bool, String> {
        info!(
            identifier = %mask_email(identifier),
            purpose = %purpose,
            code = code,
            "[MOCK MAIL] one-time code delivery"
        );

        self.sent.lock().unwrap().push(SentMail {
            to: identifier.to_string(),
            code: code.to_string(),
            purpose,
        });

        Ok(self.send_success)
    }
}
