//! Email Module
//!
//! Mail delivery implementations for issued one-time codes. The OTP core
//! only decides content (the code) and timing; everything about message
//! composition and transport lives here.
//!
//! ## Implementations
//!
//! - **HttpMailer**: production delivery via an HTTP mail API
//! - **MockMailer**: console output for development and tests

pub mod http_mailer;
pub mod mock_mailer;

use std::sync::Arc;

use og_core::services::otp::NotificationSender;
use og_core::domain::entities::otp_record::Purpose;

use crate::config::MailerConfig;

pub use http_mailer::{HttpMailer, HttpMailerConfig};
pub use mock_mailer::MockMailer;

/// Create a mail sender based on configuration
///
/// Falls back to the mock sender when the configured provider cannot be
/// initialized, so a broken mail setup degrades loudly instead of failing
/// the whole service at startup.
pub fn create_mailer(config: &MailerConfig) -> Arc<dyn NotificationSender> {
    match config.provider.as_str() {
        "http" => {
            let http_config = HttpMailerConfig {
                api_url: config.api_url.clone(),
                api_key: config.api_key.clone(),
                from_address: config.from_address.clone(),
                ..Default::default()
            };

            match HttpMailer::new(http_config) {
                Ok(mailer) => Arc::new(mailer),
                Err(e) => {
                    tracing::error!("Failed to initialize HTTP mailer: {}", e);
                    tracing::warn!("Falling back to mock mailer");
                    Arc::new(MockMailer::new())
                }
            }
        }
        _ => Arc::new(MockMailer::new()),
    }
}

/// Subject line for an OTP delivery
pub(crate) fn subject_for(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::Login => "Your login code",
        Purpose::Register => "Your registration code",
        Purpose::PasswordReset => "Your password reset code",
    }
}

/// Plain-text body for an OTP delivery
pub(crate) fn body_for(code: &str, purpose: Purpose) -> String {
    let action = match purpose {
        Purpose::Login => "complete your login",
        Purpose::Register => "complete your registration",
        Purpose::PasswordReset => "reset your password",
    };

    format!(
        "Use the following code to {}: {}\n\n\
         If you did not request this code, please ignore this email.",
        action, code
    )
}
