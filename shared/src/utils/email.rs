//! Email address utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted length for an email identifier
pub const MAX_EMAIL_LENGTH: usize = 100;

// Pragmatic address syntax check; deliverability is the mailer's problem
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._%+-]*@[A-Za-z0-9][A-Za-z0-9.-]*\.[A-Za-z]{2,}$").unwrap()
});

/// Normalize an email address for use as a storage key
///
/// Trims surrounding whitespace and lowercases, so `Alice@Example.COM`
/// and `alice@example.com` resolve to the same OTP record.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Check whether an email address is well-formed
pub fn is_valid_email(email: &str) -> bool {
    let normalized = normalize_email(email);
    normalized.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(&normalized)
}

/// Mask an email address for logging (e.g. a***@example.com)
pub fn mask_email(email: &str) -> String {
    let normalized = normalize_email(email);
    match normalized.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().unwrap_or('*');
            format!("{}***@{}", first, domain)
        }
        _ => "***".to_string(),
    }
}
