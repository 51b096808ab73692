//! Input checks that sit outside the `Store`.
//!
//! `Store::register_user` only requires non-empty fields. Email format is
//! checked here so callers can apply it explicitly before registering.

use crate::error::{Result, StoreError};

/// Accepts `local@domain` with exactly one `@`, both sides non-empty and
/// no whitespace anywhere.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || StoreError::InvalidInput(format!("malformed email address {email:?}"));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(invalid()),
    }
}

/// Trims the username and replaces `/` so it can never act as a path
/// separator inside a resource URL.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().replace('/', "∕")
}
