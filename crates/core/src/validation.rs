//! Field validation helpers shared by the repository and API layers.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Deliberately loose: one `@`, no whitespace, a dot in the domain.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 80;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const MAX_LOCATION_LENGTH: usize = 200;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
/// Maximum page size for list endpoints.
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_RE.is_match(email) {
        return Err(CoreError::Validation(format!(
            "Invalid email address '{email}'"
        )));
    }
    Ok(())
}

/// Validate a required text field: non-blank and at most `max` characters.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    validate_optional_text(field, Some(value), max)
}

/// Validate an optional text field: at most `max` characters when present.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<(), CoreError> {
    if let Some(v) = value {
        let len = v.chars().count();
        if len > max {
            return Err(CoreError::Validation(format!(
                "{field} exceeds maximum length of {max} characters (got {len})"
            )));
        }
    }
    Ok(())
}

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
