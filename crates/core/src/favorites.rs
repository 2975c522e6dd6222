//! Favorite target kinds.

use crate::error::CoreError;

pub const FAVORITE_PHOTOGRAPHER: &str = "photographer";
pub const FAVORITE_PROJECT_REQUEST: &str = "project_request";

pub const VALID_FAVORITE_KINDS: &[&str] = &[FAVORITE_PHOTOGRAPHER, FAVORITE_PROJECT_REQUEST];

pub fn validate_kind(kind: &str) -> Result<(), CoreError> {
    if VALID_FAVORITE_KINDS.contains(&kind) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid favorite kind '{kind}'. Must be one of: {}",
            VALID_FAVORITE_KINDS.join(", ")
        )))
    }
}
