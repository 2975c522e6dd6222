//! Chat room participant ordering and message validation.

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4_000;

/// Length of the last-message preview cached on the room.
pub const PREVIEW_LENGTH: usize = 140;

/// Normalise a participant pair so that each pair maps to one room.
pub fn ordered_pair(a: DbId, b: DbId) -> Result<(DbId, DbId), CoreError> {
    if a == b {
        return Err(CoreError::Validation(
            "Cannot open a chat room with yourself".into(),
        ));
    }
    Ok(if a < b { (a, b) } else { (b, a) })
}

/// Validate and trim a message body.
pub fn validate_message_body(body: &str) -> Result<&str, CoreError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Message must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Message exceeds maximum length of {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(trimmed)
}

/// Build the preview stored in the room's last-message cache.
pub fn preview(body: &str) -> String {
    if body.chars().count() <= PREVIEW_LENGTH {
        return body.to_string();
    }
    let mut out: String = body.chars().take(PREVIEW_LENGTH - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        assert_eq!(ordered_pair(5, 2).unwrap(), (2, 5));
        assert_eq!(ordered_pair(2, 5).unwrap(), (2, 5));
    }

    #[test]
    fn self_chat_is_rejected() {
        assert!(ordered_pair(3, 3).is_err());
    }

    #[test]
    fn body_is_trimmed() {
        assert_eq!(validate_message_body("  hello \n").unwrap(), "hello");
    }

    #[test]
    fn blank_body_is_rejected() {
        assert!(validate_message_body("   ").is_err());
    }

    #[test]
    fn long_body_is_rejected() {
        let body = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(validate_message_body(&body).is_err());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(PREVIEW_LENGTH + 10);
        let p = preview(&body);
        assert_eq!(p.chars().count(), PREVIEW_LENGTH);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
