//! Bid status constants and validation.

use crate::error::CoreError;
use crate::ledger::validate_amount;
use crate::types::{Cents, DbId};

pub const BID_ACTIVE: &str = "active";
pub const BID_CANCELLED: &str = "cancelled";

pub const VALID_BID_STATUSES: &[&str] = &[BID_ACTIVE, BID_CANCELLED];

/// Maximum length of the cover message attached to a bid.
pub const MAX_BID_MESSAGE_LENGTH: usize = 2_000;

/// Validate a new bid before it is written.
///
/// A client cannot bid on their own request.
pub fn validate_new_bid(
    photographer_id: DbId,
    client_id: DbId,
    amount: Cents,
    message: Option<&str>,
) -> Result<(), CoreError> {
    if photographer_id == client_id {
        return Err(CoreError::Validation(
            "Cannot bid on your own project request".into(),
        ));
    }
    validate_amount(amount)?;
    if let Some(msg) = message {
        if msg.chars().count() > MAX_BID_MESSAGE_LENGTH {
            return Err(CoreError::Validation(format!(
                "Bid message exceeds maximum length of {MAX_BID_MESSAGE_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_bid_passes() {
        assert!(validate_new_bid(2, 1, 15_000, Some("Available that weekend")).is_ok());
        assert!(validate_new_bid(2, 1, 15_000, None).is_ok());
    }

    #[test]
    fn self_bid_is_rejected() {
        assert!(validate_new_bid(1, 1, 15_000, None).is_err());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        assert!(validate_new_bid(2, 1, 0, None).is_err());
    }

    #[test]
    fn long_message_is_rejected() {
        let msg = "x".repeat(MAX_BID_MESSAGE_LENGTH + 1);
        assert!(validate_new_bid(2, 1, 100, Some(&msg)).is_err());
    }
}
