//! Payout request statuses, transitions, and validation.

use crate::error::CoreError;
use crate::ledger::validate_amount;
use crate::types::{Cents, DbId};

/// Waiting for an admin to process.
pub const PAYOUT_PENDING: &str = "pending";
/// Funds transferred and debited from the balance.
pub const PAYOUT_COMPLETED: &str = "completed";
/// Declined by an admin; the balance is untouched.
pub const PAYOUT_REJECTED: &str = "rejected";

pub const VALID_PAYOUT_STATUSES: &[&str] = &[PAYOUT_PENDING, PAYOUT_COMPLETED, PAYOUT_REJECTED];

/// Returns the statuses a payout in `from` may move to.
pub fn valid_transitions(from: &str) -> &'static [&'static str] {
    match from {
        PAYOUT_PENDING => &[PAYOUT_COMPLETED, PAYOUT_REJECTED],
        _ => &[],
    }
}

/// Validate a payout status transition.
pub fn validate_transition(current: &str, next: &str) -> Result<(), CoreError> {
    if valid_transitions(current).contains(&next) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Cannot move payout request from '{current}' to '{next}'"
        )))
    }
}

/// Validate a payout request against the user's current balance.
pub fn validate_payout(amount: Cents, balance: Cents) -> Result<(), CoreError> {
    validate_amount(amount)?;
    if amount > balance {
        return Err(CoreError::Validation(format!(
            "Requested payout of {amount} exceeds available balance of {balance}"
        )));
    }
    Ok(())
}

/// Idempotency key for the ledger debit of a payout.
pub fn payout_idempotency_key(payout_id: DbId) -> String {
    format!("payout:{payout_id}")
}
