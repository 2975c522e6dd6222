//! Append-only balance ledger.
//!
//! Every change to a user's balance is recorded as a signed ledger entry.
//! The cached `users.balance` column is only ever moved in the same
//! transaction that appends the matching entry, so [`project_balance`] over
//! a user's entries must always equal the cached value.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Cents;

/// Largest single amount accepted anywhere (100 million in major units).
pub const MAX_AMOUNT: Cents = 10_000_000_000;

/// Kind of ledger entry. The database stores [`LedgerKind::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Escrowed funds credited to the hired photographer.
    EscrowRelease,
    /// Escrowed funds credited back to the client.
    EscrowRefund,
    /// Funds transferred out to the user's payment account.
    Payout,
    /// Manual correction by an admin. May be positive or negative.
    Adjustment,
}

impl LedgerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EscrowRelease => "escrow_release",
            Self::EscrowRefund => "escrow_refund",
            Self::Payout => "payout",
            Self::Adjustment => "adjustment",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "escrow_release" => Ok(Self::EscrowRelease),
            "escrow_refund" => Ok(Self::EscrowRefund),
            "payout" => Ok(Self::Payout),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(CoreError::Validation(format!(
                "Invalid ledger entry kind '{other}'"
            ))),
        }
    }

    /// Turn an unsigned amount into the signed delta for this kind.
    ///
    /// Adjustments carry their own sign and are passed through unchanged.
    pub fn signed(self, amount: Cents) -> Cents {
        match self {
            Self::EscrowRelease | Self::EscrowRefund => amount,
            Self::Payout => -amount,
            Self::Adjustment => amount,
        }
    }
}

/// Validate that a settlement, bid, budget or payout amount is usable.
pub fn validate_amount(amount: Cents) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "Amount must be positive (got {amount})"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(CoreError::Validation(format!(
            "Amount exceeds maximum of {MAX_AMOUNT} (got {amount})"
        )));
    }
    Ok(())
}

/// Validate a signed manual adjustment.
pub fn validate_adjustment(delta: Cents) -> Result<(), CoreError> {
    if delta == 0 {
        return Err(CoreError::Validation("Adjustment must not be zero".into()));
    }
    validate_amount(delta.saturating_abs())
}

/// Apply a signed delta to a balance, rejecting overdraft and overflow.
pub fn apply(balance: Cents, delta: Cents) -> Result<Cents, CoreError> {
    let next = balance
        .checked_add(delta)
        .ok_or_else(|| CoreError::Validation("Balance overflow".into()))?;
    if next < 0 {
        return Err(CoreError::Conflict(format!(
            "Insufficient balance: {balance} available, {} required",
            -delta
        )));
    }
    Ok(next)
}

/// Apply a debit that must not dip into `reserved`, the amount held for
/// pending payouts. Credits are never limited by the reserve.
pub fn apply_with_reserve(
    balance: Cents,
    delta: Cents,
    reserved: Cents,
) -> Result<Cents, CoreError> {
    let next = apply(balance, delta)?;
    if delta < 0 && next < reserved {
        return Err(CoreError::Conflict(format!(
            "{reserved} of the balance is reserved for a pending payout; \
             {} available, {} required",
            balance - reserved,
            -delta
        )));
    }
    Ok(next)
}

/// Sum signed ledger amounts into the balance they imply.
pub fn project_balance<I>(amounts: I) -> Cents
where
    I: IntoIterator<Item = Cents>,
{
    amounts.into_iter().sum()
}

/// Result of comparing the cached balance against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub cached_balance: Cents,
    pub ledger_balance: Cents,
    pub drift: Cents,
}

impl Reconciliation {
    pub fn new(cached_balance: Cents, ledger_balance: Cents) -> Self {
        Self {
            cached_balance,
            ledger_balance,
            drift: cached_balance - ledger_balance,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}
