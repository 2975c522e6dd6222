//! Escrow settlement rules.
//!
//! Funds are held from the moment a request is booked until it is either
//! released to the hired photographer or refunded to the client. An escrow
//! payment settles at most once; the settlement's idempotency key is derived
//! from the request id so a replayed settlement collides in the ledger.

use serde::Serialize;

use crate::error::CoreError;
use crate::ledger::LedgerKind;
use crate::project_status::ProjectAction;
use crate::types::{Cents, DbId};

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

/// Funds are held by the platform.
pub const ESCROW_PENDING: &str = "pending";
/// Funds were credited to the photographer.
pub const ESCROW_RELEASED: &str = "released";
/// Funds were credited back to the client.
pub const ESCROW_REFUNDED: &str = "refunded";

pub const VALID_ESCROW_STATUSES: &[&str] = &[ESCROW_PENDING, ESCROW_RELEASED, ESCROW_REFUNDED];

/// Returns the statuses an escrow payment in `from` may move to.
pub fn valid_transitions(from: &str) -> &'static [&'static str] {
    match from {
        ESCROW_PENDING => &[ESCROW_RELEASED, ESCROW_REFUNDED],
        _ => &[],
    }
}

/// Validate an escrow status transition.
pub fn validate_transition(current: &str, next: &str) -> Result<(), CoreError> {
    if valid_transitions(current).contains(&next) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Escrow payment already settled: cannot move from '{current}' to '{next}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// The amount held for a request: the accepted bid when there is one,
/// otherwise the posted budget.
pub fn settlement_amount(accepted_bid_amount: Option<Cents>, budget: Cents) -> Cents {
    accepted_bid_amount.unwrap_or(budget)
}

/// Effect of a lifecycle action on the escrowed funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowEffect {
    None,
    /// Create a pending escrow payment.
    Create,
    /// Credit the held amount to the photographer.
    Release,
    /// Credit the held amount back to the client.
    Refund,
}

/// Who receives settled funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Beneficiary {
    Client,
    Photographer,
}

/// A fully determined credit to apply when an escrow settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub beneficiary: Beneficiary,
    pub amount: Cents,
    pub ledger_kind: LedgerKind,
    /// The escrow status written alongside the credit.
    pub escrow_status: &'static str,
    pub idempotency_key: String,
}

/// Idempotency key for the single settlement of a request's escrow.
pub fn escrow_idempotency_key(request_id: DbId) -> String {
    format!("escrow:{request_id}")
}

impl Settlement {
    /// Build the settlement for `action` on request `request_id`, given the
    /// amount currently held. Returns `None` when the action moves no money.
    pub fn for_action(
        action: ProjectAction,
        request_id: DbId,
        held_amount: Option<Cents>,
    ) -> Option<Self> {
        let amount = held_amount?;
        let (beneficiary, ledger_kind, escrow_status) = match action.escrow_effect() {
            EscrowEffect::Release => (
                Beneficiary::Photographer,
                LedgerKind::EscrowRelease,
                ESCROW_RELEASED,
            ),
            EscrowEffect::Refund => (
                Beneficiary::Client,
                LedgerKind::EscrowRefund,
                ESCROW_REFUNDED,
            ),
            EscrowEffect::None | EscrowEffect::Create => return None,
        };
        Some(Self {
            beneficiary,
            amount,
            ledger_kind,
            escrow_status,
            idempotency_key: escrow_idempotency_key(request_id),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
