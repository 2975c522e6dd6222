//! Ledger entry model.

use altme_core::ledger::LedgerKind;
use altme_core::types::{Cents, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the append-only `ledger_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    /// Signed amount: credits positive, debits negative.
    pub amount: Cents,
    pub request_id: Option<DbId>,
    pub payout_id: Option<DbId>,
    pub idempotency_key: String,
    pub memo: Option<String>,
    pub created_at: Timestamp,
}

/// Everything needed to post one balance movement.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: DbId,
    pub kind: LedgerKind,
    /// Unsigned for credits and payouts; signed for adjustments.
    pub amount: Cents,
    pub request_id: Option<DbId>,
    pub payout_id: Option<DbId>,
    pub idempotency_key: String,
    pub memo: Option<String>,
}
