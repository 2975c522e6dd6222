//! Escrow payment entity model.

use altme_core::types::{Cents, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `escrow_payments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EscrowPayment {
    pub id: DbId,
    pub request_id: DbId,
    pub client_id: DbId,
    pub photographer_id: Option<DbId>,
    pub amount: Cents,
    pub payment_reference: String,
    pub status: String,
    pub created_at: Timestamp,
    pub settled_at: Option<Timestamp>,
}
