//! Payout request entity model.

use altme_core::types::{Cents, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `payout_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PayoutRequest {
    pub id: DbId,
    pub user_id: DbId,
    pub amount: Cents,
    pub status: String,
    pub transfer_reference: Option<String>,
    pub created_at: Timestamp,
    pub processed_at: Option<Timestamp>,
}

/// DTO for requesting a payout.
#[derive(Debug, Deserialize)]
pub struct CreatePayoutRequest {
    pub amount: Cents,
}
