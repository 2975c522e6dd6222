//! Bid entity model and DTOs.

use altme_core::types::{Cents, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `bids` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Bid {
    pub id: DbId,
    pub request_id: DbId,
    pub photographer_id: DbId,
    pub amount: Cents,
    pub message: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
}

/// DTO for placing a bid.
#[derive(Debug, Deserialize)]
pub struct CreateBid {
    pub amount: Cents,
    pub message: Option<String>,
}

/// A freshly placed bid with the request details needed to notify the client.
#[derive(Debug, Clone)]
pub struct PlacedBid {
    pub bid: Bid,
    pub client_id: DbId,
    pub request_title: String,
}
