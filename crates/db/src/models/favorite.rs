//! Favorite entity model and DTOs.

use altme_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `favorites` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Favorite {
    pub id: DbId,
    pub user_id: DbId,
    pub target_kind: String,
    pub target_id: DbId,
    pub created_at: Timestamp,
}

/// DTO for adding a favorite.
#[derive(Debug, Deserialize)]
pub struct CreateFavorite {
    pub target_kind: String,
    pub target_id: DbId,
}
