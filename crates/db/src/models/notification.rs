//! Notification entity model and DTOs.

use altme_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub dedup_key: Option<String>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for writing a notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    /// When set, a second notification with the same key for the same user
    /// is silently dropped.
    pub dedup_key: Option<String>,
}

/// Inbox filters.
#[derive(Debug, Default)]
pub struct NotificationFilter {
    pub unread_only: bool,
    /// Event type the notification was created from, e.g. `chat.message`.
    pub kind: Option<String>,
}
