//! Audit log rows.

use altme_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One recorded platform event. The payload keeps the `recipient_ids`
/// the event was addressed to.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

/// Audit log filters. Every field is optional and they combine with AND.
#[derive(Debug, Default)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
}
