//! Chat room and message models.

use altme_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `chat_rooms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatRoom {
    pub id: DbId,
    pub participant_low: DbId,
    pub participant_high: DbId,
    pub request_id: Option<DbId>,
    pub last_message: Option<String>,
    pub last_message_at: Option<Timestamp>,
    pub last_sender_id: Option<DbId>,
    pub unread_low: bool,
    pub unread_high: bool,
    pub created_at: Timestamp,
}

impl ChatRoom {
    pub fn has_participant(&self, user_id: DbId) -> bool {
        self.participant_low == user_id || self.participant_high == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: DbId) -> DbId {
        if self.participant_low == user_id {
            self.participant_high
        } else {
            self.participant_low
        }
    }

    /// Whether `user_id` has unread messages in this room.
    pub fn is_unread_for(&self, user_id: DbId) -> bool {
        if self.participant_low == user_id {
            self.unread_low
        } else if self.participant_high == user_id {
            self.unread_high
        } else {
            false
        }
    }
}

/// A row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    pub room_id: DbId,
    pub sender_id: DbId,
    pub body: String,
    pub created_at: Timestamp,
}

/// DTO for opening a room.
#[derive(Debug, Deserialize)]
pub struct OpenRoom {
    pub other_user_id: DbId,
    pub request_id: Option<DbId>,
}

/// DTO for sending a message.
#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub body: String,
}
