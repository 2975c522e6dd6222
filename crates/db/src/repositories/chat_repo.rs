//! Repository for `chat_rooms` and `chat_messages`.
//!
//! A room is keyed by its ordered participant pair, so two users share
//! exactly one room. The room row caches the last message and an unread
//! flag per participant so room listings need no join on messages.

use altme_core::chat::{ordered_pair, preview, validate_message_body};
use altme_core::error::CoreError;
use altme_core::types::DbId;
use sqlx::PgPool;

use crate::error::RepoResult;
use crate::models::chat::{ChatMessage, ChatRoom};

const ROOM_COLUMNS: &str = "id, participant_low, participant_high, request_id, last_message, \
                            last_message_at, last_sender_id, unread_low, unread_high, created_at";

const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, body, created_at";

pub struct ChatRepo;

impl ChatRepo {
    /// Return the room shared by two users, creating it on first contact.
    ///
    /// A `request_id` is recorded only when the room has none yet.
    pub async fn get_or_create_room(
        pool: &PgPool,
        user_a: DbId,
        user_b: DbId,
        request_id: Option<DbId>,
    ) -> RepoResult<ChatRoom> {
        let (low, high) = ordered_pair(user_a, user_b)?;
        let query = format!(
            "INSERT INTO chat_rooms (participant_low, participant_high, request_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (participant_low, participant_high)
             DO UPDATE SET request_id = COALESCE(chat_rooms.request_id, EXCLUDED.request_id)
             RETURNING {ROOM_COLUMNS}"
        );
        let room = sqlx::query_as::<_, ChatRoom>(&query)
            .bind(low)
            .bind(high)
            .bind(request_id)
            .fetch_one(pool)
            .await?;
        Ok(room)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ChatRoom>, sqlx::Error> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = $1");
        sqlx::query_as::<_, ChatRoom>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's rooms, most recently active first.
    pub async fn list_rooms_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatRoom>, sqlx::Error> {
        let query = format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms
             WHERE participant_low = $1 OR participant_high = $1
             ORDER BY last_message_at DESC NULLS LAST, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ChatRoom>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Append a message and refresh the room's cached preview.
    ///
    /// Returns the stored message and the id of the other participant.
    pub async fn send_message(
        pool: &PgPool,
        room_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> RepoResult<(ChatMessage, DbId)> {
        let body = validate_message_body(body)?;
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = $1 FOR UPDATE");
        let room = sqlx::query_as::<_, ChatRoom>(&query)
            .bind(room_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ChatRoom",
                id: room_id,
            })?;
        if !room.has_participant(sender_id) {
            return Err(CoreError::Forbidden("Not a participant of this chat room".into()).into());
        }
        let recipient_id = room.other_participant(sender_id);

        let query = format!(
            "INSERT INTO chat_messages (room_id, sender_id, body)
             VALUES ($1, $2, $3)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, ChatMessage>(&query)
            .bind(room_id)
            .bind(sender_id)
            .bind(body)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE chat_rooms SET
                last_message = $2,
                last_message_at = $3,
                last_sender_id = $4,
                unread_low = (participant_low = $5) OR unread_low,
                unread_high = (participant_high = $5) OR unread_high
             WHERE id = $1",
        )
        .bind(room_id)
        .bind(preview(body))
        .bind(message.created_at)
        .bind(sender_id)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((message, recipient_id))
    }

    /// List messages newest first, starting strictly before `before_id`.
    pub async fn list_messages(
        pool: &PgPool,
        room_id: DbId,
        before_id: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE room_id = $1 AND ($2::BIGINT IS NULL OR id < $2)
             ORDER BY id DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(room_id)
            .bind(before_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Clear the unread flag for `user_id`. Returns false if the user is not
    /// a participant or the room does not exist.
    pub async fn mark_read(
        pool: &PgPool,
        room_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_rooms SET
                unread_low = CASE WHEN participant_low = $2 THEN false ELSE unread_low END,
                unread_high = CASE WHEN participant_high = $2 THEN false ELSE unread_high END
             WHERE id = $1 AND (participant_low = $2 OR participant_high = $2)",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
