//! Handlers for the `/chat` resource.
//!
//! Two users share exactly one room. Messages are paged backwards by id.

use altme_core::chat::preview;
use altme_core::error::CoreError;
use altme_core::notification::EVENT_CHAT_MESSAGE;
use altme_core::types::{DbId, Timestamp};
use altme_core::validation::{clamp_limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use altme_db::models::chat::{ChatMessage, ChatRoom, OpenRoom, SendMessage};
use altme_db::repositories::{ChatRepo, UserRepo};
use altme_events::PlatformEvent;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A room as seen by one participant.
#[derive(Debug, Serialize)]
pub struct RoomView {
    pub id: DbId,
    pub other_user_id: DbId,
    pub request_id: Option<DbId>,
    pub last_message: Option<String>,
    pub last_message_at: Option<Timestamp>,
    pub last_sender_id: Option<DbId>,
    pub unread: bool,
    pub created_at: Timestamp,
}

impl RoomView {
    fn for_user(room: ChatRoom, user_id: DbId) -> Self {
        Self {
            id: room.id,
            other_user_id: room.other_participant(user_id),
            request_id: room.request_id,
            unread: room.is_unread_for(user_id),
            last_message: room.last_message,
            last_message_at: room.last_message_at,
            last_sender_id: room.last_sender_id,
            created_at: room.created_at,
        }
    }
}

/// Query parameters for `GET /chat/rooms/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct MessageListParams {
    /// Return messages with an id lower than this one.
    pub before: Option<DbId>,
    pub limit: Option<i64>,
}

async fn find_room_for(state: &AppState, room_id: DbId, user_id: DbId) -> AppResult<ChatRoom> {
    let room = ChatRepo::find_by_id(&state.pool, room_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ChatRoom",
            id: room_id,
        }))?;
    if !room.has_participant(user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not a participant of this chat room".into(),
        )));
    }
    Ok(room)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/chat/rooms
///
/// The caller's rooms, most recent activity first.
pub async fn list_rooms(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<RoomView>>>> {
    let (limit, offset) = params.resolve();
    let rooms = ChatRepo::list_rooms_for_user(&state.pool, auth.user_id, limit, offset).await?;
    let views = rooms
        .into_iter()
        .map(|room| RoomView::for_user(room, auth.user_id))
        .collect();
    Ok(Json(DataResponse::new(views)))
}

/// POST /api/v1/chat/rooms
///
/// Open (or return) the room shared with another user.
pub async fn open_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<OpenRoom>,
) -> AppResult<Json<DataResponse<RoomView>>> {
    if UserRepo::find_by_id(&state.pool, input.other_user_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: input.other_user_id,
        }));
    }

    let room = ChatRepo::get_or_create_room(
        &state.pool,
        auth.user_id,
        input.other_user_id,
        input.request_id,
    )
    .await?;
    Ok(Json(DataResponse::new(RoomView::for_user(room, auth.user_id))))
}

/// GET /api/v1/chat/rooms/{id}/messages
///
/// Newest first. Pass the smallest id seen as `before` to load the
/// previous chunk.
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<DbId>,
    Query(params): Query<MessageListParams>,
) -> AppResult<Json<DataResponse<Vec<ChatMessage>>>> {
    find_room_for(&state, room_id, auth.user_id).await?;
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let messages = ChatRepo::list_messages(&state.pool, room_id, params.before, limit).await?;
    Ok(Json(DataResponse::new(messages)))
}

/// POST /api/v1/chat/rooms/{id}/messages
///
/// Send a message. The other participant's room is marked unread and they
/// are notified.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<DbId>,
    Json(input): Json<SendMessage>,
) -> AppResult<(StatusCode, Json<DataResponse<ChatMessage>>)> {
    let (message, recipient_id) =
        ChatRepo::send_message(&state.pool, room_id, auth.user_id, &input.body).await?;

    state.event_bus.publish(
        PlatformEvent::new(EVENT_CHAT_MESSAGE)
            .with_source("chat_room", room_id)
            .with_actor(auth.user_id)
            .with_payload(json!({
                "message_id": message.id,
                "preview": preview(&message.body),
            }))
            .with_recipients([recipient_id]),
    );

    Ok((StatusCode::CREATED, Json(DataResponse::new(message))))
}

/// POST /api/v1/chat/rooms/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_room_for(&state, room_id, auth.user_id).await?;
    ChatRepo::mark_read(&state.pool, room_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
