//! Route definitions for the `/chat` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// Routes mounted at `/chat`.
///
/// ```text
/// GET  /rooms                -> list_rooms
/// POST /rooms                -> open_room
/// GET  /rooms/{id}/messages  -> list_messages
/// POST /rooms/{id}/messages  -> send_message
/// POST /rooms/{id}/read      -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(chat::list_rooms).post(chat::open_room))
        .route(
            "/rooms/{id}/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route("/rooms/{id}/read", post(chat::mark_read))
}
