//! Route definitions for the `/project-requests` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{bids, project_requests};
use crate::state::AppState;

/// Routes mounted at `/project-requests`.
///
/// ```text
/// GET  /               -> list
/// POST /               -> create
/// GET  /{id}           -> get_by_id
/// PUT  /{id}           -> update
/// POST /{id}/book      -> book
/// POST /{id}/deliver   -> deliver
/// POST /{id}/complete  -> complete
/// POST /{id}/dispute   -> dispute
/// GET  /{id}/escrow    -> get_escrow
/// GET  /{id}/bids      -> bids::list_for_request
/// POST /{id}/bids      -> bids::place
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project_requests::list).post(project_requests::create))
        .route(
            "/{id}",
            get(project_requests::get_by_id).put(project_requests::update),
        )
        .route("/{id}/book", post(project_requests::book))
        .route("/{id}/deliver", post(project_requests::deliver))
        .route("/{id}/complete", post(project_requests::complete))
        .route("/{id}/dispute", post(project_requests::dispute))
        .route("/{id}/escrow", get(project_requests::get_escrow))
        .route(
            "/{id}/bids",
            get(bids::list_for_request).post(bids::place),
        )
}
