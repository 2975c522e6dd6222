//! Route definitions for the `/bids` resource.

use axum::routing::delete;
use axum::Router;

use crate::handlers::bids;
use crate::state::AppState;

/// Routes mounted at `/bids`.
///
/// ```text
/// DELETE /{id} -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", delete(bids::cancel))
}
