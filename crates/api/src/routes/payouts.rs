//! Route definitions for the `/payouts` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::payouts;
use crate::state::AppState;

/// Routes mounted at `/payouts`.
///
/// ```text
/// GET  / -> list_own
/// POST / -> request
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(payouts::list_own).post(payouts::request))
}
