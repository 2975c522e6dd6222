//! Route definitions for the `/admin` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /users                          -> list_users
/// DELETE /users/{id}                     -> delete_user
/// PUT    /users/{id}/status              -> set_user_status
/// GET    /users/{id}/ledger              -> user_ledger
/// POST   /users/{id}/adjustments         -> post_adjustment
/// POST   /project-requests/{id}/approve  -> approve_request
/// POST   /project-requests/{id}/disable  -> disable_request
/// POST   /project-requests/{id}/resolve  -> resolve_dispute
/// GET    /escrow                         -> list_escrow
/// GET    /payouts                        -> list_payouts
/// POST   /payouts/{id}/complete          -> complete_payout
/// POST   /payouts/{id}/reject            -> reject_payout
/// GET    /events                         -> list_events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/status", put(admin::set_user_status))
        .route("/users/{id}/ledger", get(admin::user_ledger))
        .route("/users/{id}/adjustments", post(admin::post_adjustment))
        .route(
            "/project-requests/{id}/approve",
            post(admin::approve_request),
        )
        .route(
            "/project-requests/{id}/disable",
            post(admin::disable_request),
        )
        .route(
            "/project-requests/{id}/resolve",
            post(admin::resolve_dispute),
        )
        .route("/escrow", get(admin::list_escrow))
        .route("/payouts", get(admin::list_payouts))
        .route("/payouts/{id}/complete", post(admin::complete_payout))
        .route("/payouts/{id}/reject", post(admin::reject_payout))
        .route("/events", get(admin::list_events))
}
