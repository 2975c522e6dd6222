pub mod admin;
pub mod auth;
pub mod bids;
pub mod chat;
pub mod health;
pub mod me;
pub mod notifications;
pub mod payouts;
pub mod project_requests;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
///
/// /me                                              current user
/// /me/ledger                                       own ledger entries
/// /me/bids                                         own bids
/// /me/payout-account                               link payout account (PUT)
/// /me/favorites                                    list, add
/// /me/favorites/{kind}/{target_id}                 remove (DELETE)
///
/// /project-requests                                list, create
/// /project-requests/{id}                           get, update
/// /project-requests/{id}/book                      book (POST)
/// /project-requests/{id}/deliver                   deliver (POST)
/// /project-requests/{id}/complete                  complete (POST)
/// /project-requests/{id}/dispute                   dispute (POST)
/// /project-requests/{id}/escrow                    escrow payment
/// /project-requests/{id}/bids                      list, place
/// /bids/{id}                                       cancel (DELETE)
///
/// /chat/rooms                                      list, open
/// /chat/rooms/{id}/messages                        list, send
/// /chat/rooms/{id}/read                            mark read (POST)
///
/// /notifications                                   list
/// /notifications/unread-count                      unread count
/// /notifications/read-all                          mark all read (POST)
/// /notifications/{id}/read                         mark read (POST)
///
/// /payouts                                         request, list own
///
/// /admin/users                                     list
/// /admin/users/{id}                                hard delete (DELETE)
/// /admin/users/{id}/status                         enable / disable (PUT)
/// /admin/users/{id}/ledger                         ledger + reconciliation
/// /admin/users/{id}/adjustments                    manual adjustment (POST)
/// /admin/project-requests/{id}/approve             approve booking (POST)
/// /admin/project-requests/{id}/disable             disable (POST)
/// /admin/project-requests/{id}/resolve             resolve dispute (POST)
/// /admin/escrow                                    escrow payments
/// /admin/payouts                                   payout queue
/// /admin/payouts/{id}/complete                     complete payout (POST)
/// /admin/payouts/{id}/reject                       reject payout (POST)
/// /admin/events                                    audit log
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/me", me::router())
        .nest("/project-requests", project_requests::router())
        .nest("/bids", bids::router())
        .nest("/chat", chat::router())
        .nest("/notifications", notifications::router())
        .nest("/payouts", payouts::router())
        .nest("/admin", admin::router())
}
