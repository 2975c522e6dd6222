//! Route definitions for the `/me` resource.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::me;
use crate::state::AppState;

/// Routes mounted at `/me`.
///
/// ```text
/// GET    /                             -> get_me
/// GET    /ledger                       -> my_ledger
/// GET    /bids                         -> my_bids
/// PUT    /payout-account               -> set_payout_account
/// GET    /favorites                    -> list_favorites
/// POST   /favorites                    -> add_favorite
/// DELETE /favorites/{kind}/{target_id} -> remove_favorite
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me::get_me))
        .route("/ledger", get(me::my_ledger))
        .route("/bids", get(me::my_bids))
        .route("/payout-account", put(me::set_payout_account))
        .route(
            "/favorites",
            get(me::list_favorites).post(me::add_favorite),
        )
        .route("/favorites/{kind}/{target_id}", delete(me::remove_favorite))
}
