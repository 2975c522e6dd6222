//! Handlers for the `/payouts` resource (the caller's own requests).
//!
//! Admin processing lives in [`admin`](super::admin).

use altme_db::models::payout::{CreatePayoutRequest, PayoutRequest};
use altme_db::repositories::PayoutRepo;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/payouts
///
/// Request a withdrawal. The balance is only debited when an admin
/// completes the request.
pub async fn request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreatePayoutRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<PayoutRequest>>)> {
    let payout = PayoutRepo::create(&state.pool, auth.user_id, input.amount).await?;
    tracing::info!(
        payout_id = payout.id,
        user_id = auth.user_id,
        amount = payout.amount,
        "Payout requested"
    );
    Ok((StatusCode::CREATED, Json(DataResponse::new(payout))))
}

/// GET /api/v1/payouts
pub async fn list_own(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<PayoutRequest>>>> {
    let (limit, offset) = params.resolve();
    let payouts = PayoutRepo::list_for_user(&state.pool, auth.user_id, limit, offset).await?;
    Ok(Json(DataResponse::new(payouts)))
}
