//! Handlers for bids: `/project-requests/{id}/bids` and `/bids/{id}`.

use altme_core::error::CoreError;
use altme_core::notification::EVENT_BID_PLACED;
use altme_core::types::DbId;
use altme_db::models::bid::{Bid, CreateBid};
use altme_db::repositories::{BidRepo, ProjectRequestRepo};
use altme_events::PlatformEvent;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BidListParams {
    /// Include cancelled bids. Only honored for the client and admins.
    #[serde(default)]
    pub include_cancelled: bool,
}

/// GET /api/v1/project-requests/{id}/bids
pub async fn list_for_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<DbId>,
    Query(params): Query<BidListParams>,
) -> AppResult<Json<DataResponse<Vec<Bid>>>> {
    let request = ProjectRequestRepo::find_by_id(&state.pool, request_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ProjectRequest",
            id: request_id,
        }))?;

    let privileged = request.client_id == auth.user_id || auth.is_admin();
    let include_cancelled = params.include_cancelled && privileged;

    let bids = BidRepo::list_for_request(&state.pool, request_id, include_cancelled).await?;
    Ok(Json(DataResponse::new(bids)))
}

/// POST /api/v1/project-requests/{id}/bids
///
/// Place a bid on an Open request. The client is notified.
pub async fn place(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<DbId>,
    Json(input): Json<CreateBid>,
) -> AppResult<(StatusCode, Json<DataResponse<Bid>>)> {
    let placed = BidRepo::create(&state.pool, request_id, auth.user_id, &input).await?;
    let bid = placed.bid;

    state.event_bus.publish(
        PlatformEvent::new(EVENT_BID_PLACED)
            .with_source("project_request", request_id)
            .with_actor(auth.user_id)
            .with_payload(json!({
                "title": placed.request_title,
                "bid_id": bid.id,
                "amount": bid.amount,
            }))
            .with_recipients([placed.client_id]),
    );

    tracing::info!(
        bid_id = bid.id,
        request_id,
        photographer_id = auth.user_id,
        amount = bid.amount,
        "Bid placed"
    );
    Ok((StatusCode::CREATED, Json(DataResponse::new(bid))))
}

/// DELETE /api/v1/bids/{id}
///
/// Withdraw the caller's own active bid. An accepted bid cannot be
/// withdrawn.
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Bid>>> {
    let bid = BidRepo::cancel(&state.pool, id, auth.user_id).await?;
    tracing::info!(bid_id = id, photographer_id = auth.user_id, "Bid cancelled");
    Ok(Json(DataResponse::new(bid)))
}
