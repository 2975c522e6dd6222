//! Handlers for the `/me` resource: the caller's profile, ledger,
//! favorites, bids and payout account.

use altme_core::error::CoreError;
use altme_core::favorites::{validate_kind, FAVORITE_PHOTOGRAPHER, FAVORITE_PROJECT_REQUEST};
use altme_core::types::DbId;
use altme_core::validation::validate_optional_text;
use altme_db::models::bid::Bid;
use altme_db::models::favorite::{CreateFavorite, Favorite};
use altme_db::models::ledger::LedgerEntry;
use altme_db::models::user::UserResponse;
use altme_db::repositories::{BidRepo, FavoriteRepo, LedgerRepo, ProjectRequestRepo, UserRepo};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Longest payment-processor account id accepted.
const MAX_ACCOUNT_ID_LENGTH: usize = 255;

#[derive(Debug, Deserialize)]
pub struct FavoriteListParams {
    pub kind: Option<String>,
}

/// Request body for `PUT /me/payout-account`. `null` unlinks the account.
#[derive(Debug, Deserialize)]
pub struct PayoutAccountRequest {
    pub stripe_account_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// GET /api/v1/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// GET /api/v1/me/ledger
///
/// The caller's ledger entries, newest first.
pub async fn my_ledger(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<LedgerEntry>>>> {
    let (limit, offset) = params.resolve();
    let entries = LedgerRepo::list_for_user(&state.pool, auth.user_id, limit, offset).await?;
    Ok(Json(DataResponse::new(entries)))
}

/// GET /api/v1/me/bids
pub async fn my_bids(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Bid>>>> {
    let (limit, offset) = params.resolve();
    let bids = BidRepo::list_for_photographer(&state.pool, auth.user_id, limit, offset).await?;
    Ok(Json(DataResponse::new(bids)))
}

/// PUT /api/v1/me/payout-account
///
/// Link the connected payment account that payouts are transferred to.
pub async fn set_payout_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<PayoutAccountRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let account = input
        .stripe_account_id
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());
    validate_optional_text("stripe_account_id", account, MAX_ACCOUNT_ID_LENGTH)?;

    let user = UserRepo::set_payout_account(&state.pool, auth.user_id, account)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;

    tracing::info!(user_id = auth.user_id, linked = account.is_some(), "Payout account updated");
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

/// GET /api/v1/me/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<FavoriteListParams>,
) -> AppResult<Json<DataResponse<Vec<Favorite>>>> {
    if let Some(kind) = params.kind.as_deref() {
        validate_kind(kind)?;
    }
    let favorites =
        FavoriteRepo::list_for_user(&state.pool, auth.user_id, params.kind.as_deref()).await?;
    Ok(Json(DataResponse::new(favorites)))
}

/// POST /api/v1/me/favorites
///
/// Idempotent: favoriting the same target twice returns the existing row.
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateFavorite>,
) -> AppResult<(StatusCode, Json<DataResponse<Favorite>>)> {
    validate_kind(&input.target_kind)?;
    ensure_target_exists(&state, &input.target_kind, input.target_id).await?;

    let favorite = FavoriteRepo::add(&state.pool, auth.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(favorite))))
}

/// DELETE /api/v1/me/favorites/{kind}/{target_id}
pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((kind, target_id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    validate_kind(&kind)?;
    if FavoriteRepo::remove(&state.pool, auth.user_id, &kind, target_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Favorite",
            id: target_id,
        }))
    }
}

async fn ensure_target_exists(state: &AppState, kind: &str, id: DbId) -> AppResult<()> {
    let exists = match kind {
        FAVORITE_PHOTOGRAPHER => UserRepo::find_by_id(&state.pool, id).await?.is_some(),
        FAVORITE_PROJECT_REQUEST => ProjectRequestRepo::find_by_id(&state.pool, id)
            .await?
            .is_some(),
        _ => false,
    };
    if exists {
        Ok(())
    } else {
        let entity = if kind == FAVORITE_PHOTOGRAPHER {
            "User"
        } else {
            "ProjectRequest"
        };
        Err(AppError::Core(CoreError::NotFound { entity, id }))
    }
}
