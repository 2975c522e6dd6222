//! Handlers for the `/admin` resource.
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use altme_core::error::CoreError;
use altme_core::escrow::VALID_ESCROW_STATUSES;
use altme_core::ledger::Reconciliation;
use altme_core::notification::{
    EVENT_BALANCE_ADJUSTED, EVENT_PAYOUT_COMPLETED, EVENT_PAYOUT_REJECTED, EVENT_USER_DELETED,
    EVENT_USER_DISABLED,
};
use altme_core::payout::{payout_idempotency_key, PAYOUT_PENDING, VALID_PAYOUT_STATUSES};
use altme_core::project_status::ProjectAction;
use altme_core::roles::{validate_role, validate_user_status, USER_STATUS_DISABLED};
use altme_core::types::{Cents, DbId};
use altme_db::models::escrow::EscrowPayment;
use altme_db::models::event::{Event, EventFilter};
use altme_db::models::ledger::LedgerEntry;
use altme_db::models::payout::PayoutRequest;
use altme_db::models::user::{UserFilter, UserResponse};
use altme_db::repositories::{EscrowRepo, EventRepo, LedgerRepo, PayoutRepo, UserRepo};
use altme_events::PlatformEvent;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::project_requests::{run_transition, TransitionResponse};
use crate::middleware::rbac::RequireAdmin;
use crate::query::{PaginationParams, StatusFilterParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub role: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// Request body for `POST /admin/users/{id}/adjustments`.
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    /// Signed amount in cents.
    pub amount: Cents,
    pub memo: Option<String>,
    /// Replaying a request with the same key is rejected as a conflict.
    /// Generated when absent.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdjustmentResponse {
    pub entry: LedgerEntry,
    pub balance: Cents,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub entries: Vec<LedgerEntry>,
    pub reconciliation: Reconciliation,
}

/// How a dispute is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Refund the client.
    Refund,
    /// Pay the photographer.
    Pay,
}

impl ResolutionOutcome {
    fn action(self) -> ProjectAction {
        match self {
            Self::Refund => ProjectAction::ResolveRefund,
            Self::Pay => ProjectAction::ResolvePay,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Refund => "refund",
            Self::Pay => "pay",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub outcome: ResolutionOutcome,
}

/// Optional body for `POST /admin/payouts/{id}/complete`. Required when no
/// payout gateway is configured.
#[derive(Debug, Default, Deserialize)]
pub struct CompletePayoutRequest {
    pub transfer_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventListParams {
    pub event_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub actor_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn user_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "User", id })
}

fn validate_status_filter(status: Option<&str>, valid: &[&str]) -> AppResult<()> {
    match status {
        Some(s) if !valid.contains(&s) => Err(AppError::BadRequest(format!(
            "Invalid status '{s}'. Must be one of: {}",
            valid.join(", ")
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    if let Some(role) = params.role.as_deref() {
        validate_role(role)?;
    }
    if let Some(status) = params.status.as_deref() {
        validate_user_status(status)?;
    }
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let filter = UserFilter {
        role: params.role,
        status: params.status,
    };

    let users = UserRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse::new(
        users.iter().map(UserResponse::from).collect(),
    )))
}

/// PUT /api/v1/admin/users/{id}/status
///
/// Enable or disable an account. Disabled users can no longer sign in or
/// use an existing token.
pub async fn set_user_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SetStatusRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    validate_user_status(&input.status)?;
    if id == admin.user_id && input.status == USER_STATUS_DISABLED {
        return Err(AppError::BadRequest(
            "Cannot disable your own account".into(),
        ));
    }

    let user = UserRepo::set_status(&state.pool, id, &input.status)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    tracing::info!(
        user_id = id,
        status = %input.status,
        admin_id = admin.user_id,
        "User status changed"
    );

    if input.status == USER_STATUS_DISABLED {
        state.event_bus.publish(
            PlatformEvent::new(EVENT_USER_DISABLED)
                .with_source("user", id)
                .with_actor(admin.user_id)
                .with_recipients([id]),
        );
    }

    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Permanently delete an account and everything it owns. Refused while
/// the user is party to held escrow or still has a balance.
pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::BadRequest("Cannot delete your own account".into()));
    }
    if !UserRepo::hard_delete(&state.pool, id).await? {
        return Err(user_not_found(id));
    }

    tracing::info!(user_id = id, admin_id = admin.user_id, "User hard-deleted");
    state.event_bus.publish(
        PlatformEvent::new(EVENT_USER_DELETED)
            .with_source("user", id)
            .with_actor(admin.user_id),
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/users/{id}/ledger
///
/// The user's ledger with a reconciliation of the cached balance.
pub async fn user_ledger(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<LedgerResponse>>> {
    let reconciliation = LedgerRepo::reconcile(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    let (limit, offset) = params.resolve();
    let entries = LedgerRepo::list_for_user(&state.pool, id, limit, offset).await?;
    Ok(Json(DataResponse::new(LedgerResponse {
        entries,
        reconciliation,
    })))
}

/// POST /api/v1/admin/users/{id}/adjustments
pub async fn post_adjustment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AdjustmentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AdjustmentResponse>>)> {
    let idempotency_key = match input.idempotency_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => format!("adjustment:{key}"),
        _ => format!("adjustment:{}", uuid::Uuid::new_v4()),
    };
    let memo = input
        .memo
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let (entry, balance) =
        LedgerRepo::post_adjustment(&state.pool, id, input.amount, &idempotency_key, memo).await?;

    tracing::info!(
        user_id = id,
        amount = input.amount,
        admin_id = admin.user_id,
        "Balance adjusted"
    );
    state.event_bus.publish(
        PlatformEvent::new(EVENT_BALANCE_ADJUSTED)
            .with_source("user", id)
            .with_actor(admin.user_id)
            .with_payload(json!({ "amount": input.amount, "memo": memo }))
            .with_recipients([id]),
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(AdjustmentResponse { entry, balance })),
    ))
}

// ---------------------------------------------------------------------------
// Project requests
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/project-requests/{id}/approve
pub async fn approve_request(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let outcome =
        run_transition(&state, &admin, id, ProjectAction::Approve, None, json!({})).await?;
    Ok(Json(DataResponse::new(outcome.into())))
}

/// POST /api/v1/admin/project-requests/{id}/disable
///
/// Refunds the client when funds are held in escrow.
pub async fn disable_request(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let outcome =
        run_transition(&state, &admin, id, ProjectAction::Disable, None, json!({})).await?;
    Ok(Json(DataResponse::new(outcome.into())))
}

/// POST /api/v1/admin/project-requests/{id}/resolve
///
/// Settle a dispute by refunding the client or paying the photographer.
pub async fn resolve_dispute(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResolveRequest>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let outcome = run_transition(
        &state,
        &admin,
        id,
        input.outcome.action(),
        None,
        json!({ "outcome": input.outcome.as_str() }),
    )
    .await?;
    Ok(Json(DataResponse::new(outcome.into())))
}

// ---------------------------------------------------------------------------
// Escrow and payouts
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/escrow
pub async fn list_escrow(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<StatusFilterParams>,
) -> AppResult<Json<DataResponse<Vec<EscrowPayment>>>> {
    validate_status_filter(params.status.as_deref(), VALID_ESCROW_STATUSES)?;
    let (limit, offset) = params.page();
    let payments = EscrowRepo::list(&state.pool, params.status.as_deref(), limit, offset).await?;
    Ok(Json(DataResponse::new(payments)))
}

/// GET /api/v1/admin/payouts
///
/// Oldest first, so the queue is processed in order.
pub async fn list_payouts(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<StatusFilterParams>,
) -> AppResult<Json<DataResponse<Vec<PayoutRequest>>>> {
    validate_status_filter(params.status.as_deref(), VALID_PAYOUT_STATUSES)?;
    let (limit, offset) = params.page();
    let payouts = PayoutRepo::list(&state.pool, params.status.as_deref(), limit, offset).await?;
    Ok(Json(DataResponse::new(payouts)))
}

/// POST /api/v1/admin/payouts/{id}/complete
///
/// With a payout gateway configured the transfer is made to the user's
/// linked account first; otherwise the admin supplies the reference of a
/// transfer made by hand. The balance is debited only after the transfer
/// succeeded.
pub async fn complete_payout(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<CompletePayoutRequest>>,
) -> AppResult<Json<DataResponse<PayoutRequest>>> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let payout = PayoutRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PayoutRequest",
            id,
        }))?;
    if payout.status != PAYOUT_PENDING {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Payout request {id} is already {}",
            payout.status
        ))));
    }

    let transfer_reference = match &state.payout_gateway {
        Some(gateway) => {
            let user = UserRepo::find_by_id(&state.pool, payout.user_id)
                .await?
                .ok_or_else(|| user_not_found(payout.user_id))?;
            let account = user.stripe_account_id.ok_or_else(|| {
                AppError::Core(CoreError::Conflict(format!(
                    "User {} has no payout account linked",
                    payout.user_id
                )))
            })?;
            gateway
                .transfer(&account, payout.amount, &payout_idempotency_key(id))
                .await?
        }
        None => input
            .transfer_reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                AppError::BadRequest(
                    "transfer_reference is required when no payout gateway is configured".into(),
                )
            })?,
    };

    let completed = PayoutRepo::complete(&state.pool, id, &transfer_reference).await?;

    state.event_bus.publish(
        PlatformEvent::new(EVENT_PAYOUT_COMPLETED)
            .with_source("payout_request", id)
            .with_actor(admin.user_id)
            .with_payload(json!({
                "amount": completed.amount,
                "transfer_reference": transfer_reference,
            }))
            .with_recipients([completed.user_id]),
    );
    Ok(Json(DataResponse::new(completed)))
}

/// POST /api/v1/admin/payouts/{id}/reject
pub async fn reject_payout(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PayoutRequest>>> {
    let rejected = PayoutRepo::reject(&state.pool, id).await?;
    tracing::info!(payout_id = id, admin_id = admin.user_id, "Payout rejected");

    state.event_bus.publish(
        PlatformEvent::new(EVENT_PAYOUT_REJECTED)
            .with_source("payout_request", id)
            .with_actor(admin.user_id)
            .with_payload(json!({ "amount": rejected.amount }))
            .with_recipients([rejected.user_id]),
    );
    Ok(Json(DataResponse::new(rejected)))
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/events
///
/// Filter by `event_type`, source entity or acting user.
pub async fn list_events(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<EventListParams>,
) -> AppResult<Json<DataResponse<Vec<Event>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let filter = EventFilter {
        event_type: params.event_type,
        source_entity_type: params.entity_type,
        source_entity_id: params.entity_id,
        actor_user_id: params.actor_id,
    };
    let events = EventRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse::new(events)))
}
