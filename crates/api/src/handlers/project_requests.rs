//! Handlers for the `/project-requests` resource.
//!
//! Every status change goes through [`run_transition`], which delegates to
//! [`ProjectRequestRepo::transition`] and publishes the matching platform
//! event once the transaction has committed.

use altme_core::error::CoreError;
use altme_core::project_status::{ProjectAction, ProjectStatus};
use altme_core::types::DbId;
use altme_core::validation::validate_optional_text;
use altme_db::models::escrow::EscrowPayment;
use altme_db::models::project_request::{
    Booking, CreateProjectRequest, ProjectRequest, ProjectRequestFilter, ProjectSort,
    UpdateProjectRequest,
};
use altme_db::repositories::{
    EscrowRepo, ProjectRequestRepo, TransitionOutcome, TransitionRequest, UserRepo,
};
use altme_events::PlatformEvent;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_party;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /project-requests`.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectRequestListParams {
    pub status: Option<String>,
    pub client_id: Option<DbId>,
    pub photographer_id: Option<DbId>,
    #[serde(default)]
    pub sort: ProjectSort,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Optional body for `POST /project-requests/{id}/dispute`.
#[derive(Debug, Default, Deserialize)]
pub struct DisputeRequest {
    pub reason: Option<String>,
}

/// The request after a lifecycle action, with the escrow it created or
/// settled.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub request: ProjectRequest,
    pub escrow: Option<EscrowPayment>,
}

impl From<TransitionOutcome> for TransitionResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            request: outcome.request,
            escrow: outcome.escrow,
        }
    }
}

/// Longest dispute reason kept in the event payload.
const MAX_DISPUTE_REASON_LENGTH: usize = 2_000;

// ---------------------------------------------------------------------------
// Shared transition path
// ---------------------------------------------------------------------------

/// Apply `action` to request `id` on behalf of `auth` and publish the
/// resulting event.
///
/// The event names the client and the hired photographer as recipients
/// (minus the actor). Disputes also notify every admin. `extra_payload`
/// is merged into the event payload.
pub(crate) async fn run_transition(
    state: &AppState,
    auth: &AuthUser,
    id: DbId,
    action: ProjectAction,
    booking: Option<Booking>,
    extra_payload: serde_json::Value,
) -> AppResult<TransitionOutcome> {
    let outcome = ProjectRequestRepo::transition(
        &state.pool,
        &TransitionRequest {
            request_id: id,
            action,
            actor_id: auth.user_id,
            actor_is_admin: auth.is_admin(),
            booking,
        },
    )
    .await?;

    let mut recipients = outcome.stakeholder_ids();
    if action == ProjectAction::Dispute {
        recipients.extend(UserRepo::list_admin_ids(&state.pool).await?);
    }

    let moved = match (&outcome.credit, &outcome.escrow) {
        (Some(credit), _) => Some(credit.amount),
        (None, Some(escrow)) if action == ProjectAction::Book => Some(escrow.amount),
        _ => None,
    };

    let mut payload = json!({
        "title": outcome.request.title,
        "action": action.as_str(),
        "previous_status": outcome.previous_status.as_str(),
        "status": outcome.request.status,
    });
    if let Some(amount) = moved {
        payload["amount"] = json!(amount);
    }

    state.event_bus.publish(
        PlatformEvent::new(action.event_type())
            .with_source("project_request", id)
            .with_actor(auth.user_id)
            .with_payload(payload)
            .with_payload(extra_payload)
            .with_recipients(recipients),
    );

    Ok(outcome)
}

fn transition_response(outcome: TransitionOutcome) -> Json<DataResponse<TransitionResponse>> {
    Json(DataResponse::new(TransitionResponse::from(outcome)))
}

async fn find_request(state: &AppState, id: DbId) -> AppResult<ProjectRequest> {
    ProjectRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ProjectRequest",
            id,
        }))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/project-requests
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<ProjectRequestListParams>,
) -> AppResult<Json<DataResponse<Vec<ProjectRequest>>>> {
    let status = params
        .status
        .as_deref()
        .map(ProjectStatus::parse)
        .transpose()?;
    let filter = ProjectRequestFilter {
        status,
        client_id: params.client_id,
        photographer_id: params.photographer_id,
        sort: params.sort,
    };
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let requests = ProjectRequestRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse::new(requests)))
}

/// POST /api/v1/project-requests
///
/// Post a new request. The caller becomes its client.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ProjectRequest>>)> {
    let request = ProjectRequestRepo::create(&state.pool, auth.user_id, &input).await?;
    tracing::info!(
        request_id = request.id,
        client_id = auth.user_id,
        budget = request.budget,
        "Project request created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse::new(request))))
}

/// GET /api/v1/project-requests/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectRequest>>> {
    Ok(Json(DataResponse::new(find_request(&state, id).await?)))
}

/// PUT /api/v1/project-requests/{id}
///
/// Owner only, and only while the request is Open.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProjectRequest>,
) -> AppResult<Json<DataResponse<ProjectRequest>>> {
    let request = ProjectRequestRepo::update(&state.pool, id, auth.user_id, &input).await?;
    Ok(Json(DataResponse::new(request)))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/project-requests/{id}/book
///
/// Hire a photographer, either through one of the request's bids or
/// directly at the posted budget, and hold the funds in escrow.
pub async fn book(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(booking): Json<Booking>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let outcome = run_transition(
        &state,
        &auth,
        id,
        ProjectAction::Book,
        Some(booking),
        json!({}),
    )
    .await?;
    Ok(transition_response(outcome))
}

/// POST /api/v1/project-requests/{id}/deliver
pub async fn deliver(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let outcome = run_transition(&state, &auth, id, ProjectAction::Deliver, None, json!({})).await?;
    Ok(transition_response(outcome))
}

/// POST /api/v1/project-requests/{id}/complete
///
/// Approve the delivery and release the escrow to the photographer.
pub async fn complete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let outcome =
        run_transition(&state, &auth, id, ProjectAction::Complete, None, json!({})).await?;
    Ok(transition_response(outcome))
}

/// POST /api/v1/project-requests/{id}/dispute
pub async fn dispute(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<DisputeRequest>>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    validate_optional_text("reason", reason.as_deref(), MAX_DISPUTE_REASON_LENGTH)?;

    let outcome = run_transition(
        &state,
        &auth,
        id,
        ProjectAction::Dispute,
        None,
        json!({ "reason": reason }),
    )
    .await?;
    Ok(transition_response(outcome))
}

/// GET /api/v1/project-requests/{id}/escrow
///
/// Visible to the client, the hired photographer and admins.
pub async fn get_escrow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EscrowPayment>>> {
    let request = find_request(&state, id).await?;
    require_party(
        &auth,
        [Some(request.client_id), request.hired_photographer_id],
        "project request",
    )?;

    let escrow = EscrowRepo::find_by_request(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "EscrowPayment",
            id,
        }))?;
    Ok(Json(DataResponse::new(escrow)))
}
