//! Repository for the `project_requests` table.
//!
//! [`ProjectRequestRepo::transition`] is the only code path that changes a
//! request's status. It runs the whole lifecycle step in one transaction:
//! lock the request, check the action and the actor, create or settle the
//! escrow payment, credit the beneficiary through the ledger, and write the
//! new status.

use altme_core::bid::BID_ACTIVE;
use altme_core::error::CoreError;
use altme_core::escrow::{self, Beneficiary, EscrowEffect, Settlement, ESCROW_PENDING};
use altme_core::ledger::validate_amount;
use altme_core::project_status::{parties_for, ProjectAction, ProjectStatus};
use altme_core::roles::USER_STATUS_ACTIVE;
use altme_core::types::{Cents, DbId};
use altme_core::validation::{
    validate_optional_text, validate_required_text, MAX_DESCRIPTION_LENGTH, MAX_LOCATION_LENGTH,
    MAX_TITLE_LENGTH,
};
use sqlx::{PgConnection, PgPool};

use super::{escrow_repo, violated_constraint, LedgerRepo};
use crate::error::RepoResult;
use crate::models::bid::Bid;
use crate::models::escrow::EscrowPayment;
use crate::models::ledger::{LedgerEntry, NewLedgerEntry};
use crate::models::project_request::{
    Booking, CreateProjectRequest, ProjectRequest, ProjectRequestFilter, UpdateProjectRequest,
};

const COLUMNS: &str = "id, client_id, title, description, location, event_date, budget, status, \
                       accepted_bid_id, accepted_bid_amount, hired_photographer_id, \
                       created_at, updated_at";

/// A lifecycle action requested by a user.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub request_id: DbId,
    pub action: ProjectAction,
    pub actor_id: DbId,
    pub actor_is_admin: bool,
    /// Required for [`ProjectAction::Book`], ignored otherwise.
    pub booking: Option<Booking>,
}

/// Everything a successful transition changed.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub request: ProjectRequest,
    pub previous_status: ProjectStatus,
    /// The escrow payment created or settled by this transition.
    pub escrow: Option<EscrowPayment>,
    /// The ledger credit posted to the beneficiary, if funds moved.
    pub credit: Option<LedgerEntry>,
}

impl TransitionOutcome {
    /// Users with a stake in the request, for notification fan-out.
    pub fn stakeholder_ids(&self) -> Vec<DbId> {
        let mut ids = vec![self.request.client_id];
        if let Some(p) = self.request.hired_photographer_id {
            ids.push(p);
        }
        ids
    }
}

/// Resolved booking: who was hired, for how much, and through which bid.
struct Hire {
    photographer_id: DbId,
    bid: Option<Bid>,
    amount: Cents,
}

pub struct ProjectRequestRepo;

impl ProjectRequestRepo {
    /// Post a new Open request for `client_id`.
    pub async fn create(
        pool: &PgPool,
        client_id: DbId,
        input: &CreateProjectRequest,
    ) -> RepoResult<ProjectRequest> {
        validate_required_text("title", &input.title, MAX_TITLE_LENGTH)?;
        validate_optional_text(
            "description",
            input.description.as_deref(),
            MAX_DESCRIPTION_LENGTH,
        )?;
        validate_optional_text("location", input.location.as_deref(), MAX_LOCATION_LENGTH)?;
        validate_amount(input.budget)?;

        let query = format!(
            "INSERT INTO project_requests
                (client_id, title, description, location, event_date, budget)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ProjectRequest>(&query)
            .bind(client_id)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(&input.location)
            .bind(input.event_date)
            .bind(input.budget)
            .fetch_one(pool)
            .await?;
        Ok(request)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ProjectRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_requests WHERE id = $1");
        sqlx::query_as::<_, ProjectRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests matching `filter`, paged.
    pub async fn list(
        pool: &PgPool,
        filter: &ProjectRequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProjectRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_requests
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::BIGINT IS NULL OR client_id = $2)
               AND ($3::BIGINT IS NULL OR hired_photographer_id = $3)
             ORDER BY {}
             LIMIT $4 OFFSET $5",
            filter.sort.order_by()
        );
        sqlx::query_as::<_, ProjectRequest>(&query)
            .bind(filter.status.map(ProjectStatus::as_str))
            .bind(filter.client_id)
            .bind(filter.photographer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Edit an Open request. Only its client may edit it.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
        input: &UpdateProjectRequest,
    ) -> RepoResult<ProjectRequest> {
        if let Some(title) = &input.title {
            validate_required_text("title", title, MAX_TITLE_LENGTH)?;
        }
        validate_optional_text(
            "description",
            input.description.as_deref(),
            MAX_DESCRIPTION_LENGTH,
        )?;
        validate_optional_text("location", input.location.as_deref(), MAX_LOCATION_LENGTH)?;
        if let Some(budget) = input.budget {
            validate_amount(budget)?;
        }

        let mut tx = pool.begin().await?;
        let current = Self::lock(&mut tx, id).await?;
        if current.client_id != actor_id {
            return Err(
                CoreError::Forbidden("Only the client can edit this project request".into()).into(),
            );
        }
        if current.status()? != ProjectStatus::Open {
            return Err(CoreError::Conflict(format!(
                "Project request {id} can only be edited while Open (status '{}')",
                current.status
            ))
            .into());
        }

        let query = format!(
            "UPDATE project_requests SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                event_date = COALESCE($5, event_date),
                budget = COALESCE($6, budget)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ProjectRequest>(&query)
            .bind(id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(&input.location)
            .bind(input.event_date)
            .bind(input.budget)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Apply one lifecycle action atomically.
    pub async fn transition(
        pool: &PgPool,
        req: &TransitionRequest,
    ) -> RepoResult<TransitionOutcome> {
        let mut tx = pool.begin().await?;

        let current = Self::lock(&mut tx, req.request_id).await?;
        let previous_status = current.status()?;

        let parties = parties_for(
            req.actor_id,
            req.actor_is_admin,
            current.client_id,
            current.hired_photographer_id,
        );
        req.action.authorize(&parties)?;
        let next_status = req.action.apply(previous_status)?;

        let mut escrow = None;
        let mut credit = None;
        let mut hire = None;

        match req.action.escrow_effect() {
            EscrowEffect::None => {}
            EscrowEffect::Create => {
                let booking = req.booking.as_ref().ok_or_else(|| {
                    CoreError::Validation("Booking details are required".into())
                })?;
                let resolved = resolve_hire(&mut *tx, &current, booking).await?;
                escrow = Some(
                    create_escrow(&mut *tx, &current, &resolved, &booking.payment_reference)
                        .await?,
                );
                hire = Some(resolved);
            }
            EscrowEffect::Release | EscrowEffect::Refund => {
                let held = lock_pending_escrow(&mut *tx, current.id).await?;
                if held.is_none() && req.action != ProjectAction::Disable {
                    return Err(CoreError::Internal(format!(
                        "Project request {} is '{}' but holds no escrow",
                        current.id, current.status
                    ))
                    .into());
                }
                if let Some(held) = held {
                    let (settled, entry) = settle(&mut *tx, &current, req.action, held).await?;
                    escrow = Some(settled);
                    credit = Some(entry);
                }
            }
        }

        let query = format!(
            "UPDATE project_requests SET
                status = $3,
                accepted_bid_id = COALESCE($4, accepted_bid_id),
                accepted_bid_amount = COALESCE($5, accepted_bid_amount),
                hired_photographer_id = COALESCE($6, hired_photographer_id)
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ProjectRequest>(&query)
            .bind(current.id)
            .bind(previous_status.as_str())
            .bind(next_status.as_str())
            .bind(hire.as_ref().and_then(|h| h.bid.as_ref().map(|b| b.id)))
            .bind(hire.as_ref().and_then(|h| h.bid.as_ref().map(|b| b.amount)))
            .bind(hire.as_ref().map(|h| h.photographer_id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Project request {} changed status concurrently",
                    current.id
                ))
            })?;

        tx.commit().await?;

        tracing::info!(
            request_id = request.id,
            action = req.action.as_str(),
            actor_id = req.actor_id,
            from = %previous_status,
            to = %next_status,
            "Project request transitioned"
        );

        Ok(TransitionOutcome {
            request,
            previous_status,
            escrow,
            credit,
        })
    }

    async fn lock(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> RepoResult<ProjectRequest> {
        let query = format!("SELECT {COLUMNS} FROM project_requests WHERE id = $1 FOR UPDATE");
        let request = sqlx::query_as::<_, ProjectRequest>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ProjectRequest",
                id,
            })?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Transition steps
// ---------------------------------------------------------------------------

/// Work out who is hired and for how much.
///
/// Accepting a bid hires its photographer at the bid amount. Hiring
/// directly pays the posted budget.
async fn resolve_hire(
    conn: &mut PgConnection,
    request: &ProjectRequest,
    booking: &Booking,
) -> RepoResult<Hire> {
    if booking.payment_reference.trim().is_empty() {
        return Err(CoreError::Validation("payment_reference must not be empty".into()).into());
    }

    if let Some(bid_id) = booking.bid_id {
        let bid: Bid = sqlx::query_as(
            "SELECT id, request_id, photographer_id, amount, message, status, created_at
             FROM bids WHERE id = $1 FOR UPDATE",
        )
        .bind(bid_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Bid",
            id: bid_id,
        })?;

        if bid.request_id != request.id {
            return Err(CoreError::Validation(format!(
                "Bid {bid_id} does not belong to project request {}",
                request.id
            ))
            .into());
        }
        if bid.status != BID_ACTIVE {
            return Err(CoreError::Conflict(format!("Bid {bid_id} is no longer active")).into());
        }
        if booking.photographer_id.is_some_and(|p| p != bid.photographer_id) {
            return Err(CoreError::Validation(
                "photographer_id does not match the accepted bid".into(),
            )
            .into());
        }

        ensure_hireable(conn, bid.photographer_id).await?;
        let amount = escrow::settlement_amount(Some(bid.amount), request.budget);
        return Ok(Hire {
            photographer_id: bid.photographer_id,
            bid: Some(bid),
            amount,
        });
    }

    let photographer_id = booking.photographer_id.ok_or_else(|| {
        CoreError::Validation("Either bid_id or photographer_id is required".into())
    })?;
    if photographer_id == request.client_id {
        return Err(CoreError::Validation("Cannot hire yourself".into()).into());
    }
    ensure_hireable(conn, photographer_id).await?;

    Ok(Hire {
        photographer_id,
        bid: None,
        amount: escrow::settlement_amount(None, request.budget),
    })
}

/// The photographer must exist and be active. The row is share-locked so a
/// concurrent disable waits for the booking to commit.
async fn ensure_hireable(conn: &mut PgConnection, photographer_id: DbId) -> RepoResult<()> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM users WHERE id = $1 FOR SHARE")
            .bind(photographer_id)
            .fetch_optional(&mut *conn)
            .await?;
    match status.as_deref() {
        Some(USER_STATUS_ACTIVE) => Ok(()),
        Some(_) => Err(CoreError::Conflict(format!(
            "Photographer {photographer_id} is not active"
        ))
        .into()),
        None => Err(CoreError::NotFound {
            entity: "User",
            id: photographer_id,
        }
        .into()),
    }
}

async fn create_escrow(
    conn: &mut PgConnection,
    request: &ProjectRequest,
    hire: &Hire,
    payment_reference: &str,
) -> RepoResult<EscrowPayment> {
    validate_amount(hire.amount)?;
    let query = format!(
        "INSERT INTO escrow_payments
            (request_id, client_id, photographer_id, amount, payment_reference)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        escrow_repo::COLUMNS
    );
    let payment = sqlx::query_as::<_, EscrowPayment>(&query)
        .bind(request.id)
        .bind(request.client_id)
        .bind(hire.photographer_id)
        .bind(hire.amount)
        .bind(payment_reference.trim())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("uq_escrow_payments_payment_reference") => CoreError::Conflict(
                "This payment reference has already been used".into(),
            )
            .into(),
            Some("uq_escrow_payments_request_id") => CoreError::Conflict(format!(
                "Project request {} already has an escrow payment",
                request.id
            ))
            .into(),
            _ => crate::RepoError::from(e),
        })?;
    Ok(payment)
}

async fn lock_pending_escrow(
    conn: &mut PgConnection,
    request_id: DbId,
) -> RepoResult<Option<EscrowPayment>> {
    let query = format!(
        "SELECT {} FROM escrow_payments WHERE request_id = $1 AND status = $2 FOR UPDATE",
        escrow_repo::COLUMNS
    );
    let held = sqlx::query_as::<_, EscrowPayment>(&query)
        .bind(request_id)
        .bind(ESCROW_PENDING)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(held)
}

/// Settle a held escrow payment and credit the beneficiary.
async fn settle(
    conn: &mut PgConnection,
    request: &ProjectRequest,
    action: ProjectAction,
    held: EscrowPayment,
) -> RepoResult<(EscrowPayment, LedgerEntry)> {
    let settlement = Settlement::for_action(action, request.id, Some(held.amount))
        .ok_or_else(|| CoreError::Internal(format!("{} does not settle escrow", action.as_str())))?;
    escrow::validate_transition(&held.status, settlement.escrow_status)?;

    let beneficiary_id = match settlement.beneficiary {
        Beneficiary::Client => held.client_id,
        Beneficiary::Photographer => held
            .photographer_id
            .or(request.hired_photographer_id)
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Project request {} has no photographer to pay",
                    request.id
                ))
            })?,
    };

    let query = format!(
        "UPDATE escrow_payments SET status = $2, settled_at = NOW()
         WHERE id = $1
         RETURNING {}",
        escrow_repo::COLUMNS
    );
    let settled = sqlx::query_as::<_, EscrowPayment>(&query)
        .bind(held.id)
        .bind(settlement.escrow_status)
        .fetch_one(&mut *conn)
        .await?;

    let (entry, _) = LedgerRepo::post(
        conn,
        &NewLedgerEntry {
            user_id: beneficiary_id,
            kind: settlement.ledger_kind,
            amount: settlement.amount,
            request_id: Some(request.id),
            payout_id: None,
            idempotency_key: settlement.idempotency_key,
            memo: Some(format!("{} of project request {}", action.as_str(), request.id)),
        },
    )
    .await?;

    Ok((settled, entry))
}
