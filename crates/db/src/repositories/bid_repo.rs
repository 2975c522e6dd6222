//! Repository for the `bids` table.

use altme_core::bid::{validate_new_bid, BID_ACTIVE, BID_CANCELLED};
use altme_core::error::CoreError;
use altme_core::project_status::ProjectStatus;
use altme_core::types::DbId;
use sqlx::PgPool;

use super::violated_constraint;
use crate::error::RepoResult;
use crate::models::bid::{Bid, CreateBid, PlacedBid};

const COLUMNS: &str = "id, request_id, photographer_id, amount, message, status, created_at";

/// Provides CRUD operations for bids.
pub struct BidRepo;

impl BidRepo {
    /// Place a bid on an Open request.
    ///
    /// The request row is share-locked so a concurrent booking cannot slip
    /// between the status check and the insert.
    pub async fn create(
        pool: &PgPool,
        request_id: DbId,
        photographer_id: DbId,
        input: &CreateBid,
    ) -> RepoResult<PlacedBid> {
        let mut tx = pool.begin().await?;

        let row: Option<(DbId, String, String)> = sqlx::query_as(
            "SELECT client_id, status, title FROM project_requests WHERE id = $1 FOR SHARE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (client_id, status, request_title) = row.ok_or(CoreError::NotFound {
            entity: "ProjectRequest",
            id: request_id,
        })?;

        if ProjectStatus::parse(&status)? != ProjectStatus::Open {
            return Err(CoreError::Conflict(format!(
                "Project request {request_id} is not open for bids (status '{status}')"
            ))
            .into());
        }
        validate_new_bid(
            photographer_id,
            client_id,
            input.amount,
            input.message.as_deref(),
        )?;

        let query = format!(
            "INSERT INTO bids (request_id, photographer_id, amount, message)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let bid = sqlx::query_as::<_, Bid>(&query)
            .bind(request_id)
            .bind(photographer_id)
            .bind(input.amount)
            .bind(&input.message)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match violated_constraint(&e) {
                Some("uq_bids_active_per_photographer") => CoreError::Conflict(
                    "You already have an active bid on this project request".into(),
                )
                .into(),
                _ => crate::RepoError::from(e),
            })?;

        tx.commit().await?;
        Ok(PlacedBid {
            bid,
            client_id,
            request_title,
        })
    }

    /// Find a bid by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Bid>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bids WHERE id = $1");
        sqlx::query_as::<_, Bid>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List bids on a request, lowest amount first.
    pub async fn list_for_request(
        pool: &PgPool,
        request_id: DbId,
        include_cancelled: bool,
    ) -> Result<Vec<Bid>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bids
             WHERE request_id = $1 AND ($2 OR status = $3)
             ORDER BY amount ASC, id ASC"
        );
        sqlx::query_as::<_, Bid>(&query)
            .bind(request_id)
            .bind(include_cancelled)
            .bind(BID_ACTIVE)
            .fetch_all(pool)
            .await
    }

    /// List a photographer's bids, newest first.
    pub async fn list_for_photographer(
        pool: &PgPool,
        photographer_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Bid>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bids
             WHERE photographer_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Bid>(&query)
            .bind(photographer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Cancel the photographer's own active bid.
    ///
    /// A bid that has been accepted by a booking can no longer be cancelled.
    pub async fn cancel(pool: &PgPool, id: DbId, photographer_id: DbId) -> RepoResult<Bid> {
        let query = format!(
            "UPDATE bids SET status = $3
             WHERE id = $1 AND photographer_id = $2 AND status = $4
               AND NOT EXISTS (
                   SELECT 1 FROM project_requests WHERE accepted_bid_id = $1
               )
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Bid>(&query)
            .bind(id)
            .bind(photographer_id)
            .bind(BID_CANCELLED)
            .bind(BID_ACTIVE)
            .fetch_optional(pool)
            .await?;

        if let Some(bid) = updated {
            return Ok(bid);
        }

        match Self::find_by_id(pool, id).await? {
            Some(bid) if bid.photographer_id != photographer_id => {
                Err(CoreError::Forbidden("Cannot cancel another photographer's bid".into()).into())
            }
            Some(_) => Err(CoreError::Conflict(format!(
                "Bid {id} is no longer active or has been accepted"
            ))
            .into()),
            None => Err(CoreError::NotFound { entity: "Bid", id }.into()),
        }
    }
}
