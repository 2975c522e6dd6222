//! Repository for the `payout_requests` table.

use altme_core::error::CoreError;
use altme_core::ledger::LedgerKind;
use altme_core::payout::{
    payout_idempotency_key, validate_payout, validate_transition, PAYOUT_COMPLETED,
    PAYOUT_REJECTED,
};
use altme_core::types::{Cents, DbId};
use sqlx::PgPool;

use super::{violated_constraint, LedgerRepo};
use crate::error::RepoResult;
use crate::models::ledger::NewLedgerEntry;
use crate::models::payout::PayoutRequest;

const COLUMNS: &str =
    "id, user_id, amount, status, transfer_reference, created_at, processed_at";

pub struct PayoutRepo;

impl PayoutRepo {
    /// Request a payout of `amount` from the user's balance.
    ///
    /// The balance is debited when an admin completes the payout. Until
    /// then the amount stays reserved: [`LedgerRepo::post`] refuses other
    /// debits that would leave less than it.
    pub async fn create(pool: &PgPool, user_id: DbId, amount: Cents) -> RepoResult<PayoutRequest> {
        let mut tx = pool.begin().await?;

        let balance: Option<Cents> =
            sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let balance = balance.ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;
        validate_payout(amount, balance)?;

        let query = format!(
            "INSERT INTO payout_requests (user_id, amount)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        let payout = sqlx::query_as::<_, PayoutRequest>(&query)
            .bind(user_id)
            .bind(amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match violated_constraint(&e) {
                Some("uq_payout_requests_pending_per_user") => CoreError::Conflict(
                    "A payout request is already pending for this user".into(),
                )
                .into(),
                _ => crate::RepoError::from(e),
            })?;

        tx.commit().await?;
        Ok(payout)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PayoutRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payout_requests WHERE id = $1");
        sqlx::query_as::<_, PayoutRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List payout requests for the admin queue, oldest first.
    pub async fn list(
        pool: &PgPool,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PayoutRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payout_requests
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, PayoutRequest>(&query)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List a user's own payout requests, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PayoutRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payout_requests
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, PayoutRequest>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a pending payout completed and debit the user's balance.
    ///
    /// The debit is posted with key `payout:{id}`, so a payout is debited
    /// at most once even if completion is retried.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        transfer_reference: &str,
    ) -> RepoResult<PayoutRequest> {
        let mut tx = pool.begin().await?;
        let payout = Self::lock_pending(&mut tx, id, PAYOUT_COMPLETED).await?;

        LedgerRepo::post(
            &mut *tx,
            &NewLedgerEntry {
                user_id: payout.user_id,
                kind: LedgerKind::Payout,
                amount: payout.amount,
                request_id: None,
                payout_id: Some(payout.id),
                idempotency_key: payout_idempotency_key(payout.id),
                memo: Some(format!("Transfer {transfer_reference}")),
            },
        )
        .await?;

        let query = format!(
            "UPDATE payout_requests
             SET status = $2, transfer_reference = $3, processed_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, PayoutRequest>(&query)
            .bind(id)
            .bind(PAYOUT_COMPLETED)
            .bind(transfer_reference)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(
            payout_id = id,
            user_id = updated.user_id,
            amount = updated.amount,
            "Payout completed"
        );
        Ok(updated)
    }

    /// Reject a pending payout. The balance is untouched.
    pub async fn reject(pool: &PgPool, id: DbId) -> RepoResult<PayoutRequest> {
        let mut tx = pool.begin().await?;
        Self::lock_pending(&mut tx, id, PAYOUT_REJECTED).await?;

        let query = format!(
            "UPDATE payout_requests
             SET status = $2, processed_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, PayoutRequest>(&query)
            .bind(id)
            .bind(PAYOUT_REJECTED)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn lock_pending(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        next: &str,
    ) -> RepoResult<PayoutRequest> {
        let query = format!("SELECT {COLUMNS} FROM payout_requests WHERE id = $1 FOR UPDATE");
        let payout = sqlx::query_as::<_, PayoutRequest>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "PayoutRequest",
                id,
            })?;
        validate_transition(&payout.status, next)?;
        Ok(payout)
    }
}
