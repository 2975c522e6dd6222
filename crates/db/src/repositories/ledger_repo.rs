//! Repository for the append-only `ledger_entries` table.
//!
//! [`LedgerRepo::post`] is the only code path that changes `users.balance`.

use altme_core::error::CoreError;
use altme_core::ledger::{self, LedgerKind, Reconciliation};
use altme_core::payout::PAYOUT_PENDING;
use altme_core::types::{Cents, DbId};
use sqlx::{PgConnection, PgPool};

use super::violated_constraint;
use crate::error::RepoResult;
use crate::models::ledger::{LedgerEntry, NewLedgerEntry};

const COLUMNS: &str =
    "id, user_id, kind, amount, request_id, payout_id, idempotency_key, memo, created_at";

const IDEMPOTENCY_CONSTRAINT: &str = "uq_ledger_entries_idempotency_key";

/// Provides ledger posting and reads.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Post one balance movement inside the caller's transaction.
    ///
    /// Locks the user row, checks the resulting balance is non-negative,
    /// appends the entry and moves the cached balance by the same signed
    /// amount. Debits other than a payout must also leave the user's
    /// pending payouts covered. A second post with the same idempotency key
    /// fails with a conflict and leaves the balance untouched.
    ///
    /// Returns the appended entry and the new balance.
    pub async fn post(
        conn: &mut PgConnection,
        entry: &NewLedgerEntry,
    ) -> RepoResult<(LedgerEntry, Cents)> {
        let balance: Option<Cents> =
            sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(entry.user_id)
                .fetch_optional(&mut *conn)
                .await?;
        let balance = balance.ok_or(CoreError::NotFound {
            entity: "User",
            id: entry.user_id,
        })?;

        match entry.kind {
            LedgerKind::Adjustment => ledger::validate_adjustment(entry.amount)?,
            _ => ledger::validate_amount(entry.amount)?,
        }
        let delta = entry.kind.signed(entry.amount);
        let next = if delta < 0 && entry.kind != LedgerKind::Payout {
            let reserved = Self::reserved_for_payouts(&mut *conn, entry.user_id).await?;
            ledger::apply_with_reserve(balance, delta, reserved)?
        } else {
            ledger::apply(balance, delta)?
        };

        let query = format!(
            "INSERT INTO ledger_entries
                (user_id, kind, amount, request_id, payout_id, idempotency_key, memo)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(entry.user_id)
            .bind(entry.kind.as_str())
            .bind(delta)
            .bind(entry.request_id)
            .bind(entry.payout_id)
            .bind(&entry.idempotency_key)
            .bind(&entry.memo)
            .fetch_one(&mut *conn)
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) if violated_constraint(&e) == Some(IDEMPOTENCY_CONSTRAINT) => {
                return Err(CoreError::Conflict(format!(
                    "Ledger entry '{}' was already posted",
                    entry.idempotency_key
                ))
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        sqlx::query("UPDATE users SET balance = balance + $2 WHERE id = $1")
            .bind(entry.user_id)
            .bind(delta)
            .execute(&mut *conn)
            .await?;

        tracing::info!(
            user_id = entry.user_id,
            kind = entry.kind.as_str(),
            amount = delta,
            balance = next,
            idempotency_key = %entry.idempotency_key,
            "Ledger entry posted"
        );
        Ok((row, next))
    }

    /// Sum of the user's pending payout requests.
    ///
    /// Callers must hold the user row lock; payout creation takes the same
    /// lock, so the sum cannot grow underneath a debit.
    async fn reserved_for_payouts(conn: &mut PgConnection, user_id: DbId) -> RepoResult<Cents> {
        let reserved: Cents = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM payout_requests
             WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(PAYOUT_PENDING)
        .fetch_one(&mut *conn)
        .await?;
        Ok(reserved)
    }

    /// Post a manual admin adjustment in its own transaction.
    pub async fn post_adjustment(
        pool: &PgPool,
        user_id: DbId,
        delta: Cents,
        idempotency_key: &str,
        memo: Option<&str>,
    ) -> RepoResult<(LedgerEntry, Cents)> {
        let mut tx = pool.begin().await?;
        let posted = Self::post(
            &mut *tx,
            &NewLedgerEntry {
                user_id,
                kind: LedgerKind::Adjustment,
                amount: delta,
                request_id: None,
                payout_id: None,
                idempotency_key: idempotency_key.to_string(),
                memo: memo.map(str::to_string),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(posted)
    }

    /// List a user's ledger entries, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ledger_entries
             WHERE user_id = $1
             ORDER BY id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Compare the cached balance with the sum of the user's ledger.
    ///
    /// Returns `None` if the user does not exist.
    pub async fn reconcile(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Reconciliation>, sqlx::Error> {
        let cached: Option<Cents> = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        let Some(cached) = cached else {
            return Ok(None);
        };

        let amounts: Vec<Cents> =
            sqlx::query_scalar("SELECT amount FROM ledger_entries WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(pool)
                .await?;

        let reconciliation = Reconciliation::new(cached, ledger::project_balance(amounts));
        if !reconciliation.is_consistent() {
            tracing::warn!(
                user_id,
                cached = reconciliation.cached_balance,
                ledger = reconciliation.ledger_balance,
                "Balance drift detected"
            );
        }
        Ok(Some(reconciliation))
    }
}
