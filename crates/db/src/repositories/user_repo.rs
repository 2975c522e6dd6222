//! Repository for the `users` table.

use altme_core::error::CoreError;
use altme_core::escrow::ESCROW_PENDING;
use altme_core::favorites::{FAVORITE_PHOTOGRAPHER, FAVORITE_PROJECT_REQUEST};
use altme_core::types::DbId;
use sqlx::PgPool;

use crate::error::RepoResult;
use crate::models::user::{CreateUser, User, UserFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, display_name, password_hash, role, status, balance, \
                       stripe_account_id, created_at, updated_at";

/// Maximum ids bound into a single `= ANY($1)` lookup.
const LOOKUP_CHUNK: usize = 500;

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, display_name, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.display_name)
            .bind(&input.password_hash)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Load many users by id, issuing one query per chunk of ids.
    ///
    /// Missing ids are skipped; the result is ordered by id.
    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1) ORDER BY id");
        let mut users = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(LOOKUP_CHUNK) {
            let rows = sqlx::query_as::<_, User>(&query)
                .bind(chunk)
                .fetch_all(pool)
                .await?;
            users.extend(rows);
        }
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    /// List users, newest first, optionally filtered by role and status.
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE ($1::TEXT IS NULL OR role = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&filter.role)
            .bind(&filter.status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List the ids of all active admins.
    pub async fn list_admin_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin' AND status = 'active'")
            .fetch_all(pool)
            .await
    }

    /// Set the account status. Returns `None` if no row with `id` exists.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("UPDATE users SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear the connected payment account used for payouts.
    pub async fn set_payout_account(
        pool: &PgPool,
        id: DbId,
        stripe_account_id: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let query =
            format!("UPDATE users SET stripe_account_id = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(stripe_account_id)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a user and everything they own.
    ///
    /// Runs in one transaction. Refuses with a conflict while the user is a
    /// party to an escrow payment that still holds funds, or still has a
    /// positive balance; those must be settled or paid out first. Returns
    /// `false` if the user does not exist.
    pub async fn hard_delete(pool: &PgPool, id: DbId) -> RepoResult<bool> {
        let mut tx = pool.begin().await?;

        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(balance) = balance else {
            return Ok(false);
        };

        let held: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM escrow_payments
             WHERE status = $2 AND (client_id = $1 OR photographer_id = $1)",
        )
        .bind(id)
        .bind(ESCROW_PENDING)
        .fetch_one(&mut *tx)
        .await?;

        if held > 0 {
            return Err(CoreError::Conflict(format!(
                "User {id} is party to {held} escrow payment(s) still holding funds"
            ))
            .into());
        }
        if balance > 0 {
            return Err(CoreError::Conflict(format!(
                "User {id} still has a balance of {balance}; pay out or adjust it first"
            ))
            .into());
        }

        // Favorites point at their targets without a foreign key.
        sqlx::query(
            "DELETE FROM favorites
             WHERE (target_kind = $2 AND target_id = $1)
                OR (target_kind = $3 AND target_id IN
                    (SELECT id FROM project_requests WHERE client_id = $1))",
        )
        .bind(id)
        .bind(FAVORITE_PHOTOGRAPHER)
        .bind(FAVORITE_PROJECT_REQUEST)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = id, "User hard-deleted");
        Ok(true)
    }
}
