//! Repository for the `favorites` table.

use altme_core::types::DbId;
use sqlx::PgPool;

use crate::models::favorite::{CreateFavorite, Favorite};

const COLUMNS: &str = "id, user_id, target_kind, target_id, created_at";

/// Provides operations on a user's favorites list.
pub struct FavoriteRepo;

impl FavoriteRepo {
    /// Add a favorite. Adding the same target twice returns the existing row.
    pub async fn add(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateFavorite,
    ) -> Result<Favorite, sqlx::Error> {
        let query = format!(
            "INSERT INTO favorites (user_id, target_kind, target_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, target_kind, target_id)
             DO UPDATE SET target_id = EXCLUDED.target_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Favorite>(&query)
            .bind(user_id)
            .bind(&input.target_kind)
            .bind(input.target_id)
            .fetch_one(pool)
            .await
    }

    /// Remove a favorite. Returns `true` if a row was deleted.
    pub async fn remove(
        pool: &PgPool,
        user_id: DbId,
        target_kind: &str,
        target_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM favorites WHERE user_id = $1 AND target_kind = $2 AND target_id = $3",
        )
        .bind(user_id)
        .bind(target_kind)
        .bind(target_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a user's favorites, optionally restricted to one kind.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        target_kind: Option<&str>,
    ) -> Result<Vec<Favorite>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM favorites
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR target_kind = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Favorite>(&query)
            .bind(user_id)
            .bind(target_kind)
            .fetch_all(pool)
            .await
    }
}
