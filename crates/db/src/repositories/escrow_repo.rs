//! Repository for the `escrow_payments` table.
//!
//! Escrow rows are created and settled only by
//! [`ProjectRequestRepo::transition`](super::ProjectRequestRepo::transition);
//! this repository is read-only.

use altme_core::types::DbId;
use sqlx::PgPool;

use crate::models::escrow::EscrowPayment;

pub(crate) const COLUMNS: &str = "id, request_id, client_id, photographer_id, amount, \
                                  payment_reference, status, created_at, settled_at";

pub struct EscrowRepo;

impl EscrowRepo {
    /// Find the escrow payment for a request.
    pub async fn find_by_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Option<EscrowPayment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM escrow_payments WHERE request_id = $1");
        sqlx::query_as::<_, EscrowPayment>(&query)
            .bind(request_id)
            .fetch_optional(pool)
            .await
    }

    /// List escrow payments, newest first, optionally by status.
    pub async fn list(
        pool: &PgPool,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EscrowPayment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM escrow_payments
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, EscrowPayment>(&query)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
