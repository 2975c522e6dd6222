//! Append-only access to the `events` audit table.

use altme_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::{Event, EventFilter};

const COLUMNS: &str =
    "id, event_type, source_entity_type, source_entity_id, actor_user_id, payload, created_at";

pub struct EventRepo;

impl EventRepo {
    /// Append an event, returning its id. Rows are never updated.
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        actor_user_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO events
                (event_type, source_entity_type, source_entity_id, actor_user_id, payload)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(event_type)
        .bind(source_entity_type)
        .bind(source_entity_id)
        .bind(actor_user_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &EventFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events
             WHERE ($1::TEXT IS NULL OR event_type = $1)
               AND ($2::TEXT IS NULL OR source_entity_type = $2)
               AND ($3::BIGINT IS NULL OR source_entity_id = $3)
               AND ($4::BIGINT IS NULL OR actor_user_id = $4)
             ORDER BY id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(&filter.event_type)
            .bind(&filter.source_entity_type)
            .bind(filter.source_entity_id)
            .bind(filter.actor_user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
