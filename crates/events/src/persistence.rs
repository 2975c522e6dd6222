//! Audit log writer.
//!
//! Every [`PlatformEvent`] lands in the `events` table, recipients included,
//! so admins can trace who was told about what.

use altme_core::types::DbId;
use altme_db::repositories::EventRepo;
use altme_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::{consume, PlatformEvent};

pub struct EventPersistence;

impl EventPersistence {
    /// Record events until the bus is dropped.
    pub async fn run(pool: DbPool, receiver: broadcast::Receiver<PlatformEvent>) {
        let recorded = consume("audit log", receiver, |event| {
            let pool = pool.clone();
            async move { Self::persist(&pool, &event).await.map(|_| ()) }
        })
        .await;
        tracing::info!(recorded, "Audit log writer stopped");
    }

    /// Append one event. Returns the new row id.
    pub async fn persist(pool: &DbPool, event: &PlatformEvent) -> Result<DbId, sqlx::Error> {
        EventRepo::insert(
            pool,
            &event.event_type,
            event.source_entity_type.as_deref(),
            event.source_entity_id,
            event.actor_user_id,
            &event.payload,
        )
        .await
    }
}
