//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application. Handlers
//! publish after their transaction commits; the audit writer and the
//! notification router subscribe.

use std::fmt::Display;
use std::future::Future;

use altme_core::notification::PAYLOAD_RECIPIENTS;
use altme_core::types::DbId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event that occurred on the platform.
///
/// Constructed via [`PlatformEvent::new`] and enriched with the builder
/// methods [`with_source`](PlatformEvent::with_source),
/// [`with_actor`](PlatformEvent::with_actor),
/// [`with_payload`](PlatformEvent::with_payload) and
/// [`with_recipients`](PlatformEvent::with_recipients).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Unique per published event; copies of one event share it.
    pub id: Uuid,

    /// Dot-separated event name, e.g. `"project.booked"`.
    pub event_type: String,

    /// Source entity kind (e.g. `"project_request"`, `"payout_request"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<DbId>,

    /// The user that triggered the event.
    pub actor_user_id: Option<DbId>,

    /// JSON object carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// Merge `payload` into the event payload. Keys already present are
    /// overwritten; a non-object payload replaces the whole value.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        match (&mut self.payload, payload) {
            (serde_json::Value::Object(current), serde_json::Value::Object(extra)) => {
                current.extend(extra);
            }
            (_, other) => self.payload = other,
        }
        self
    }

    /// Name the users this event concerns. Duplicates and the acting user
    /// are dropped, so nobody is notified of their own action.
    pub fn with_recipients(self, ids: impl IntoIterator<Item = DbId>) -> Self {
        let mut recipients: Vec<DbId> = ids
            .into_iter()
            .filter(|id| Some(*id) != self.actor_user_id)
            .collect();
        recipients.sort_unstable();
        recipients.dedup();
        self.with_payload(serde_json::json!({ PAYLOAD_RECIPIENTS: recipients }))
    }

    /// The users this event concerns.
    pub fn recipient_ids(&self) -> Vec<DbId> {
        self.payload
            .get(PAYLOAD_RECIPIENTS)
            .and_then(|v| v.as_array())
            .map(|ids| ids.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default()
    }

    /// Stable key identifying this event instance. Delivering the same
    /// event twice yields the same key.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.event_type,
            self.source_entity_type.as_deref().unwrap_or("-"),
            self.source_entity_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            self.id
        )
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use altme_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PlatformEvent::new("project.booked").with_recipients([2]));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: PlatformEvent) {
        tracing::debug!(
            event_type = %event.event_type,
            source_id = ?event.source_entity_id,
            "Publishing event"
        );
        // A send error only means there are no receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Consumer loop
// ---------------------------------------------------------------------------

/// Feed every event from `receiver` to `handle` until the bus is dropped.
///
/// A failing event is logged and skipped. Returns how many events were
/// handled successfully.
pub async fn consume<F, Fut, E>(
    consumer: &'static str,
    mut receiver: broadcast::Receiver<PlatformEvent>,
    mut handle: F,
) -> u64
where
    F: FnMut(PlatformEvent) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut handled = 0;
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let event_type = event.event_type.clone();
                match handle(event).await {
                    Ok(()) => handled += 1,
                    Err(e) => {
                        tracing::error!(consumer, error = %e, %event_type, "Event handling failed");
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(consumer, skipped, "Consumer lagged, events were dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!(consumer, handled, "Event bus closed, consumer stopping");
                return handled;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
