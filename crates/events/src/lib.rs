//! AltMe event bus and notification infrastructure.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope. Every event names the
//!   users it concerns under the `recipient_ids` payload key.
//! - [`EventPersistence`]: background service that appends every event to
//!   the `events` audit table.
//! - [`delivery`]: outbound channels (email).

pub mod bus;
pub mod delivery;
pub mod persistence;

pub use bus::{consume, EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use persistence::EventPersistence;
