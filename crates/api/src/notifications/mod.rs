//! Notification routing.
//!
//! The [`NotificationRouter`] subscribes to the event bus, writes one
//! in-app notification per recipient and sends a best-effort email.

pub mod router;

pub use router::{NotificationRouter, Routed};
