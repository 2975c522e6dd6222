//! Platform event names.
//!
//! These double as notification kinds: the notification router renders one
//! notification per recipient for each of these events.

pub const EVENT_PROJECT_BOOKED: &str = "project.booked";
pub const EVENT_PROJECT_APPROVED: &str = "project.approved";
pub const EVENT_PROJECT_DELIVERED: &str = "project.delivered";
pub const EVENT_PROJECT_COMPLETED: &str = "project.completed";
pub const EVENT_PROJECT_DISPUTED: &str = "project.disputed";
pub const EVENT_PROJECT_RESOLVED: &str = "project.resolved";
pub const EVENT_PROJECT_DISABLED: &str = "project.disabled";
pub const EVENT_BID_PLACED: &str = "bid.placed";
pub const EVENT_CHAT_MESSAGE: &str = "chat.message";
pub const EVENT_PAYOUT_COMPLETED: &str = "payout.completed";
pub const EVENT_PAYOUT_REJECTED: &str = "payout.rejected";
pub const EVENT_USER_DISABLED: &str = "user.disabled";
pub const EVENT_USER_DELETED: &str = "user.deleted";
pub const EVENT_BALANCE_ADJUSTED: &str = "balance.adjusted";

/// Payload key listing the user ids that should be notified.
pub const PAYLOAD_RECIPIENTS: &str = "recipient_ids";

/// Human-readable title for a notification of the given kind.
pub fn title_for(event_type: &str) -> &'static str {
    match event_type {
        EVENT_PROJECT_BOOKED => "New booking",
        EVENT_PROJECT_APPROVED => "Booking approved",
        EVENT_PROJECT_DELIVERED => "Project delivered",
        EVENT_PROJECT_COMPLETED => "Project completed",
        EVENT_PROJECT_DISPUTED => "Project disputed",
        EVENT_PROJECT_RESOLVED => "Dispute resolved",
        EVENT_PROJECT_DISABLED => "Project disabled",
        EVENT_BID_PLACED => "New bid",
        EVENT_CHAT_MESSAGE => "New message",
        EVENT_PAYOUT_COMPLETED => "Payout sent",
        EVENT_PAYOUT_REJECTED => "Payout declined",
        EVENT_USER_DISABLED => "Account disabled",
        EVENT_BALANCE_ADJUSTED => "Balance adjusted",
        _ => "Notification",
    }
}

/// Whether an event of this type should also be sent by email.
///
/// Chat messages are in-app only.
pub fn emails_for(event_type: &str) -> bool {
    !matches!(event_type, EVENT_CHAT_MESSAGE | EVENT_USER_DELETED)
}
