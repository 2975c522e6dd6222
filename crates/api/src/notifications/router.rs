//! Event-to-notification routing.
//!
//! [`NotificationRouter`] subscribes to the platform event bus. For each
//! event it reads the recipients named in the payload, writes an unread
//! notification for each of them and, when SMTP is configured, emails
//! them. A notification row is keyed by the event's dedup key, so an
//! event delivered twice produces a single notification and a single
//! email.

use altme_core::notification::{
    emails_for, title_for, EVENT_BALANCE_ADJUSTED, EVENT_BID_PLACED, EVENT_CHAT_MESSAGE,
    EVENT_PAYOUT_COMPLETED, EVENT_PAYOUT_REJECTED, EVENT_PROJECT_APPROVED,
    EVENT_PROJECT_BOOKED, EVENT_PROJECT_COMPLETED, EVENT_PROJECT_DELIVERED,
    EVENT_PROJECT_DISABLED, EVENT_PROJECT_DISPUTED, EVENT_PROJECT_RESOLVED, EVENT_USER_DISABLED,
};
use altme_core::roles::USER_STATUS_ACTIVE;
use altme_db::models::notification::CreateNotification;
use altme_db::models::user::User;
use altme_db::repositories::{NotificationRepo, UserRepo};
use altme_db::DbPool;
use altme_events::{consume, EmailDelivery, PlatformEvent};
use tokio::sync::broadcast;

/// Routes platform events to user notifications.
pub struct NotificationRouter {
    pool: DbPool,
    email: Option<EmailDelivery>,
}

impl NotificationRouter {
    /// Create a router. Without an [`EmailDelivery`] only in-app
    /// notifications are written.
    pub fn new(pool: DbPool, email: Option<EmailDelivery>) -> Self {
        Self { pool, email }
    }

    /// Route events until the bus is dropped.
    pub async fn run(self, receiver: broadcast::Receiver<PlatformEvent>) {
        let router = &self;
        let routed = consume("notification router", receiver, |event| async move {
            router.route_event(&event).await.map(|_| ())
        })
        .await;
        tracing::info!(routed, "Notification router stopped");
    }

    /// Route a single event to every recipient it names.
    ///
    /// Fails only if the recipients cannot be loaded or no recipient could
    /// be written at all.
    pub async fn route_event(&self, event: &PlatformEvent) -> Result<Routed, sqlx::Error> {
        let recipient_ids = event.recipient_ids();
        if recipient_ids.is_empty() {
            return Ok(Routed::default());
        }
        let recipients = UserRepo::find_by_ids(&self.pool, &recipient_ids).await?;
        self.route_to(event, &recipients).await
    }

    /// Write and mail the notification for `event` to each of `recipients`.
    ///
    /// A failed insert is logged and skipped so the remaining recipients
    /// are still notified; the event is never redelivered.
    pub async fn route_to(
        &self,
        event: &PlatformEvent,
        recipients: &[User],
    ) -> Result<Routed, sqlx::Error> {
        let title = title_for(&event.event_type);
        let body = render_body(event);
        let dedup_key = event.dedup_key();
        let mut routed = Routed::default();
        let mut last_error = None;

        for user in recipients {
            let input = CreateNotification {
                user_id: user.id,
                kind: event.event_type.clone(),
                title: title.to_string(),
                body: body.clone(),
                entity_type: event.source_entity_type.clone(),
                entity_id: event.source_entity_id,
                dedup_key: Some(dedup_key.clone()),
            };

            let notification_id = match NotificationRepo::create(&self.pool, &input).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    tracing::debug!(
                        user_id = user.id,
                        %dedup_key,
                        "Notification already delivered"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        user_id = user.id,
                        event_type = %event.event_type,
                        "Failed to write notification"
                    );
                    routed.failed += 1;
                    last_error = Some(e);
                    continue;
                }
            };
            routed.created += 1;

            // Disabled accounts keep their in-app history but get no mail,
            // except for the notice that they were disabled.
            let mailable = user.status == USER_STATUS_ACTIVE
                || event.event_type == EVENT_USER_DISABLED;
            if let Some(email) = &self.email {
                if mailable && emails_for(&event.event_type) {
                    let sent = email
                        .deliver(&user.email, &user.display_name, title, &body)
                        .await;
                    if let Err(e) = sent {
                        tracing::warn!(
                            error = %e,
                            user_id = user.id,
                            notification_id,
                            "Email delivery failed"
                        );
                    }
                }
            }
        }

        tracing::debug!(
            event_type = %event.event_type,
            recipients = recipients.len(),
            created = routed.created,
            failed = routed.failed,
            "Event routed"
        );
        match last_error {
            Some(e) if routed.failed == recipients.len() => Err(e),
            _ => Ok(routed),
        }
    }
}

/// Outcome of routing one event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Routed {
    /// Notifications written by this call.
    pub created: usize,
    /// Recipients whose notification could not be written.
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn text<'a>(event: &'a PlatformEvent, key: &str) -> Option<&'a str> {
    event.payload.get(key).and_then(|v| v.as_str())
}

fn money(event: &PlatformEvent, key: &str) -> Option<String> {
    event
        .payload
        .get(key)
        .and_then(|v| v.as_i64())
        .map(format_cents)
}

/// Format minor units as a decimal amount, e.g. `40000` as `400.00`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Render the human-readable body of the notification for `event`.
pub fn render_body(event: &PlatformEvent) -> String {
    let project = text(event, "title").unwrap_or("your project");
    match event.event_type.as_str() {
        EVENT_PROJECT_BOOKED => match money(event, "amount") {
            Some(amount) => format!("You were booked for \"{project}\" ({amount} held in escrow)."),
            None => format!("You were booked for \"{project}\"."),
        },
        EVENT_PROJECT_APPROVED => format!("The booking for \"{project}\" was approved. Work can start."),
        EVENT_PROJECT_DELIVERED => format!("\"{project}\" was delivered and is awaiting approval."),
        EVENT_PROJECT_COMPLETED => match money(event, "amount") {
            Some(amount) => format!("\"{project}\" is complete. {amount} was released."),
            None => format!("\"{project}\" is complete."),
        },
        EVENT_PROJECT_DISPUTED => format!("A dispute was opened on \"{project}\"."),
        EVENT_PROJECT_RESOLVED => match text(event, "outcome") {
            Some("refund") => format!("The dispute on \"{project}\" was resolved with a refund to the client."),
            Some(_) => format!("The dispute on \"{project}\" was resolved in favor of the photographer."),
            None => format!("The dispute on \"{project}\" was resolved."),
        },
        EVENT_PROJECT_DISABLED => match money(event, "amount") {
            Some(amount) => format!("\"{project}\" was disabled by an administrator. {amount} was refunded."),
            None => format!("\"{project}\" was disabled by an administrator."),
        },
        EVENT_BID_PLACED => match money(event, "amount") {
            Some(amount) => format!("A photographer bid {amount} on \"{project}\"."),
            None => format!("A photographer bid on \"{project}\"."),
        },
        EVENT_CHAT_MESSAGE => text(event, "preview").unwrap_or("You have a new message.").to_string(),
        EVENT_PAYOUT_COMPLETED => match money(event, "amount") {
            Some(amount) => format!("Your payout of {amount} was sent."),
            None => "Your payout was sent.".to_string(),
        },
        EVENT_PAYOUT_REJECTED => "Your payout request was declined. Your balance is unchanged.".to_string(),
        EVENT_USER_DISABLED => "Your account was disabled by an administrator.".to_string(),
        EVENT_BALANCE_ADJUSTED => match money(event, "amount") {
            Some(amount) => format!("Your balance was adjusted by {amount}."),
            None => "Your balance was adjusted.".to_string(),
        },
        other => format!("Event: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cents_format_with_two_decimals() {
        assert_eq!(format_cents(40_000), "400.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-1_050), "-10.50");
    }

    #[test]
    fn disable_body_mentions_refund_when_money_moved() {
        let event = PlatformEvent::new(EVENT_PROJECT_DISABLED)
            .with_payload(json!({ "title": "Wedding", "amount": 25_000 }));
        assert_eq!(
            render_body(&event),
            "\"Wedding\" was disabled by an administrator. 250.00 was refunded."
        );

        let open =
            PlatformEvent::new(EVENT_PROJECT_DISABLED).with_payload(json!({ "title": "Wedding" }));
        assert_eq!(render_body(&open), "\"Wedding\" was disabled by an administrator.");
    }

    #[test]
    fn resolution_body_names_the_outcome() {
        let refund = PlatformEvent::new(EVENT_PROJECT_RESOLVED)
            .with_payload(json!({ "title": "Gala", "outcome": "refund" }));
        assert!(render_body(&refund).contains("refund to the client"));

        let pay = PlatformEvent::new(EVENT_PROJECT_RESOLVED)
            .with_payload(json!({ "title": "Gala", "outcome": "pay" }));
        assert!(render_body(&pay).contains("in favor of the photographer"));
    }

    #[test]
    fn chat_body_is_the_preview() {
        let event = PlatformEvent::new(EVENT_CHAT_MESSAGE)
            .with_payload(json!({ "preview": "See you at 5" }));
        assert_eq!(render_body(&event), "See you at 5");
    }

    #[test]
    fn missing_fields_fall_back_to_generic_text() {
        let event = PlatformEvent::new(EVENT_PROJECT_APPROVED);
        assert_eq!(
            render_body(&event),
            "The booking for \"your project\" was approved. Work can start."
        );
        assert_eq!(render_body(&PlatformEvent::new("custom.thing")), "Event: custom.thing");
    }
}
