//! Notification emails over SMTP.
//!
//! Email mirrors the in-app inbox for the events worth leaving it for. With
//! no `SMTP_HOST` configured the platform runs in-app only.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "noreply@altme.local";

const SUBJECT_PREFIX: &str = "[AltMe]";

const FOOTER: &str = "You are receiving this because of activity on your AltMe account.\n\
                      Your full notification history is in the app.";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default               |
    /// |-----------------|----------|-----------------------|
    /// | `SMTP_HOST`     | yes      |                       |
    /// | `SMTP_PORT`     | no       | `587`                 |
    /// | `SMTP_FROM`     | no       | `noreply@altme.local` |
    /// | `SMTP_USER`     | no       |                       |
    /// | `SMTP_PASSWORD` | no       |                       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends notification emails through one pooled SMTP transport.
pub struct EmailDelivery {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Build the mailer. Fails on an unparseable `SMTP_FROM` or relay host.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Ok(Self {
            from: config.from_address.parse()?,
            transport: builder.build(),
        })
    }

    /// Assemble the message without sending it.
    pub fn build_message(
        &self,
        to_email: &str,
        to_name: &str,
        title: &str,
        body: &str,
    ) -> Result<Message, EmailError> {
        let to = Mailbox::new(Some(to_name.to_string()), to_email.parse()?);
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("{SUBJECT_PREFIX} {title}"))
            .header(ContentType::TEXT_PLAIN)
            .body(format!("{body}\n\n--\n{FOOTER}\n"))
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    /// Send one notification email.
    pub async fn deliver(
        &self,
        to_email: &str,
        to_name: &str,
        title: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let message = self.build_message(to_email, to_name, title, body)?;
        self.transport.send(message).await?;
        tracing::info!(to = to_email, title, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
