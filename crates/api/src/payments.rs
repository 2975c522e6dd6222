//! Outbound payout transfers.
//!
//! [`PayoutGateway`] moves money from the platform to a user's connected
//! payment account. [`StripeGateway`] implements it against the processor's
//! transfers endpoint. Every transfer carries an idempotency key, so a
//! retried completion never pays twice.

use altme_core::types::Cents;
use async_trait::async_trait;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Transfer rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PayoutGateway: Send + Sync {
    /// Transfer `amount` cents to `account`. Returns the provider's transfer
    /// reference.
    async fn transfer(
        &self,
        account: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<String, PaymentError>;
}

// ---------------------------------------------------------------------------
// Stripe
// ---------------------------------------------------------------------------

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_CURRENCY: &str = "usd";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub currency: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `STRIPE_SECRET_KEY` is not set; payouts are then
    /// completed manually.
    ///
    /// | Variable            | Required | Default                  |
    /// |---------------------|----------|--------------------------|
    /// | `STRIPE_SECRET_KEY` | yes      |                          |
    /// | `STRIPE_API_BASE`   | no       | `https://api.stripe.com` |
    /// | `STRIPE_CURRENCY`   | no       | `usd`                    |
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|k| !k.is_empty())?;
        Some(Self {
            secret_key,
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            currency: std::env::var("STRIPE_CURRENCY")
                .unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    id: String,
}

pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn transfers_url(&self) -> String {
        format!("{}/v1/transfers", self.config.api_base.trim_end_matches('/'))
    }

    fn transfer_form(&self, account: &str, amount: Cents) -> Vec<(&'static str, String)> {
        vec![
            ("amount", amount.to_string()),
            ("currency", self.config.currency.clone()),
            ("destination", account.to_string()),
        ]
    }
}

#[async_trait]
impl PayoutGateway for StripeGateway {
    async fn transfer(
        &self,
        account: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<String, PaymentError> {
        let response = self
            .client
            .post(self.transfers_url())
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(&self.transfer_form(account, amount))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let transfer: TransferResponse = response.json().await?;
        tracing::info!(
            account,
            amount,
            idempotency_key,
            transfer_id = %transfer.id,
            "Payout transfer created"
        );
        Ok(transfer.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> StripeGateway {
        StripeGateway::new(StripeConfig {
            secret_key: "sk_test".to_string(),
            api_base: base.to_string(),
            currency: "eur".to_string(),
        })
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        assert_eq!(
            gateway("http://localhost:12111/").transfers_url(),
            "http://localhost:12111/v1/transfers"
        );
    }

    #[test]
    fn form_names_destination_and_currency() {
        let form = gateway(DEFAULT_API_BASE).transfer_form("acct_123", 2_500);
        assert!(form.contains(&("amount", "2500".to_string())));
        assert!(form.contains(&("currency", "eur".to_string())));
        assert!(form.contains(&("destination", "acct_123".to_string())));
    }

    #[test]
    fn rejected_error_display() {
        let err = PaymentError::Rejected {
            status: 402,
            message: "insufficient funds".to_string(),
        };
        assert_eq!(err.to_string(), "Transfer rejected (402): insufficient funds");
    }
}
