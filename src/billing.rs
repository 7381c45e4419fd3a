use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Price and cadence of the portal subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub currency: String,
    pub unit_amount: i64,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub company_id: i64,
    pub company_name: String,
    pub owner_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub plan: SubscriptionPlan,
}

impl CheckoutRequest {
    pub fn product_name(&self) -> String {
        format!("DSAR Portal Subscription - {}", self.company_name)
    }

    fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "subscription".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            (
                "line_items[0][price_data][currency]",
                self.plan.currency.clone(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                self.product_name(),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                "Monthly subscription for privacy compliance management.".to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                self.plan.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][recurring][interval]",
                self.plan.interval.clone(),
            ),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("metadata[companyId]", self.company_id.to_string()),
            ("metadata[ownerEmail]", self.owner_email.clone()),
            ("customer_email", self.owner_email.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait BillingProvider: Send + Sync + 'static {
    /// Errors carry the processor's own message.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;
}

pub struct StripeBilling {
    client: Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeBilling {
    pub fn new(secret_key: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key,
        }
    }
}

#[derive(Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

#[async_trait]
impl BillingProvider for StripeBilling {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let Some(secret_key) = self.secret_key.as_deref() else {
            bail!("billing is not configured");
        };

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(secret_key)
            .form(&request.form_fields())
            .send()
            .await
            .context("failed to reach billing processor")?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("failed to read billing processor response")?;

        if !status.is_success() {
            let message = serde_json::from_slice::<StripeErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| "Failed to create checkout session".to_string());
            tracing::error!(%status, %message, company_id = request.company_id, "checkout session rejected");
            return Err(anyhow!(message));
        }

        let session: CheckoutSession = serde_json::from_slice(&body)
            .context("unexpected checkout session response")?;
        tracing::info!(
            session_id = %session.id,
            company_id = request.company_id,
            "checkout session created"
        );
        Ok(session)
    }
}
