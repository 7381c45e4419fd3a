use std::env;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::billing::{SubscriptionPlan, DEFAULT_STRIPE_API_BASE};
use crate::db::DEFAULT_MAX_POOL_SIZE;
use crate::webhook::DEFAULT_TOLERANCE_SECONDS;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub cors_allowed_origin: Option<String>,
    pub app_base_url: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub stripe_webhook_tolerance_seconds: i64,
    pub subscription_currency: String,
    pub subscription_unit_amount: i64,
    pub subscription_interval: String,
    pub enforce_submission_gate: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "dsar-portal".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "dsar-portal-clients".to_string());
        let jwt_expiry_minutes = env::var("JWT_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("JWT_EXPIRY_MINUTES must be an integer")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let app_base_url = env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        Url::parse(&app_base_url).context("APP_BASE_URL must be an absolute URL")?;
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok();
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").ok();
        let stripe_api_base =
            env::var("STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string());
        let stripe_webhook_tolerance_seconds = env::var("STRIPE_WEBHOOK_TOLERANCE_SECONDS")
            .ok()
            .map(|value| value.parse::<i64>())
            .transpose()
            .context("STRIPE_WEBHOOK_TOLERANCE_SECONDS must be an integer")?
            .unwrap_or(DEFAULT_TOLERANCE_SECONDS);
        let subscription_currency =
            env::var("SUBSCRIPTION_CURRENCY").unwrap_or_else(|_| "gbp".to_string());
        let subscription_unit_amount = env::var("SUBSCRIPTION_UNIT_AMOUNT")
            .unwrap_or_else(|_| "2900".to_string())
            .parse()
            .context("SUBSCRIPTION_UNIT_AMOUNT must be an integer amount in minor units")?;
        let subscription_interval =
            env::var("SUBSCRIPTION_INTERVAL").unwrap_or_else(|_| "month".to_string());
        let enforce_submission_gate = env::var("ENFORCE_SUBMISSION_GATE")
            .ok()
            .map(|value| parse_flag(&value))
            .transpose()
            .context("ENFORCE_SUBMISSION_GATE must be a boolean flag")?
            .unwrap_or(true);

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_minutes,
            cors_allowed_origin,
            app_base_url,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_api_base,
            stripe_webhook_tolerance_seconds,
            subscription_currency,
            subscription_unit_amount,
            subscription_interval,
            enforce_submission_gate,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }

    pub fn subscription_plan(&self) -> SubscriptionPlan {
        SubscriptionPlan {
            currency: self.subscription_currency.clone(),
            unit_amount: self.subscription_unit_amount,
            interval: self.subscription_interval.clone(),
        }
    }

    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}/owner?session_id={{CHECKOUT_SESSION_ID}}&success=true",
            self.app_base_url
        )
    }

    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/owner?canceled=true", self.app_base_url)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Ok(true),
        "0" | "false" | "no" | "off" | "disabled" => Ok(false),
        other => bail!("unrecognised flag value {other:?}"),
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
