use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    billing::CheckoutRequest,
    companies,
    error::{AppError, AppResult, ErrorKind},
    routing::Role,
    state::AppState,
    subscriptions::{self, MirrorError, WebhookEvent},
    webhook::{self, SIGNATURE_HEADER},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CheckoutBody>,
) -> AppResult<Json<CheckoutResponse>> {
    let (Some(company_id), Some(company_name)) = (
        body.company_id,
        body.company_name.filter(|name| !name.trim().is_empty()),
    ) else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    let company = {
        let mut conn = state.db()?;
        let owner = user.require_role(&mut conn, Role::Owner)?;
        companies::find_owned_company(&mut conn, owner.id, company_id)?
    };

    let request = CheckoutRequest {
        company_id: company.id,
        company_name,
        owner_email: user.email.clone(),
        success_url: state.config.checkout_success_url(),
        cancel_url: state.config.checkout_cancel_url(),
        plan: state.config.subscription_plan(),
    };

    let session = state
        .billing
        .create_checkout_session(&request)
        .await
        .map_err(|err| AppError::upstream(err.to_string()))?;
    let url = session
        .url
        .ok_or_else(|| AppError::upstream("Failed to create checkout session"))?;

    Ok(Json(CheckoutResponse { url }))
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    webhook::verify_signature(
        state.config.stripe_webhook_secret.as_deref(),
        signature,
        &body,
        state.config.stripe_webhook_tolerance_seconds,
        Utc::now().timestamp(),
    )
    .map_err(|err| {
        tracing::warn!(error = %err, "webhook signature rejected");
        AppError::signature()
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|err| AppError::bad_request(format!("invalid event payload: {err}")))?;

    let mut conn = state.db()?;
    match subscriptions::apply_event(&mut conn, &event) {
        Ok(_) => Ok(Json(WebhookAck { received: true })),
        Err(MirrorError::Payload(err)) => Err(AppError::bad_request(format!(
            "invalid event payload: {err}"
        ))),
        Err(err) => {
            tracing::error!(event_id = %event.id, error = %err, "billing event not applied");
            Err(AppError::new(
                ErrorKind::Persistence,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database update failed",
            ))
        }
    }
}
