use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod billing;
pub mod companies;
pub mod dsars;
pub mod health;
pub mod public;

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        tracing::warn!(origin = value, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let owner_routes = Router::new()
        .route(
            "/companies",
            get(companies::list_owner_companies).post(companies::create_company),
        )
        .route("/companies/:id", get(companies::get_owner_company));

    let admin_routes = Router::new()
        .route("/companies", get(companies::admin_list_companies))
        .route("/companies/:id", get(companies::admin_get_company))
        .route(
            "/companies/:id/status",
            patch(companies::update_company_status),
        )
        .route("/dsars", get(dsars::admin_list_dsars));

    let public_routes = Router::new()
        .route("/companies", get(public::list_directory))
        .route("/companies/:slug", get(public::get_portal_page))
        .route(
            "/companies/:slug/requests",
            post(dsars::submit_portal_request),
        );

    let dsar_routes = Router::new()
        .route("/", post(dsars::submit_dsar))
        .route("/:id/status", patch(dsars::update_dsar_status));

    Router::new()
        .route("/api/authenticate", post(auth::authenticate))
        .route("/api/route", get(auth::route))
        .route("/api/me", get(auth::me))
        .nest("/api/owner", owner_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/public", public_routes)
        .nest("/api/dsars", dsar_routes)
        .route("/api/billing/checkout", post(billing::create_checkout))
        .route("/api/webhooks/stripe", post(billing::stripe_webhook))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
}
