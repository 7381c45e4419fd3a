use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    access,
    auth::AuthenticatedUser,
    companies,
    dsars::{self, GatePolicy},
    error::{AppError, AppResult},
    models::DsarRequest,
    routing::Role,
    state::AppState,
    validation::DsarPayload,
};

use super::to_iso;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DsarResponse {
    pub id: i64,
    pub company_id: i64,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: String,
    pub request_text: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DsarRequest> for DsarResponse {
    fn from(request: DsarRequest) -> Self {
        Self {
            id: request.id,
            company_id: request.company_id,
            requester_name: request.requester_name,
            requester_email: request.requester_email,
            requester_phone: request.requester_phone,
            request_text: request.request_text,
            status: request.status,
            created_at: to_iso(request.created_at),
            updated_at: to_iso(request.updated_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDsarResponse {
    #[serde(flatten)]
    pub request: DsarResponse,
    pub company_name: String,
    pub company_slug: String,
}

/// Body of a submission made from a company's portal page; the company
/// comes from the path.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSubmission {
    #[serde(default)]
    pub requester_name: String,
    #[serde(default)]
    pub requester_email: String,
    #[serde(default)]
    pub requester_phone: String,
    #[serde(default)]
    pub request_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDsarStatusRequest {
    pub status: String,
    #[serde(default)]
    pub company_slug: Option<String>,
}

pub async fn submit_dsar(
    State(state): State<AppState>,
    Json(payload): Json<DsarPayload>,
) -> AppResult<(StatusCode, Json<DsarResponse>)> {
    let mut conn = state.db()?;
    let request = dsars::submit_dsar(&mut conn, payload, state.submission_gate())?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn submit_portal_request(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<PortalSubmission>,
) -> AppResult<(StatusCode, Json<DsarResponse>)> {
    let mut conn = state.db()?;
    let company = companies::find_by_slug(&mut conn, &slug)?
        .filter(access::has_public_page)
        .ok_or_else(AppError::not_found)?;

    let payload = DsarPayload {
        company_id: Some(company.id),
        owner_id: Some(company.owner_id),
        requester_name: body.requester_name,
        requester_email: body.requester_email,
        requester_phone: body.requester_phone,
        request_text: body.request_text,
    };
    let request = dsars::submit_dsar(&mut conn, payload, GatePolicy::Enforce)?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn update_dsar_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(dsar_id): Path<i64>,
    Json(payload): Json<UpdateDsarStatusRequest>,
) -> AppResult<Json<DsarResponse>> {
    let mut conn = state.db()?;
    let request = dsars::set_dsar_status(&mut conn, dsar_id, &payload.status, &user.email)?;

    if let Some(slug) = payload.company_slug.as_deref() {
        tracing::debug!(dsar_id, company_slug = slug, "request status changed from portal view");
    }
    Ok(Json(request.into()))
}

pub async fn admin_list_dsars(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<AdminDsarResponse>>> {
    let mut conn = state.db()?;
    user.require_role(&mut conn, Role::Admin)?;
    let rows = dsars::list_all(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|(request, company)| AdminDsarResponse {
                request: request.into(),
                company_name: company.name,
                company_slug: company.slug,
            })
            .collect(),
    ))
}
