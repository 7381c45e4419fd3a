use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    access,
    auth::AuthenticatedUser,
    companies,
    dsars::{self, DsarStatus},
    error::{AppError, AppResult},
    models::{Company, User},
    routing::Role,
    schema::users,
    state::AppState,
    validation::CompanyPayload,
};

use super::{dsars::DsarResponse, to_iso, SuccessResponse};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    pub id: i64,
    pub name: String,
    pub representation: String,
    pub slug: String,
    pub status: String,
    pub owner_id: i64,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub accepting_requests: bool,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        let accepting_requests = access::is_publicly_submittable(&company);
        let published = access::is_published(&company);
        Self {
            id: company.id,
            name: company.name,
            representation: company.representation,
            slug: company.slug,
            status: company.status,
            owner_id: company.owner_id,
            stripe_customer_id: company.stripe_customer_id,
            stripe_subscription_id: company.stripe_subscription_id,
            subscription_status: company.subscription_status,
            accepting_requests,
            published,
            created_at: to_iso(company.created_at),
            updated_at: to_iso(company.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct OwnerSummary {
    pub id: i64,
    pub email: String,
}

#[derive(Serialize)]
pub struct AdminCompanyDetail {
    pub company: CompanyResponse,
    pub owner: Option<OwnerSummary>,
}

#[derive(Serialize)]
pub struct OwnerCompanyDetail {
    pub company: CompanyResponse,
    pub requests: Vec<DsarResponse>,
}

#[derive(Deserialize)]
pub struct RequestFilter {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCompanyStatusRequest {
    pub status: String,
}

pub async fn create_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CompanyPayload>,
) -> AppResult<(StatusCode, Json<CompanyResponse>)> {
    let mut conn = state.db()?;
    let owner = user.require_role(&mut conn, Role::Owner)?;
    let company = companies::create_company(&mut conn, owner.id, payload)?;
    Ok((StatusCode::CREATED, Json(company.into())))
}

pub async fn list_owner_companies(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<CompanyResponse>>> {
    let mut conn = state.db()?;
    let owner = user.require_role(&mut conn, Role::Owner)?;
    let rows = companies::list_owned_companies(&mut conn, owner.id)?;
    Ok(Json(rows.into_iter().map(CompanyResponse::from).collect()))
}

pub async fn get_owner_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(company_id): Path<i64>,
    Query(filter): Query<RequestFilter>,
) -> AppResult<Json<OwnerCompanyDetail>> {
    let status = parse_status_filter(filter.status.as_deref())?;

    let mut conn = state.db()?;
    let owner = user.require_role(&mut conn, Role::Owner)?;
    let company = companies::find_owned_company(&mut conn, owner.id, company_id)?;
    let requests = dsars::list_for_company(&mut conn, company.id, status)?;

    Ok(Json(OwnerCompanyDetail {
        company: company.into(),
        requests: requests.into_iter().map(DsarResponse::from).collect(),
    }))
}

fn parse_status_filter(raw: Option<&str>) -> AppResult<Option<DsarStatus>> {
    match raw {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value
            .parse::<DsarStatus>()
            .map(Some)
            .map_err(|err| AppError::bad_request(err.to_string())),
    }
}

pub async fn admin_list_companies(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<CompanyResponse>>> {
    let mut conn = state.db()?;
    user.require_role(&mut conn, Role::Admin)?;
    let rows = companies::list_companies(&mut conn)?;
    Ok(Json(rows.into_iter().map(CompanyResponse::from).collect()))
}

pub async fn admin_get_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(company_id): Path<i64>,
) -> AppResult<Json<AdminCompanyDetail>> {
    let mut conn = state.db()?;
    user.require_role(&mut conn, Role::Admin)?;
    let company = companies::find_company(&mut conn, company_id)?;
    let owner = users::table
        .find(company.owner_id)
        .first::<User>(&mut conn)
        .optional()?
        .map(|owner| OwnerSummary {
            id: owner.id,
            email: owner.email,
        });

    Ok(Json(AdminCompanyDetail {
        company: company.into(),
        owner,
    }))
}

pub async fn update_company_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(company_id): Path<i64>,
    Json(payload): Json<UpdateCompanyStatusRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let mut conn = state.db()?;
    companies::set_company_status(&mut conn, company_id, &payload.status, &user.email)?;
    Ok(Json(SuccessResponse::ok()))
}
