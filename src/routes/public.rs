use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    access, companies,
    error::{AppError, AppResult},
    models::Company,
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: i64,
    pub name: String,
    pub representation: String,
    pub slug: String,
}

impl From<Company> for DirectoryEntry {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            representation: company.representation,
            slug: company.slug,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalPage {
    pub id: i64,
    pub name: String,
    pub representation: String,
    pub slug: String,
    pub accepting_requests: bool,
}

pub async fn list_directory(State(state): State<AppState>) -> AppResult<Json<Vec<DirectoryEntry>>> {
    let mut conn = state.db()?;
    let rows = companies::list_published_companies(&mut conn)?;
    Ok(Json(rows.into_iter().map(DirectoryEntry::from).collect()))
}

pub async fn get_portal_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<PortalPage>> {
    let mut conn = state.db()?;
    let company = companies::find_by_slug(&mut conn, &slug)?
        .filter(access::has_public_page)
        .ok_or_else(AppError::not_found)?;

    Ok(Json(PortalPage {
        accepting_requests: access::is_publicly_submittable(&company),
        id: company.id,
        name: company.name,
        representation: company.representation,
        slug: company.slug,
    }))
}
