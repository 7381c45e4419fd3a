use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::User,
    routing, users,
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub success: bool,
    pub redirect_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub redirect_url: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Syncs the signed-in identity to a profile row and says where to go next.
pub async fn authenticate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<AuthenticateResponse>> {
    let mut conn = state.db()?;
    let profile = users::ensure_profile(&mut conn, &user.email)?;

    Ok(Json(AuthenticateResponse {
        success: true,
        redirect_url: routing::route_for(Some(&profile)).to_string(),
    }))
}

pub async fn route(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
) -> AppResult<Json<RouteResponse>> {
    let profile = match user {
        Some(user) => {
            let mut conn = state.db()?;
            users::find_by_email(&mut conn, &user.email)?
        }
        None => None,
    };

    Ok(Json(RouteResponse {
        redirect_url: routing::route_for(profile.as_ref()).to_string(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ProfileResponse>> {
    let mut conn = state.db()?;
    let profile = users::find_by_email(&mut conn, &user.email)?.ok_or_else(AppError::not_found)?;
    Ok(Json(profile.into()))
}
