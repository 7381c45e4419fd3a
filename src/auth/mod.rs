pub mod jwt;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::User,
    routing::Role,
    state::AppState,
    users,
};

/// Identity asserted by a verified bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            subject: claims.sub,
            email: claims.email,
        })
    }
}

impl AuthenticatedUser {
    /// Loads the caller's profile and checks its role. A missing profile is
    /// reported the same way as a wrong role.
    pub fn require_role(&self, conn: &mut PgConnection, role: Role) -> AppResult<User> {
        let profile = users::find_by_email(conn, &self.email)?.ok_or_else(AppError::forbidden)?;
        if profile.role.parse::<Role>().ok() != Some(role) {
            tracing::warn!(
                user_id = profile.id,
                role = %profile.role,
                required = %role,
                "role check failed"
            );
            return Err(AppError::forbidden());
        }
        Ok(profile)
    }
}
