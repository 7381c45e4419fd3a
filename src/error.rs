use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::companies::CompanyError;
use crate::dsars::DsarError;
use crate::validation::ValidationErrors;

pub type AppResult<T> = Result<T, AppError>;

/// Failure categories surfaced at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Persistence,
    Signature,
    Upstream,
}

#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            ErrorKind::Authorization,
            StatusCode::UNAUTHORIZED,
            "unauthorized",
        )
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Authorization, StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn forbidden_with(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, StatusCode::FORBIDDEN, message)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, StatusCode::CONFLICT, message)
    }

    /// Logs the detail and hides it from the caller.
    pub fn internal<E: Display>(error: E) -> Self {
        tracing::error!(error = %error, "request failed");
        Self::new(
            ErrorKind::Persistence,
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error",
        )
    }

    pub fn signature() -> Self {
        Self::new(
            ErrorKind::Signature,
            StatusCode::BAD_REQUEST,
            "Invalid signature",
        )
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, StatusCode::BAD_GATEWAY, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            _ => AppError::internal(value),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(value: ValidationErrors) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<CompanyError> for AppError {
    fn from(value: CompanyError) -> Self {
        match value {
            CompanyError::Validation(errors) => errors.into(),
            CompanyError::Forbidden => AppError::forbidden(),
            CompanyError::NotFound => AppError::not_found(),
            err @ CompanyError::DuplicateSlug(_) => AppError::conflict(err.to_string()),
            CompanyError::Database(err) => AppError::internal(err),
        }
    }
}

impl From<DsarError> for AppError {
    fn from(value: DsarError) -> Self {
        match value {
            DsarError::Validation(errors) => errors.into(),
            DsarError::ProfileNotFound => {
                AppError::new(ErrorKind::NotFound, StatusCode::NOT_FOUND, "User Profile Not Found")
            }
            DsarError::NotFound | DsarError::CompanyNotFound => AppError::not_found(),
            err @ DsarError::NotAcceptingRequests => AppError::forbidden_with(err.to_string()),
            DsarError::Database(err) => AppError::internal(err),
        }
    }
}
