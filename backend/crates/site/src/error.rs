//! Site Error Types
//!
//! This module provides site-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Site-specific result type alias
pub type SiteResult<T> = Result<T, SiteError>;

/// Site-specific error variants
#[derive(Debug, Error)]
pub enum SiteError {
    /// Malformed request body or field coercion failure
    #[error("Bad request")]
    BadRequest,

    /// Requested resource does not exist (or has expired)
    #[error("Not found")]
    NotFound,

    /// Email address already registered
    #[error("Email address is already in use")]
    DuplicateEmail,

    /// Invalid credentials (unknown email or wrong password)
    #[error("Email or password is incorrect")]
    InvalidCredentials,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Template rendering error
    #[error("Template error: {0}")]
    Render(#[from] minijinja::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SiteError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            SiteError::BadRequest => StatusCode::BAD_REQUEST,
            SiteError::NotFound => StatusCode::NOT_FOUND,
            SiteError::DuplicateEmail => StatusCode::UNPROCESSABLE_ENTITY,
            SiteError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            SiteError::Database(_) | SiteError::Render(_) | SiteError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SiteError::BadRequest => ErrorKind::BadRequest,
            SiteError::NotFound => ErrorKind::NotFound,
            SiteError::DuplicateEmail => ErrorKind::UnprocessableEntity,
            SiteError::InvalidCredentials => ErrorKind::Unauthorized,
            SiteError::Database(_) | SiteError::Render(_) | SiteError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            SiteError::Database(e) => {
                tracing::error!(error = %e, "Site database error");
            }
            SiteError::Render(e) => {
                tracing::error!(error = %e, "Template rendering failed");
            }
            SiteError::Internal(msg) => {
                tracing::error!(message = %msg, "Site internal error");
            }
            SiteError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            _ => {
                tracing::debug!(error = %self, "Site error");
            }
        }
    }
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        self.log();
        let server_error = self.kind().is_server_error();
        let mut response = self.to_app_error().into_response();
        // Keep-alive state after a server fault is not trustworthy
        if server_error {
            response.headers_mut().insert(
                axum::http::header::CONNECTION,
                axum::http::HeaderValue::from_static("close"),
            );
        }
        response
    }
}

impl From<AppError> for SiteError {
    fn from(err: AppError) -> Self {
        SiteError::Internal(err.to_string())
    }
}
