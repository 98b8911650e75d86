//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::identity::IdentityError;
use crate::services::booking::BookingError;
use crate::services::calendar::CalendarError;

/// Application-level error type for the booking server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity provider lookup failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Booking rules rejected the request.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// Calendar or override request rejected.
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Identity(IdentityError::Unauthenticated) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Identity(_) => StatusCode::BAD_GATEWAY,
            Self::Booking(err) => match err {
                BookingError::Validation(_) => StatusCode::BAD_REQUEST,
                BookingError::ShopNotFound | BookingError::NotFound => StatusCode::NOT_FOUND,
                BookingError::Forbidden => StatusCode::FORBIDDEN,
                BookingError::Closed(_) | BookingError::SlotTaken(_) => StatusCode::CONFLICT,
                BookingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Calendar(err) => match err {
                CalendarError::Range(_) | CalendarError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                CalendarError::Forbidden => StatusCode::FORBIDDEN,
                CalendarError::OverrideNotFound => StatusCode::NOT_FOUND,
                CalendarError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(_)) => {
                "Conflicts with an existing record".to_string()
            }
            Self::Database(_)
            | Self::Booking(BookingError::Repository(_))
            | Self::Calendar(CalendarError::Repository(_)) => "Internal server error".to_string(),
            Self::Identity(IdentityError::Unauthenticated) => "Not authenticated".to_string(),
            Self::Identity(_) => "Identity provider unavailable".to_string(),
            Self::Booking(err) => err.to_string(),
            Self::Calendar(err) => err.to_string(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
