use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::auth::Access;
use crate::services::SignupError;

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),

    Forbidden(String),

    NotFound(String),

    Conflict(String),

    ValidationError(String),

    /// Validation failure attributed to a single request field.
    FieldValidation { field: &'static str, message: String },

    /// An upstream dependency (the mail gateway) failed.
    DependencyFailure(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::FieldValidation { field, message } => {
                write!(f, "Validation error on '{}': {}", field, message)
            }
            ApiError::DependencyFailure(msg) => write!(f, "Dependency failure: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field, error_message) = match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, None, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, None, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, None, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, None, msg),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, None, msg),
            ApiError::FieldValidation { field, message } => {
                (StatusCode::BAD_REQUEST, Some(field), message)
            }
            ApiError::DependencyFailure(msg) => {
                tracing::warn!("Dependency failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    None,
                    "An upstream service is unavailable".to_string(),
                )
            }
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut body = ApiResponse::<()>::error(error_message);
        body.field = field.map(String::from);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<SignupError> for ApiError {
    fn from(err: SignupError) -> Self {
        match err {
            SignupError::Invalid { field, message } => ApiError::FieldValidation { field, message },
            SignupError::Conflict(msg) => ApiError::Conflict(msg),
            SignupError::UnknownUsername(username) => {
                ApiError::NotFound(format!("User '{}' not found", username))
            }
            SignupError::MailDelivery(msg) => ApiError::DependencyFailure(msg),
            SignupError::Internal(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn title_not_found(id: i32) -> Self {
        ApiError::NotFound(format!("Title {} not found", id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}

/// Translates a permission verdict into an error, or lets the request
/// proceed.
pub fn require(access: Access) -> Result<(), ApiError> {
    match access {
        Access::Allow => Ok(()),
        Access::Unauthenticated => Err(ApiError::Unauthenticated(
            "Authentication credentials were not provided".to_string(),
        )),
        Access::Forbidden => Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        )),
    }
}
