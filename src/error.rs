/// Unified error types for the alumni portal backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// A validation failure attached to a specific request field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the portal
#[derive(Error, Debug)]
pub enum PortalError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors without a specific field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Validation errors carrying field-level messages
    #[error("Validation failed")]
    FieldValidation(Vec<FieldError>),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate username or email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Mail delivery errors
    #[error("Mail error: {0}")]
    Mail(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert PortalError to HTTP response
impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        // Field validation gets its own body shape so clients can attach
        // messages to individual form inputs
        if let PortalError::FieldValidation(errors) = &self {
            let mut fields = serde_json::Map::new();
            for e in errors {
                fields.insert(e.field.clone(), json!(e.message));
            }
            let body = Json(json!({
                "error": "ValidationError",
                "message": "Validation failed",
                "fields": fields,
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let (status, error_code, message) = match &self {
            PortalError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            PortalError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            PortalError::Validation(_) | PortalError::FieldValidation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            PortalError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            PortalError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            PortalError::Database(_)
            | PortalError::Mail(_)
            | PortalError::Internal(_)
            | PortalError::Io(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for portal operations
pub type PortalResult<T> = Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                PortalError::Authentication("no token".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                PortalError::Authorization("staff only".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                PortalError::Validation("bad input".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PortalError::NotFound("user 7".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PortalError::Conflict("username taken".into()),
                StatusCode::CONFLICT,
            ),
            (
                PortalError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_field_validation_is_bad_request() {
        let err = PortalError::FieldValidation(vec![FieldError::new(
            "confirm_email",
            "Email addresses do not match.",
        )]);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
