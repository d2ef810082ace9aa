/// Unified error types for DIDgeridoo
use crate::validation::FieldErrors;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the settings and profile surfaces
#[derive(Error, Debug)]
pub enum DidgeridooError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Startup configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings or profile write rejected, per-field messages
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Caller lacks the required capability
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The subdomain self-test could not reach the probe URL
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The persisted handle list is not valid structured data
    #[error("Stored configuration is corrupt: {0}")]
    ConfigCorrupt(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn error_body(status: StatusCode, error: &str, message: String) -> Response {
    let body = Json(ErrorResponse {
        error: error.to_string(),
        message,
    });
    (status, body).into_response()
}

impl IntoResponse for DidgeridooError {
    fn into_response(self) -> Response {
        match self {
            DidgeridooError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            DidgeridooError::UpstreamUnreachable(reason) => {
                tracing::debug!(reason = %reason, "probe_failure_reported");
                let mut errors = FieldErrors::new();
                errors.add("didgeridoo_subdomain", "The URL is not reachable.");
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            DidgeridooError::Unauthorized(_) => {
                error_body(StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            DidgeridooError::NotFound(_) => {
                error_body(StatusCode::NOT_FOUND, "NotFound", self.to_string())
            }
            DidgeridooError::ConfigCorrupt(_) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "ConfigCorrupt",
                self.to_string(),
            ),
            other => {
                tracing::error!(error = %other, "request_failed");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        }
    }
}

/// Result type alias for DIDgeridoo operations
pub type DidgeridooResult<T> = Result<T, DidgeridooError>;

/// Plain-text failures of the well-known endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Host header does not match the handle grammar
    #[error("Invalid handle")]
    InvalidHandle,

    /// Syntactically valid host with no configured DID
    #[error("Not found")]
    NotFound,

    /// Persisted handle list could not be parsed
    #[error("Configuration error")]
    ConfigCorrupt,

    /// Storage unavailable
    #[error("Internal error")]
    Internal,
}

impl ResolutionError {
    pub fn status(&self) -> StatusCode {
        match self {
            ResolutionError::InvalidHandle => StatusCode::BAD_REQUEST,
            ResolutionError::NotFound => StatusCode::NOT_FOUND,
            ResolutionError::ConfigCorrupt | ResolutionError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionError::InvalidHandle => "invalid_handle",
            ResolutionError::NotFound => "not_found",
            ResolutionError::ConfigCorrupt => "config_corrupt",
            ResolutionError::Internal => "internal",
        }
    }
}

impl From<DidgeridooError> for ResolutionError {
    fn from(err: DidgeridooError) -> Self {
        match err {
            DidgeridooError::ConfigCorrupt(reason) => {
                tracing::error!(reason = %reason, "stored handle list is corrupt");
                ResolutionError::ConfigCorrupt
            }
            other => {
                tracing::error!(error = %other, "failed to load configuration");
                ResolutionError::Internal
            }
        }
    }
}

impl IntoResponse for ResolutionError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain")],
            format!("{}\n", self),
        )
            .into_response()
    }
}
