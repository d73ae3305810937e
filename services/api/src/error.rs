//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto HTTP status codes.

use axum::http::StatusCode;
use study_plan_core::{PlanError, UpstreamErrorKind};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the plan service.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unauthorized: No user ID provided")]
    Unauthorized,

    /// The request body or path could not be decoded.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Plan(e) => match e {
                PlanError::Validation(_) => StatusCode::BAD_REQUEST,
                PlanError::NotFound(_) => StatusCode::NOT_FOUND,
                PlanError::Upstream(u) if u.kind == UpstreamErrorKind::RateLimited => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                PlanError::Upstream(_)
                | PlanError::MalformedResponse(_)
                | PlanError::Schema(_) => StatusCode::BAD_GATEWAY,
                PlanError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail safe to show a client outside production. Generation failures
    /// are summarized by category; raw model output only goes to the logs.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Plan(PlanError::MalformedResponse(_)) => {
                "generation output did not contain a usable JSON object".to_string()
            }
            ApiError::Plan(PlanError::Schema(e)) => {
                format!("generation output is missing or has an invalid `{}`", e.field)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_plan_core::{PortError, UpstreamError, ValidationError};

    #[test]
    fn plan_errors_map_onto_http_statuses() {
        let cases = [
            (
                ApiError::from(PlanError::from(ValidationError::new("subject", "empty"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(PlanError::from(PortError::NotFound("p1".into()))),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(PlanError::from(UpstreamError::rate_limited("429"))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(PlanError::from(UpstreamError::transport("reset"))),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(PlanError::from(PortError::Unexpected("down".into()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }
}
