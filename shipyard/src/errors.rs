//! Error types for the Shipyard service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shipyard_api::{ErrorResponse, ErrorsResponse};
use thiserror::Error;
use tracing::error;

/// Main error type for Shipyard
#[derive(Error, Debug)]
pub enum ShipyardError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// One message per violated rule
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    /// Non-success response from a Shipyard server
    #[error("API error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShipyardError {
    /// Single-message validation failure
    pub fn invalid(message: impl Into<String>) -> Self {
        ShipyardError::Validation(vec![message.into()])
    }
}

impl IntoResponse for ShipyardError {
    fn into_response(self) -> Response {
        match self {
            ShipyardError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(ErrorsResponse { errors })).into_response()
            }
            ShipyardError::Conflict(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorsResponse {
                    errors: vec![message],
                }),
            )
                .into_response(),
            ShipyardError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message })).into_response()
            }
            ShipyardError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            other => {
                // Details stay in the server log only
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ShipyardError::invalid("bad"), StatusCode::BAD_REQUEST),
            (ShipyardError::Conflict("dup".into()), StatusCode::BAD_REQUEST),
            (ShipyardError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ShipyardError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                ShipyardError::StoreError("connection refused".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_validation_display_joins_messages() {
        let err = ShipyardError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Validation failed: a; b");
    }
}
