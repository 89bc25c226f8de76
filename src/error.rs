use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid state")]
    InvalidState,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Upstream request failed: {0}")]
    UpstreamFailed(String),

    #[error("Server not configured: {0}")]
    NotConfigured(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::InvalidState => (StatusCode::BAD_REQUEST, "Invalid state".to_string()),
            ServerError::TokenExchange(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Token exchange failed: {}", msg),
            ),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::AccessDenied(msg) => (StatusCode::FORBIDDEN, msg),
            ServerError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ServerError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.".to_string(),
            ),
            ServerError::UpstreamFailed(msg) => (StatusCode::BAD_GATEWAY, msg),
            ServerError::NotConfigured(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ServerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::UpstreamFailed(format!("Upstream request failed: {}", err))
    }
}

impl From<crate::services::session_store::StoreError> for ServerError {
    fn from(err: crate::services::session_store::StoreError) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for ServerError {
    fn from(err: config::ConfigError) -> Self {
        ServerError::NotConfigured(format!("Configuration error: {}", err))
    }
}
