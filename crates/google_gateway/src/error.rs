//! Gateway error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The authorization code was rejected by Google. Codes are single-use,
    /// so the user has to restart the login.
    #[error("Authorization code exchange failed: {0}")]
    AuthExchange(String),

    #[error("{reason}")]
    Unauthenticated { reason: String, auth_url: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid values: {0}")]
    ShapeValidation(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Any failure reported by a Google API. `context` is the fixed message
    /// shown to callers, `message` is Google's own text.
    #[error("{context}: {message}")]
    Upstream { context: String, message: String },

    /// Google refused the refresh token (`invalid_grant`): access was revoked
    /// or the grant expired, so only a new login helps.
    #[error("Refresh token rejected: {0}")]
    RefreshRevoked(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn upstream(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>, auth_url: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
            auth_url: auth_url.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthExchange(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Unauthenticated { .. } | GatewayError::RefreshRevoked(_) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::MissingParameter(_)
            | GatewayError::ShapeValidation(_)
            | GatewayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            GatewayError::Unauthenticated { reason, auth_url } => json!({
                "error": reason,
                "authUrl": auth_url,
            }),
            GatewayError::Upstream { context, message } => json!({
                "error": context,
                "details": message,
            }),
            GatewayError::AuthExchange(message) => json!({
                "error": "Failed to exchange authorization code",
                "details": message,
            }),
            other => json!({ "error": other.to_string() }),
        };

        if status.is_server_error() {
            tracing::error!("[ERROR] {} -> {}", status, self);
        } else {
            tracing::debug!("{} -> {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}
