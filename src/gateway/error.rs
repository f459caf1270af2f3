use crate::core::VaultError;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug)]
pub enum GatewayError {
    Store(VaultError),
    Input(String),
    PayloadTooLarge(String),
}

impl From<VaultError> for GatewayError {
    fn from(err: VaultError) -> Self {
        GatewayError::Store(err)
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::Input(rejection.body_text())
    }
}

impl From<MultipartError> for GatewayError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge(err.body_text())
        } else {
            GatewayError::Input(err.body_text())
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GatewayError::Store(VaultError::ValidationError(msg)) => (StatusCode::BAD_REQUEST, msg),
            GatewayError::Store(err @ VaultError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            GatewayError::Store(VaultError::PayloadTooLarge(msg)) => {
                (StatusCode::PAYLOAD_TOO_LARGE, msg)
            }
            GatewayError::Store(err) => {
                error!(error = %err, "backup gateway request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            GatewayError::Input(msg) => (StatusCode::BAD_REQUEST, msg),
            GatewayError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
        });

        (status, body).into_response()
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
