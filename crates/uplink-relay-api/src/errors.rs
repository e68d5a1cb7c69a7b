//! Error types for the HTTP service

use crate::responses::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uplink_relay_core::{DispatchError, ValidationError};
use tracing::{error, warn};

/// Uplink handler errors with HTTP status code mapping
///
/// Every dispatch failure, whatever the stage, is reported to the caller as
/// the same `500` body whose `details` carry only the underlying cause. The
/// failing target, the stage and any downstream status are logged
/// server-side.
#[derive(Debug, thiserror::Error)]
pub enum RelayHandlerError {
    /// Transform, validation or forward failure for one of the targets
    ///
    /// Maps to: `500 Internal Server Error`
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Request body is not JSON
    ///
    /// Maps to: `400 Bad Request`
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

impl RelayHandlerError {
    /// Status code returned to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RelayHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Self::Dispatch(ref e) => {
                let downstream_status = match e {
                    DispatchError::Forward { source, .. } => source.status(),
                    _ => None,
                };
                error!(
                    target_name = %e.target(),
                    stage = e.kind(),
                    downstream_status = ?downstream_status,
                    error = %e,
                    "Failed to forward payloads"
                );
                ErrorResponse::new("Failed to forward payloads", e.cause())
            }
            Self::MalformedPayload(ref e) => {
                warn!(error = %e, "Rejected malformed uplink payload");
                ErrorResponse::new("Invalid JSON payload", e.to_string())
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },

    #[error("Invalid target #{index} ('{name}'): {source}")]
    InvalidTarget {
        index: usize,
        name: String,
        source: ValidationError,
    },

    #[error("Target '{name}' is configured more than once")]
    DuplicateTarget { name: String },
}
