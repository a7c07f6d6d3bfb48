//! Error handling for the pan-tilt camserver

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// pigpio daemon unreachable or handle already released
    #[error("PWM backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Sensor failed to deliver a frame
    #[error("Capture error: {0}")]
    Capture(String),

    /// Frame could not be compressed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Commanded pulse width outside the safe envelope
    #[error("Pulse width {pulse_us}us outside safe envelope {min_us}..={max_us}us")]
    OutOfRange {
        pulse_us: i64,
        min_us: u32,
        max_us: u32,
    },

    /// Direction token outside {UP, DOWN, LEFT, RIGHT}
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::BackendUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "BACKEND_UNAVAILABLE",
                msg.clone(),
            ),
            Error::Capture(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CAPTURE_ERROR",
                msg.clone(),
            ),
            Error::Encode(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENCODE_ERROR",
                msg.clone(),
            ),
            Error::OutOfRange { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "OUT_OF_RANGE",
                self.to_string(),
            ),
            Error::UnknownCommand(token) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_COMMAND",
                format!("Unknown direction: {}", token),
            ),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
