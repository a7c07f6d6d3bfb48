//! WebAPI - HTTP Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP routes (viewer page, video feed, move commands)
//! - Direction token validation at the boundary
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::actuator::Axis;
use crate::models::{AxisStatus, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        viewers: state.hub.viewer_count(),
        frames_streamed: state.hub.frames_streamed(),
    };

    Json(response)
}

/// Device status endpoint
pub async fn device_status(State(state): State<AppState>) -> impl IntoResponse {
    let axes: Vec<AxisStatus> = [Axis::Azimuth, Axis::Elevation]
        .into_iter()
        .map(|axis| AxisStatus {
            axis,
            pin: state.config.servo.pin(axis),
            moving: state.actuator.is_moving(axis),
        })
        .collect();

    Json(json!({
        "device_type": "pantilt-cam",
        "firmware_version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "axes": axes
    }))
}
