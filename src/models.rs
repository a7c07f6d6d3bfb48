//! Shared models and types
//!
//! Response types shared across web_api handlers.

use crate::actuator::{Axis, Direction};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Accepted move command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResult {
    pub direction: Direction,
    pub axis: Axis,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub viewers: u64,
    pub frames_streamed: u64,
}

/// Per-axis status entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisStatus {
    pub axis: Axis,
    pub pin: u8,
    pub moving: bool,
}
