//! Application state
//!
//! Holds all shared components and state

use crate::actuator::{ActuatorController, ServoConfig};
use crate::stream_hub::StreamHub;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which sensor driver to acquire at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSource {
    /// rpicam-vid subprocess (real hardware)
    Rpicam,
    /// Synthetic moving gradient (development without a camera)
    TestPattern,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Sensor driver selection
    pub camera_source: CameraSource,
    /// Capture width in pixels
    pub camera_width: u32,
    /// Capture height in pixels
    pub camera_height: u32,
    /// Capture framerate
    pub camera_fps: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// pigpio daemon address
    pub pigpio_addr: String,
    /// pigpio daemon port
    pub pigpio_port: u16,
    /// Servo hardware constants
    pub servo: ServoConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            camera_source: match std::env::var("CAMERA_SOURCE").as_deref() {
                Ok("test") => CameraSource::TestPattern,
                _ => CameraSource::Rpicam,
            },
            camera_width: std::env::var("CAMERA_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(320),
            camera_height: std::env::var("CAMERA_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(240),
            camera_fps: std::env::var("CAMERA_FPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            jpeg_quality: std::env::var("JPEG_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(80),
            pigpio_addr: std::env::var("PIGPIO_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            pigpio_port: std::env::var("PIGPIO_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8888),
            servo: ServoConfig {
                azimuth_pin: std::env::var("AZIMUTH_PIN")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(18),
                elevation_pin: std::env::var("ELEVATION_PIN")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(19),
                neutral_us: std::env::var("SERVO_NEUTRAL_US")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1530),
                speed_us: std::env::var("SERVO_SPEED_US")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(18),
                min_pulse_us: std::env::var("SERVO_MIN_PULSE_US")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(500),
                max_pulse_us: std::env::var("SERVO_MAX_PULSE_US")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2500),
                move_duration: Duration::from_millis(
                    std::env::var("SERVO_MOVE_DURATION_MS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(500),
                ),
            },
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// StreamHub (capture/encode/broadcast)
    pub hub: Arc<StreamHub>,
    /// ActuatorController (servo motions)
    pub actuator: Arc<ActuatorController>,
    /// Process start time, for uptime reporting
    pub started_at: Instant,
}
