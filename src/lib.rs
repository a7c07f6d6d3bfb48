//! Pan-Tilt Camserver Library
//!
//! ## Architecture (6 Components)
//!
//! 1. Camera - sensor capability, raw frames on demand
//! 2. Encoder - pure frame -> JPEG transform
//! 3. StreamHub - capture/encode/broadcast loop + viewer sessions
//! 4. Actuator - timed servo motions over the pigpio daemon
//! 5. WebAPI - HTTP endpoints (viewer page, video feed, move commands)
//! 6. Lifecycle (main.rs) - acquire/release sequencing on every exit path
//!
//! ## Design Principles
//!
//! - Hardware handles are owned, never ambient: the actuator owns the
//!   PWM socket, the stream hub owns the sensor
//! - Frames and commands are independent timelines
//! - Every termination path de-energizes both servo outputs

pub mod actuator;
pub mod camera;
pub mod encoder;
pub mod error;
pub mod models;
pub mod state;
pub mod stream_hub;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
