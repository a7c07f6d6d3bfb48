//! Camera Module
//!
//! ## Responsibilities
//!
//! - `SensorDriver` capability: raw frames on demand from the sensor
//! - rpicam-vid subprocess driver for real hardware
//! - Synthetic test-pattern driver for camera-less development

pub mod rpicam;
pub mod test_pattern;
pub mod types;

pub use rpicam::RpicamSensor;
pub use test_pattern::TestPatternSensor;
pub use types::{Frame, PixelFormat};

use crate::error::Result;

/// Camera sensor capability.
///
/// The frame sequence is infinite and non-restartable: once started it
/// cannot be rewound, and restart requires acquiring a fresh driver.
pub trait SensorDriver: Send {
    /// Block until the sensor delivers the next frame. Consumes one
    /// hardware exposure cycle per call; fails with `Error::Capture`
    /// on a sensor fault.
    fn capture_frame(&mut self) -> Result<Frame>;
}
