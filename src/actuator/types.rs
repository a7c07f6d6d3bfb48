//! Actuator type definitions

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Independently actuated gimbal axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Azimuth,
    Elevation,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Azimuth => "azimuth",
            Self::Elevation => "elevation",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewer-facing move direction, validated at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Axis this direction actuates
    pub fn axis(&self) -> Axis {
        match self {
            Self::Up | Self::Down => Axis::Elevation,
            Self::Left | Self::Right => Axis::Azimuth,
        }
    }

    /// Sign applied to the configured speed offset.
    /// Matches the gimbal orientation: positive elevation tilts down,
    /// positive azimuth pans left.
    pub fn polarity(&self) -> i32 {
        match self {
            Self::Up => -1,
            Self::Down => 1,
            Self::Left => 1,
            Self::Right => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            "LEFT" => Ok(Self::Left),
            "RIGHT" => Ok(Self::Right),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bounded motion request: hold `neutral + offset_us` on `axis`
/// for `duration`, then cut drive
#[derive(Debug, Clone, Copy)]
pub struct PulseCommand {
    pub axis: Axis,
    pub offset_us: i32,
    pub duration: Duration,
}

impl PulseCommand {
    /// Pulse width this command asks the hardware to hold. Signed so an
    /// offset below neutral cannot wrap before validation.
    pub fn pulse_width(&self, neutral_us: u32) -> i64 {
        neutral_us as i64 + self.offset_us as i64
    }
}

/// Servo hardware constants, fixed for process lifetime
#[derive(Debug, Clone)]
pub struct ServoConfig {
    /// BCM pin driving the azimuth servo
    pub azimuth_pin: u8,
    /// BCM pin driving the elevation servo
    pub elevation_pin: u8,
    /// Pulse width of the centered, non-moving position (microseconds)
    pub neutral_us: u32,
    /// Offset magnitude applied per move command (microseconds)
    pub speed_us: u32,
    /// Lower bound of the mechanically safe pulse range (inclusive)
    pub min_pulse_us: u32,
    /// Upper bound of the mechanically safe pulse range (inclusive)
    pub max_pulse_us: u32,
    /// How long a single move command holds its pulse
    pub move_duration: Duration,
}

impl ServoConfig {
    /// Pin bound to an axis
    pub fn pin(&self, axis: Axis) -> u8 {
        match axis {
            Axis::Azimuth => self.azimuth_pin,
            Axis::Elevation => self.elevation_pin,
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            azimuth_pin: 18,
            elevation_pin: 19,
            neutral_us: 1530,
            speed_us: 18,
            min_pulse_us: 500,
            max_pulse_us: 2500,
            move_duration: Duration::from_millis(500),
        }
    }
}
