//! Actuator Module
//!
//! ## Responsibilities
//!
//! - Timed pulse-then-neutral motions on the two gimbal axes
//! - Safe envelope validation before any hardware write
//! - Exclusive ownership of the PWM backend handle
//! - Idempotent shutdown leaving both outputs de-energized

pub mod controller;
pub mod pigpio;
pub mod types;

pub use controller::ActuatorController;
pub use pigpio::{PigpioClient, PwmBackend};
pub use types::{Axis, Direction, PulseCommand, ServoConfig};
