//! Timed servo motion control
//!
//! Each axis runs the state machine `Idle -> Moving -> Idle`: hold the
//! commanded pulse for the configured duration, then cut drive entirely
//! (pulse width 0, not neutral). Motions on the same axis serialize; the
//! two axes are independent and may move simultaneously.

use super::pigpio::PwmBackend;
use super::types::{Axis, Direction, PulseCommand, ServoConfig};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Per-axis runtime slot
struct AxisSlot {
    /// Serializes motions: a request for a busy axis waits here until the
    /// in-flight motion completes
    lock: tokio::sync::Mutex<()>,
    moving: AtomicBool,
}

impl AxisSlot {
    fn new() -> Self {
        Self {
            lock: tokio::sync::Mutex::new(()),
            moving: AtomicBool::new(false),
        }
    }
}

/// Owns the two servo channels and the PWM backend handle.
///
/// No other component writes pulse widths; everything goes through
/// `request` and `shutdown`.
pub struct ActuatorController {
    backend: Box<dyn PwmBackend>,
    config: ServoConfig,
    azimuth: AxisSlot,
    elevation: AxisSlot,
    /// Cancelled on shutdown; interrupts in-flight duration waits
    stop: CancellationToken,
    shut_down: AtomicBool,
}

impl ActuatorController {
    pub fn new(backend: Box<dyn PwmBackend>, config: ServoConfig) -> Self {
        Self {
            backend,
            config,
            azimuth: AxisSlot::new(),
            elevation: AxisSlot::new(),
            stop: CancellationToken::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    fn slot(&self, axis: Axis) -> &AxisSlot {
        match axis {
            Axis::Azimuth => &self.azimuth,
            Axis::Elevation => &self.elevation,
        }
    }

    /// Map a direction onto a pulse command, validating the resulting
    /// pulse width against the safe envelope. No hardware write happens
    /// for a rejected request.
    fn plan(&self, direction: Direction) -> Result<(PulseCommand, u32)> {
        let command = PulseCommand {
            axis: direction.axis(),
            offset_us: direction.polarity() * self.config.speed_us as i32,
            duration: self.config.move_duration,
        };

        let pulse = command.pulse_width(self.config.neutral_us);
        if pulse < self.config.min_pulse_us as i64 || pulse > self.config.max_pulse_us as i64 {
            return Err(Error::OutOfRange {
                pulse_us: pulse,
                min_us: self.config.min_pulse_us,
                max_us: self.config.max_pulse_us,
            });
        }

        Ok((command, pulse as u32))
    }

    /// Execute one bounded motion for `direction`, blocking for the full
    /// pulse duration (or until shutdown interrupts it). Returns the axis
    /// that moved.
    pub async fn request(&self, direction: Direction) -> Result<Axis> {
        let (command, pulse_us) = self.plan(direction)?;
        let slot = self.slot(command.axis);

        let _guard = slot.lock.lock().await;

        // Re-checked after possibly waiting out a previous motion
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(Error::BackendUnavailable(
                "actuator is shut down".to_string(),
            ));
        }

        slot.moving.store(true, Ordering::SeqCst);
        let result = self.pulse(command.axis, pulse_us, command.duration).await;
        slot.moving.store(false, Ordering::SeqCst);

        result?;
        Ok(command.axis)
    }

    async fn pulse(
        &self,
        axis: Axis,
        pulse_us: u32,
        duration: std::time::Duration,
    ) -> Result<()> {
        let pin = self.config.pin(axis);

        self.backend.set_pulse_width(pin, pulse_us).await?;
        tracing::info!(axis = %axis, pin = pin, pulse_us = pulse_us, "Rotating");

        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                self.backend.set_pulse_width(pin, 0).await?;
                tracing::debug!(axis = %axis, pin = pin, "Motion complete, drive disabled");
                Ok(())
            }
            _ = self.stop.cancelled() => {
                // shutdown() zeroes both pins itself once in-flight motions
                // have drained; skip the trailing write here
                tracing::warn!(axis = %axis, "Motion interrupted by shutdown");
                Err(Error::BackendUnavailable(
                    "motion interrupted by shutdown".to_string(),
                ))
            }
        }
    }

    /// Whether an axis currently holds an active pulse
    pub fn is_moving(&self, axis: Axis) -> bool {
        self.slot(axis).moving.load(Ordering::SeqCst)
    }

    /// Disable PWM on both axes and release the backend handle.
    ///
    /// Idempotent: safe to call from both the normal exit path and a
    /// signal handler; only the first call touches hardware. In-flight
    /// motions are interrupted rather than waited out.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        // Wake any motion sleeping out its duration, then take both axis
        // locks so the zero-writes cannot interleave with a pulse write
        self.stop.cancel();
        let _az = self.azimuth.lock.lock().await;
        let _el = self.elevation.lock.lock().await;

        for axis in [Axis::Azimuth, Axis::Elevation] {
            let pin = self.config.pin(axis);
            if let Err(e) = self.backend.set_pulse_width(pin, 0).await {
                tracing::warn!(axis = %axis, pin = pin, error = %e, "Failed to disable servo output");
            }
        }

        if let Err(e) = self.backend.stop().await {
            tracing::warn!(error = %e, "Failed to release PWM backend");
        }

        tracing::info!("Actuator shut down, PWM outputs disabled");
    }
}

impl Drop for ActuatorController {
    fn drop(&mut self) {
        // Backstop only: every real exit path calls shutdown() explicitly
        if !self.shut_down.load(Ordering::SeqCst) {
            tracing::warn!("ActuatorController dropped without shutdown()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, Copy)]
    struct PulseWrite {
        pin: u8,
        width_us: u32,
        at: Instant,
    }

    /// Backend that records every write with a timestamp
    #[derive(Clone)]
    struct MockPwm {
        log: Arc<Mutex<Vec<PulseWrite>>>,
        stopped: Arc<AtomicBool>,
    }

    impl MockPwm {
        fn new() -> Self {
            Self {
                log: Arc::new(Mutex::new(Vec::new())),
                stopped: Arc::new(AtomicBool::new(false)),
            }
        }

        fn writes(&self) -> Vec<PulseWrite> {
            self.log.lock().unwrap().clone()
        }

        fn writes_for(&self, pin: u8) -> Vec<PulseWrite> {
            self.writes().into_iter().filter(|w| w.pin == pin).collect()
        }
    }

    #[async_trait]
    impl PwmBackend for MockPwm {
        async fn set_pulse_width(&self, pin: u8, width_us: u32) -> crate::error::Result<()> {
            self.log.lock().unwrap().push(PulseWrite {
                pin,
                width_us,
                at: Instant::now(),
            });
            Ok(())
        }

        async fn stop(&self) -> crate::error::Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config(duration_ms: u64) -> ServoConfig {
        ServoConfig {
            move_duration: Duration::from_millis(duration_ms),
            ..ServoConfig::default()
        }
    }

    fn controller(mock: &MockPwm, config: ServoConfig) -> ActuatorController {
        ActuatorController::new(Box::new(mock.clone()), config)
    }

    #[tokio::test]
    async fn test_left_pulse_sequence() {
        let mock = MockPwm::new();
        let ctrl = controller(&mock, test_config(20));

        let axis = ctrl.request(Direction::Left).await.unwrap();
        assert_eq!(axis, Axis::Azimuth);

        // LEFT: neutral 1530 + 18 on the azimuth pin, then drive cut
        let writes = mock.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!((writes[0].pin, writes[0].width_us), (18, 1548));
        assert_eq!((writes[1].pin, writes[1].width_us), (18, 0));
        assert!(writes[1].at.duration_since(writes[0].at) >= Duration::from_millis(20));

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_up_pulse_sequence() {
        let mock = MockPwm::new();
        let ctrl = controller(&mock, test_config(20));

        let axis = ctrl.request(Direction::Up).await.unwrap();
        assert_eq!(axis, Axis::Elevation);

        // UP: neutral 1530 - 18 on the elevation pin
        let writes = mock.writes();
        assert_eq!((writes[0].pin, writes[0].width_us), (19, 1512));
        assert_eq!((writes[1].pin, writes[1].width_us), (19, 0));

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_out_of_range_rejected_without_writes() {
        let mock = MockPwm::new();
        let config = ServoConfig {
            neutral_us: 2495,
            speed_us: 18,
            ..test_config(20)
        };
        let ctrl = controller(&mock, config);

        // 2495 + 18 = 2513 > 2500
        let err = ctrl.request(Direction::Left).await.unwrap_err();
        assert!(matches!(err, Error::OutOfRange { pulse_us: 2513, .. }));
        assert!(mock.writes().is_empty());

        // The opposite polarity stays inside the envelope
        ctrl.request(Direction::Right).await.unwrap();
        assert_eq!(mock.writes().len(), 2);

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_same_axis_requests_serialize() {
        let mock = MockPwm::new();
        let ctrl = Arc::new(controller(&mock, test_config(30)));

        let a = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.request(Direction::Left).await }
        });
        let b = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.request(Direction::Right).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Four writes on the azimuth pin, and never two overlapping pulses:
        // each motion's zero-write precedes the next motion's pulse-write
        let writes = mock.writes_for(18);
        assert_eq!(writes.len(), 4);
        assert_ne!(writes[0].width_us, 0);
        assert_eq!(writes[1].width_us, 0);
        assert_ne!(writes[2].width_us, 0);
        assert_eq!(writes[3].width_us, 0);
        assert!(writes[2].at >= writes[1].at);

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_axes_move_independently() {
        let mock = MockPwm::new();
        let ctrl = Arc::new(controller(&mock, test_config(50)));

        let started = Instant::now();
        let a = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.request(Direction::Left).await }
        });
        let b = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.request(Direction::Up).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Concurrent, not serialized: both finish well under 2x duration
        assert!(started.elapsed() < Duration::from_millis(90));
        assert_eq!(mock.writes_for(18).len(), 2);
        assert_eq!(mock.writes_for(19).len(), 2);

        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_idempotent() {
        let mock = MockPwm::new();
        let ctrl = controller(&mock, test_config(20));

        ctrl.shutdown().await;
        let after_first = mock.writes().len();
        assert_eq!(after_first, 2); // one zero-write per axis
        assert!(mock.stopped.load(Ordering::SeqCst));

        // Second call performs no additional hardware writes
        ctrl.shutdown().await;
        assert_eq!(mock.writes().len(), after_first);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_inflight_motion() {
        let mock = MockPwm::new();
        let ctrl = Arc::new(controller(&mock, test_config(5_000)));

        let motion = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.request(Direction::Down).await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(ctrl.is_moving(Axis::Elevation));

        let started = Instant::now();
        ctrl.shutdown().await;
        // PWM disabled immediately, not after the 5s duration
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(motion.await.unwrap().is_err());

        let last = mock.writes_for(19).last().copied().unwrap();
        assert_eq!(last.width_us, 0);
        assert!(mock.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_request_after_shutdown_rejected() {
        let mock = MockPwm::new();
        let ctrl = controller(&mock, test_config(20));

        ctrl.shutdown().await;
        let writes_before = mock.writes().len();

        let err = ctrl.request(Direction::Left).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert_eq!(mock.writes().len(), writes_before);
    }
}
