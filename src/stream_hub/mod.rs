//! StreamHub - Capture / Encode / Broadcast
//!
//! ## Responsibilities
//!
//! - Viewer session registry (register / unregister / fan-out)
//! - The capture-encode-broadcast loop; owns the sensor lifecycle
//! - Multipart frame envelope construction
//!
//! Note: a late-joining viewer starts from the next frame after it joins.
//! Slow viewers skip frames when their channel fills; they never stall the
//! capture loop or other viewers.

use crate::camera::SensorDriver;
use crate::encoder::encode_jpeg;
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Content type of the `/video_feed` response
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Frames a session may queue before it starts skipping
const SESSION_BUFFER_FRAMES: usize = 4;

/// Consecutive capture/encode failures tolerated before the loop gives up
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// One connected viewer
struct Session {
    id: Uuid,
    tx: mpsc::Sender<Bytes>,
}

/// StreamHub instance
pub struct StreamHub {
    sessions: RwLock<HashMap<Uuid, Session>>,
    viewer_count: AtomicU64,
    frames_streamed: AtomicU64,
    jpeg_quality: u8,
}

impl StreamHub {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            viewer_count: AtomicU64::new(0),
            frames_streamed: AtomicU64::new(0),
            jpeg_quality,
        }
    }

    /// Register a new viewer. The receiver yields already-enveloped
    /// multipart parts, in capture order, starting with the next frame
    /// produced after this call.
    pub fn register(&self) -> (Uuid, mpsc::Receiver<Bytes>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER_FRAMES);

        self.sessions
            .write()
            .expect("sessions lock poisoned")
            .insert(id, Session { id, tx });
        self.viewer_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(session_id = %id, "Viewer connected");

        (id, rx)
    }

    /// Drop a viewer session
    pub fn unregister(&self, id: &Uuid) {
        let removed = self
            .sessions
            .write()
            .expect("sessions lock poisoned")
            .remove(id)
            .is_some();
        if removed {
            self.viewer_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(session_id = %id, "Viewer disconnected");
        }
    }

    pub fn viewer_count(&self) -> u64 {
        self.viewer_count.load(Ordering::Relaxed)
    }

    pub fn frames_streamed(&self) -> u64 {
        self.frames_streamed.load(Ordering::Relaxed)
    }

    /// Wrap one encoded image in the multipart envelope
    fn envelope(jpeg: &[u8]) -> Bytes {
        let mut part = BytesMut::with_capacity(jpeg.len() + 48);
        part.put_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
        part.put_slice(jpeg);
        part.put_slice(b"\r\n");
        part.freeze()
    }

    /// Fan one part out to every session. A full channel skips that
    /// session's frame; a closed channel removes the session.
    fn broadcast(&self, part: Bytes) {
        let mut dead = Vec::new();
        {
            let sessions = self.sessions.read().expect("sessions lock poisoned");
            for session in sessions.values() {
                match session.tx.try_send(part.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!(session_id = %session.id, "Viewer lagging, frame skipped");
                    }
                    Err(TrySendError::Closed(_)) => dead.push(session.id),
                }
            }
        }

        for id in dead {
            self.unregister(&id);
        }
    }

    /// Run the capture loop on a blocking worker until `cancel` fires.
    ///
    /// Takes ownership of the sensor; it is released when the loop exits.
    /// Capture and encode failures retry with the next frame; a run of
    /// consecutive failures terminates the loop (and with it every open
    /// session) without touching the rest of the process.
    pub fn run(
        self: std::sync::Arc<Self>,
        mut sensor: Box<dyn SensorDriver>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            let mut failures = 0u32;

            while !cancel.is_cancelled() {
                let frame = match sensor.capture_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        failures += 1;
                        tracing::warn!(error = %e, consecutive = failures, "Frame capture failed");
                        if failures >= MAX_CONSECUTIVE_FAILURES {
                            tracing::error!("Sensor not recovering, stopping stream");
                            break;
                        }
                        continue;
                    }
                };

                let jpeg = match encode_jpeg(&frame, self.jpeg_quality) {
                    Ok(jpeg) => jpeg,
                    Err(e) => {
                        failures += 1;
                        tracing::warn!(error = %e, consecutive = failures, "Frame encode failed");
                        if failures >= MAX_CONSECUTIVE_FAILURES {
                            tracing::error!("Encoder not recovering, stopping stream");
                            break;
                        }
                        continue;
                    }
                };
                failures = 0;

                self.frames_streamed.fetch_add(1, Ordering::Relaxed);
                self.broadcast(Self::envelope(&jpeg));
            }

            // Terminate every open viewer response
            let drained = {
                let mut sessions = self.sessions.write().expect("sessions lock poisoned");
                let n = sessions.len();
                sessions.clear();
                n
            };
            self.viewer_count.store(0, Ordering::Relaxed);

            tracing::info!(closed_sessions = drained, "Stream hub stopped, sensor released");
            // sensor dropped here
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Frame, TestPatternSensor};
    use crate::error::{Error, Result};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_envelope_format() {
        let part = StreamHub::envelope(b"abc");
        assert_eq!(
            part.as_ref(),
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\nabc\r\n"
        );
    }

    #[tokio::test]
    async fn test_late_joiner_sees_only_new_frames() {
        let hub = StreamHub::new(80);

        let (_a, mut rx_a) = hub.register();
        hub.broadcast(Bytes::from_static(b"frame-1"));

        let (_b, mut rx_b) = hub.register();
        hub.broadcast(Bytes::from_static(b"frame-2"));

        // First viewer sees both, in capture order
        assert_eq!(rx_a.recv().await.unwrap(), "frame-1");
        assert_eq!(rx_a.recv().await.unwrap(), "frame-2");

        // Late joiner starts from the frame after it joined
        assert_eq!(rx_b.recv().await.unwrap(), "frame-2");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_viewer_skips_frames_without_stalling_others() {
        let hub = StreamHub::new(80);

        let (_slow, mut rx_slow) = hub.register();
        let (_fast, mut rx_fast) = hub.register();

        let total = SESSION_BUFFER_FRAMES + 3;
        for i in 0..total {
            let part = Bytes::from(format!("frame-{i}"));
            hub.broadcast(part);
            // The fast viewer drains every frame; the slow one never reads
            assert_eq!(rx_fast.recv().await.unwrap(), format!("frame-{i}"));
        }

        // The stalled viewer kept only its buffer's worth, oldest first,
        // order preserved, nothing duplicated
        for i in 0..SESSION_BUFFER_FRAMES {
            assert_eq!(rx_slow.recv().await.unwrap(), format!("frame-{i}"));
        }
        assert!(rx_slow.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnected_viewer_removed() {
        let hub = StreamHub::new(80);

        let (_id, rx) = hub.register();
        assert_eq!(hub.viewer_count(), 1);

        drop(rx);
        hub.broadcast(Bytes::from_static(b"frame"));
        assert_eq!(hub.viewer_count(), 0);
    }

    #[tokio::test]
    async fn test_run_streams_and_stops_on_cancel() {
        let hub = Arc::new(StreamHub::new(80));
        let (_id, mut rx) = hub.register();

        let cancel = CancellationToken::new();
        let sensor = Box::new(TestPatternSensor::new(16, 16, 0));
        let task = hub.clone().run(sensor, cancel.clone());

        // Parts arrive fully enveloped
        let part = rx.recv().await.unwrap();
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(b"\r\n"));

        cancel.cancel();
        task.await.unwrap();
        assert!(hub.frames_streamed() > 0);
        assert_eq!(hub.viewer_count(), 0);
    }

    /// Sensor that fails a fixed number of times before producing frames
    struct FlakySensor {
        failures_left: u32,
        inner: TestPatternSensor,
    }

    impl SensorDriver for FlakySensor {
        fn capture_frame(&mut self) -> Result<Frame> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(Error::Capture("transient sensor fault".to_string()));
            }
            self.inner.capture_frame()
        }
    }

    #[tokio::test]
    async fn test_capture_failure_retries_with_next_frame() {
        let hub = Arc::new(StreamHub::new(80));
        let (_id, mut rx) = hub.register();

        let cancel = CancellationToken::new();
        let sensor = Box::new(FlakySensor {
            failures_left: 2,
            inner: TestPatternSensor::new(16, 16, 0),
        });
        let task = hub.clone().run(sensor, cancel.clone());

        // Frames flow despite the leading failures
        assert!(rx.recv().await.is_some());

        cancel.cancel();
        task.await.unwrap();
    }

    /// Sensor that never recovers
    struct DeadSensor;

    impl SensorDriver for DeadSensor {
        fn capture_frame(&mut self) -> Result<Frame> {
            Err(Error::Capture("hardware fault".to_string()))
        }
    }

    #[tokio::test]
    async fn test_persistent_capture_failure_terminates_sessions_only() {
        let hub = Arc::new(StreamHub::new(80));
        let (_id, mut rx) = hub.register();

        let cancel = CancellationToken::new();
        let task = hub.clone().run(Box::new(DeadSensor), cancel.clone());

        // The loop gives up on its own and closes the session; the hub
        // itself (and the process) stays alive
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(rx.recv().await.is_none());
        assert_eq!(hub.frames_streamed(), 0);
        assert_eq!(hub.viewer_count(), 0);
    }
}
