//! rpicam-vid sensor driver
//!
//! Runs `rpicam-vid` emitting raw YUV420 frames on stdout and slices the
//! byte stream into fixed-size frames. Width and height must be even for
//! the 4:2:0 plane math to hold.

use super::types::{Frame, PixelFormat};
use super::SensorDriver;
use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};

pub struct RpicamSensor {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_len: usize,
}

impl RpicamSensor {
    /// Spawn the capture subprocess. Fails with `Error::Capture` when the
    /// binary is missing or the camera cannot be claimed.
    pub fn spawn(width: u32, height: u32, fps: u32) -> Result<Self> {
        let mut child = Command::new("rpicam-vid")
            .args([
                "-t",
                "0",
                "--nopreview",
                "--codec",
                "yuv420",
                "--width",
                &width.to_string(),
                "--height",
                &height.to_string(),
                "--framerate",
                &fps.to_string(),
                "-o",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Capture(format!("failed to start rpicam-vid: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("rpicam-vid stdout not captured".to_string()))?;

        tracing::info!(
            width = width,
            height = height,
            fps = fps,
            pid = child.id(),
            "Camera acquired (rpicam-vid)"
        );

        Ok(Self {
            child,
            stdout,
            width,
            height,
            frame_len: Frame::expected_len(width, height, PixelFormat::Yuv420),
        })
    }
}

impl SensorDriver for RpicamSensor {
    fn capture_frame(&mut self) -> Result<Frame> {
        let mut buf = vec![0u8; self.frame_len];
        self.stdout
            .read_exact(&mut buf)
            .map_err(|e| Error::Capture(format!("sensor stream ended: {}", e)))?;

        Ok(Frame {
            data: buf.into(),
            width: self.width,
            height: self.height,
            format: PixelFormat::Yuv420,
        })
    }
}

impl Drop for RpicamSensor {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            tracing::warn!(error = %e, "Failed to kill rpicam-vid");
        }
        let _ = self.child.wait();
        tracing::info!("Camera released");
    }
}
