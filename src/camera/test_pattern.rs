//! Synthetic sensor for camera-less development
//!
//! Produces a moving RGB gradient at a fixed rate so the full
//! capture-encode-stream path can run on a machine without the camera
//! stack installed (`CAMERA_SOURCE=test`).

use super::types::{Frame, PixelFormat};
use super::SensorDriver;
use crate::error::Result;
use bytes::Bytes;
use std::time::Duration;

pub struct TestPatternSensor {
    width: u32,
    height: u32,
    /// Simulated exposure time per frame
    interval: Duration,
    tick: u64,
}

impl TestPatternSensor {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        let interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / fps
        };
        tracing::info!(width = width, height = height, fps = fps, "Test pattern sensor ready");
        Self {
            width,
            height,
            interval,
            tick: 0,
        }
    }

    fn render(&self) -> Bytes {
        let w = self.width as usize;
        let h = self.height as usize;
        let shift = (self.tick % 256) as usize;
        let mut data = vec![0u8; w * h * 3];

        for row in 0..h {
            for col in 0..w {
                let i = (row * w + col) * 3;
                data[i] = ((col + shift) % 256) as u8;
                data[i + 1] = ((row + shift) % 256) as u8;
                data[i + 2] = (255 - shift % 256) as u8;
            }
        }

        data.into()
    }
}

impl SensorDriver for TestPatternSensor {
    fn capture_frame(&mut self) -> Result<Frame> {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        let data = self.render();
        self.tick = self.tick.wrapping_add(1);

        Ok(Frame {
            data,
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgb888,
        })
    }
}
