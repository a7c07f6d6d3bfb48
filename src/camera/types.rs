//! Frame type definitions

use bytes::Bytes;

/// Raw pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit RGB, 3 bytes per pixel
    Rgb888,
    /// Planar YUV 4:2:0, 1.5 bytes per pixel (rpicam-vid raw output)
    Yuv420,
}

/// One captured frame. Immutable; owned transiently by the stream hub
/// for a single encode-and-send cycle, never retained across iterations.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Frame {
    /// Byte length a well-formed frame of this geometry must have
    pub fn expected_len(width: u32, height: u32, format: PixelFormat) -> usize {
        let pixels = width as usize * height as usize;
        match format {
            PixelFormat::Rgb888 => pixels * 3,
            PixelFormat::Yuv420 => pixels * 3 / 2,
        }
    }
}
