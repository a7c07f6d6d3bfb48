//! Encoder Module
//!
//! Pure transform: raw frame -> compressed JPEG bytes. Carries no state
//! beyond the quality setting passed in by the caller.

use crate::camera::{Frame, PixelFormat};
use crate::error::{Error, Result};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

/// Compress one frame to JPEG
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Bytes> {
    let expected = Frame::expected_len(frame.width, frame.height, frame.format);
    if frame.data.len() != expected {
        return Err(Error::Encode(format!(
            "frame size mismatch: got {} bytes, expected {}",
            frame.data.len(),
            expected
        )));
    }

    let rgb;
    let pixels: &[u8] = match frame.format {
        PixelFormat::Rgb888 => &frame.data,
        PixelFormat::Yuv420 => {
            rgb = yuv420_to_rgb(&frame.data, frame.width, frame.height);
            &rgb
        }
    };

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(pixels, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| Error::Encode(e.to_string()))?;

    Ok(Bytes::from(out))
}

/// Planar YUV 4:2:0 to packed RGB888, BT.601 integer math
fn yuv420_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let y_plane = &data[..w * h];
    let u_plane = &data[w * h..w * h + (w / 2) * (h / 2)];
    let v_plane = &data[w * h + (w / 2) * (h / 2)..];

    let mut rgb = vec![0u8; w * h * 3];
    for row in 0..h {
        for col in 0..w {
            let y = y_plane[row * w + col] as i32;
            let u = u_plane[(row / 2) * (w / 2) + col / 2] as i32 - 128;
            let v = v_plane[(row / 2) * (w / 2) + col / 2] as i32 - 128;

            let c = 298 * (y - 16);
            let r = (c + 409 * v + 128) >> 8;
            let g = (c - 100 * u - 208 * v + 128) >> 8;
            let b = (c + 516 * u + 128) >> 8;

            let i = (row * w + col) * 3;
            rgb[i] = r.clamp(0, 255) as u8;
            rgb[i + 1] = g.clamp(0, 255) as u8;
            rgb[i + 2] = b.clamp(0, 255) as u8;
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(width: u32, height: u32) -> Frame {
        Frame {
            data: Bytes::from(vec![
                96u8;
                Frame::expected_len(width, height, PixelFormat::Rgb888)
            ]),
            width,
            height,
            format: PixelFormat::Rgb888,
        }
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let jpeg = encode_jpeg(&rgb_frame(32, 24), 80).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let frame = Frame {
            data: Bytes::from_static(&[0u8; 10]),
            width: 32,
            height: 24,
            format: PixelFormat::Rgb888,
        };
        assert!(matches!(
            encode_jpeg(&frame, 80),
            Err(Error::Encode(_))
        ));
    }

    #[test]
    fn test_yuv_gray_maps_to_gray() {
        // Y=128, U=V=128 is mid-gray; conversion should land near (130,130,130)
        let w = 8u32;
        let h = 8u32;
        let data = vec![128u8; Frame::expected_len(w, h, PixelFormat::Yuv420)];

        let rgb = yuv420_to_rgb(&data, w, h);
        for px in rgb.chunks(3) {
            assert!(px[0].abs_diff(130) <= 2);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
    }

    #[test]
    fn test_yuv_frame_encodes() {
        let w = 16u32;
        let h = 16u32;
        let frame = Frame {
            data: Bytes::from(vec![
                128u8;
                Frame::expected_len(w, h, PixelFormat::Yuv420)
            ]),
            width: w,
            height: h,
            format: PixelFormat::Yuv420,
        };
        let jpeg = encode_jpeg(&frame, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
