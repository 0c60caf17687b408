//! Pixel-format conversion from raw capture buffers to core frames.

use facedetect_core::{ChannelOrder, Frame};

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid {format} length: expected {expected}, got {actual}")]
    InvalidLength {
        format: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Capture pixel formats the camera accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed, 2 bytes/pixel.
    Yuyv,
    /// Packed 24-bit RGB.
    Rgb3,
    /// Packed 24-bit BGR.
    Bgr3,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Yuyv => 2,
            PixelFormat::Rgb3 | PixelFormat::Bgr3 => 3,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PixelFormat::Yuyv => "YUYV",
            PixelFormat::Rgb3 => "RGB3",
            PixelFormat::Bgr3 => "BGR3",
        }
    }
}

/// Build a core frame from a raw buffer. Trailing padding is ignored.
pub fn to_frame(format: PixelFormat, buf: &[u8], width: u32, height: u32) -> Result<Frame, FrameError> {
    let pixels = width as usize * height as usize;
    let expected = pixels * format.bytes_per_pixel();
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            format: format.name(),
            expected,
            actual: buf.len(),
        });
    }

    let (data, order) = match format {
        PixelFormat::Yuyv => (yuyv_to_rgb(&buf[..expected]), ChannelOrder::Rgb),
        PixelFormat::Rgb3 => (buf[..expected].to_vec(), ChannelOrder::Rgb),
        PixelFormat::Bgr3 => (buf[..expected].to_vec(), ChannelOrder::Bgr),
    };

    Ok(Frame {
        data,
        width,
        height,
        order,
    })
}

/// Convert packed YUYV (4:2:2) to packed RGB with BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U and V.
pub fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);
    for chunk in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    rgb
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as f32 - 16.0;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [
        clamp(1.164 * c + 1.596 * e),
        clamp(1.164 * c - 0.392 * d - 0.813 * e),
        clamp(1.164 * c + 2.017 * d),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_grey_stays_grey() {
        // Neutral chroma: R == G == B.
        let rgb = yuyv_to_rgb(&[128, 128, 200, 128]);
        assert_eq!(rgb.len(), 6);
        assert_eq!(rgb[0], rgb[1]);
        assert_eq!(rgb[1], rgb[2]);
        assert!(rgb[3] > rgb[0]);
    }

    #[test]
    fn test_yuyv_black_and_white() {
        let rgb = yuyv_to_rgb(&[16, 128, 235, 128]);
        assert_eq!(&rgb[..3], &[0, 0, 0]);
        assert_eq!(&rgb[3..], &[255, 255, 255]);
    }

    #[test]
    fn test_yuyv_frame_4x2() {
        let yuyv = vec![128u8; 16];
        let frame = to_frame(PixelFormat::Yuyv, &yuyv, 4, 2).unwrap();
        assert_eq!(frame.data.len(), 24);
        assert_eq!(frame.order, ChannelOrder::Rgb);
    }

    #[test]
    fn test_bgr_frame_keeps_order_tag() {
        let frame = to_frame(PixelFormat::Bgr3, &[1, 2, 3, 4, 5, 6], 2, 1).unwrap();
        assert_eq!(frame.order, ChannelOrder::Bgr);
        let rgb = frame.into_rgb().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [3, 2, 1]);
    }

    #[test]
    fn test_padding_is_trimmed() {
        let frame = to_frame(PixelFormat::Rgb3, &[9; 10], 1, 2).unwrap();
        assert_eq!(frame.data.len(), 6);
    }

    #[test]
    fn test_short_buffer() {
        let err = to_frame(PixelFormat::Yuyv, &[100, 128], 2, 1).unwrap_err();
        assert!(err.to_string().contains("YUYV"));
    }
}
