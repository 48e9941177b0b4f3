//! Frame types for capture and scoring.

use crate::error::{AxonwatchError, Result};

/// Bytes per RGBA pixel.
const BYTES_PER_PIXEL: usize = 4;

/// A captured video frame in RGBA8 layout.
///
/// Frames are ephemeral: captured, scored, encoded and discarded once per
/// cadence tick. They are never persisted.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Creates a frame from raw RGBA bytes.
    ///
    /// Fails if the buffer length does not match `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(AxonwatchError::FrameDimensions {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a frame filled with a single opaque color.
    pub fn uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
        for _ in 0..pixels {
            data.extend_from_slice(&[r, g, b, 255]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Single-channel luminance plane, one value per pixel.
    ///
    /// Luminance is the mean of the R, G and B channels; alpha is ignored.
    pub fn luminance(&self) -> Vec<f32> {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0)
            .collect()
    }
}

/// Result of scoring a single frame.
#[derive(Debug, Clone)]
pub struct AnomalyResult {
    /// Structural-anomaly score, 0 (clean) to 100 (saturated).
    pub score: u8,
    /// RGBA visualization mask with the same dimensions as the frame,
    /// present unless mask emission is disabled.
    pub mask: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new_validates_length() {
        let frame = Frame::new(2, 2, vec![0u8; 16]);
        assert!(frame.is_ok());

        let short = Frame::new(2, 2, vec![0u8; 15]);
        assert!(short.is_err());
    }

    #[test]
    fn test_uniform_frame_layout() {
        let frame = Frame::uniform(2, 1, 10, 20, 30);
        assert_eq!(frame.data(), &[10, 20, 30, 255, 10, 20, 30, 255]);
    }

    #[test]
    fn test_luminance_averages_rgb() {
        let frame = Frame::new(1, 1, vec![30, 60, 90, 0]).unwrap();
        let lum = frame.luminance();
        assert_eq!(lum.len(), 1);
        assert!((lum[0] - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_luminance_ignores_alpha() {
        let opaque = Frame::new(1, 1, vec![50, 50, 50, 255]).unwrap();
        let transparent = Frame::new(1, 1, vec![50, 50, 50, 0]).unwrap();
        assert_eq!(opaque.luminance(), transparent.luminance());
    }
}
