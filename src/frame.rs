//! Captured frames.
//!
//! - `Frame`: one captured image as handed over by a capture source.
//! - `GrayFrame`: 8-bit luma view used by the texture-variance fallback.
//!
//! Frames are consumed by a single scan and dropped; nothing here persists
//! pixels.

use crate::error::{OccupancyError, Result};
use crate::ingest::normalize::{to_luma, PixelFormat};
use crate::scale::Resolution;
use crate::status::TimestampMs;

pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Capture wall-clock time.
    pub captured_at_ms: TimestampMs,
}

impl Frame {
    /// Wrap captured pixels. The buffer length must match the format.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(OccupancyError::Capture(format!(
                "frame dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let expected = format.buffer_len(width, height)?;
        if data.len() != expected {
            return Err(OccupancyError::Capture(format!(
                "{:?} frame length mismatch: expected {}, got {}",
                format,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            captured_at_ms: crate::now_ms(),
        })
    }

    /// Uniform gray frame, handy for stub sources and tests.
    pub fn filled(width: u32, height: u32, value: u8) -> Result<Self> {
        let len = PixelFormat::Gray8.buffer_len(width, height)?;
        Self::new(vec![value; len], width, height, PixelFormat::Gray8)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn to_gray(&self) -> Result<GrayFrame> {
        let data = to_luma(&self.data, self.width, self.height, self.format)?;
        Ok(GrayFrame {
            data,
            width: self.width,
            height: self.height,
        })
    }
}

/// Single-channel 8-bit image, row-major.
#[derive(Clone, Debug)]
pub struct GrayFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl GrayFrame {
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = PixelFormat::Gray8.buffer_len(width, height)?;
        if data.len() != expected {
            return Err(OccupancyError::Capture(format!(
                "gray frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Frame::new(vec![0u8; 5], 2, 2, PixelFormat::Rgb24).err().unwrap();
        assert!(matches!(err, OccupancyError::Capture(_)));
        assert!(Frame::new(vec![], 0, 2, PixelFormat::Gray8).is_err());
    }

    #[test]
    fn gray_view_of_rgb_frame() {
        let frame = Frame::new(vec![255, 255, 255, 0, 0, 0], 2, 1, PixelFormat::Rgb24).unwrap();
        let gray = frame.to_gray().unwrap();
        assert_eq!(gray.get(0, 0), Some(255));
        assert_eq!(gray.get(1, 0), Some(0));
        assert_eq!(gray.get(2, 0), None);
    }

    #[test]
    fn filled_frame_has_requested_resolution() {
        let frame = Frame::filled(40, 10, 7).unwrap();
        assert_eq!(frame.resolution(), Resolution::new(40, 10));
        assert!(frame.pixels().iter().all(|&p| p == 7));
    }
}
