use crate::error::{OccupancyError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    Rgb24,
}

impl PixelFormat {
    /// Expected buffer length for a `width` x `height` frame.
    pub fn buffer_len(&self, width: u32, height: u32) -> Result<usize> {
        let plane = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| OccupancyError::Capture("frame dimensions overflow".to_string()))?;
        let len = match self {
            PixelFormat::Gray8 => Some(plane),
            PixelFormat::Rgb24 => plane.checked_mul(3),
        };
        len.ok_or_else(|| OccupancyError::Capture("frame dimensions overflow".to_string()))
    }
}

/// Convert a frame buffer to 8-bit luma.
///
/// RGB uses the BT.601 weights (0.299, 0.587, 0.114).
pub(crate) fn to_luma(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Vec<u8>> {
    let expected = format.buffer_len(width, height)?;
    if pixels.len() != expected {
        return Err(OccupancyError::Capture(format!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        )));
    }
    match format {
        PixelFormat::Gray8 => Ok(pixels.to_vec()),
        PixelFormat::Rgb24 => Ok(pixels
            .chunks_exact(3)
            .map(|px| {
                let y = 0.299_f32 * px[0] as f32 + 0.587_f32 * px[1] as f32 + 0.114_f32 * px[2] as f32;
                clamp_to_u8(y)
            })
            .collect()),
    }
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
