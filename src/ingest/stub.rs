use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::FrameSource;
use crate::error::{OccupancyError, Result};
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const EMPTY_LOT_GRAY: u8 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubPattern {
    /// Flat gray: zero texture everywhere.
    Uniform,
    /// Seeded noise: high texture everywhere.
    Noise,
}

/// Synthetic capture source for tests and camera-less deployments.
pub struct StubSource {
    width: u32,
    height: u32,
    pattern: StubPattern,
    frame_count: u64,
}

impl StubSource {
    pub fn new(width: u32, height: u32, pattern: StubPattern) -> Self {
        Self {
            width,
            height,
            pattern,
            frame_count: 0,
        }
    }

    /// Parse the part of a `stub://` URI after the scheme: `""`, `"WxH"` or `"WxH/noise"`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (dims, pattern) = match spec.split_once('/') {
            Some((dims, "noise")) => (dims, StubPattern::Noise),
            Some((dims, "")) | Some((dims, "uniform")) => (dims, StubPattern::Uniform),
            Some((_, other)) => {
                return Err(OccupancyError::Capture(format!(
                    "unknown stub pattern '{}'",
                    other
                )))
            }
            None => (spec, StubPattern::Uniform),
        };
        if dims.is_empty() {
            return Ok(Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, pattern));
        }
        let parsed = dims
            .split_once('x')
            .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));
        match parsed {
            Some((w, h)) if w > 0 && h > 0 => Ok(Self::new(w, h, pattern)),
            _ => Err(OccupancyError::Capture(format!(
                "invalid stub dimensions '{}', expected WIDTHxHEIGHT",
                dims
            ))),
        }
    }
}

impl FrameSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        match self.pattern {
            StubPattern::Uniform => Frame::filled(self.width, self.height, EMPTY_LOT_GRAY),
            StubPattern::Noise => {
                let mut rng = StdRng::seed_from_u64(self.frame_count);
                let mut pixels = vec![0u8; self.width as usize * self.height as usize];
                rng.fill_bytes(&mut pixels);
                Frame::new(
                    pixels,
                    self.width,
                    self.height,
                    super::PixelFormat::Gray8,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dimensions_and_pattern() {
        let source = StubSource::parse("320x200/noise").unwrap();
        assert_eq!((source.width, source.height), (320, 200));
        assert_eq!(source.pattern, StubPattern::Noise);

        let source = StubSource::parse("").unwrap();
        assert_eq!((source.width, source.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));

        assert!(StubSource::parse("0x10").is_err());
        assert!(StubSource::parse("wide").is_err());
        assert!(StubSource::parse("10x10/plaid").is_err());
    }

    #[test]
    fn uniform_frames_are_flat() {
        let mut source = StubSource::new(8, 4, StubPattern::Uniform);
        let frame = source.next_frame().unwrap();
        assert!(frame.pixels().iter().all(|&p| p == EMPTY_LOT_GRAY));
    }
}
