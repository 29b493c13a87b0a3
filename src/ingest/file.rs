//! Still-image file source.
//!
//! Decodes one image from local disk per capture. Useful for replaying a
//! saved snapshot of a lot through the engine. Requires the `ingest-image`
//! feature; without it, opening a file source is a capture error.

use std::path::PathBuf;

use super::FrameSource;
use crate::error::{OccupancyError, Result};
use crate::frame::Frame;

pub struct ImageFileSource {
    path: PathBuf,
    name: String,
}

impl ImageFileSource {
    pub fn new(path: &str) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(OccupancyError::Capture("empty image path".to_string()));
        }
        #[cfg(not(feature = "ingest-image"))]
        {
            Err(OccupancyError::Capture(format!(
                "image capture of '{}' requires the ingest-image feature",
                path
            )))
        }
        #[cfg(feature = "ingest-image")]
        {
            Ok(Self {
                path: PathBuf::from(path),
                name: format!("file:{}", path),
            })
        }
    }
}

impl FrameSource for ImageFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[cfg(feature = "ingest-image")]
    fn next_frame(&mut self) -> Result<Frame> {
        let decoded = image::open(&self.path).map_err(|e| {
            OccupancyError::Capture(format!("failed to decode {}: {}", self.path.display(), e))
        })?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        Frame::new(rgb.into_raw(), width, height, super::PixelFormat::Rgb24)
    }

    #[cfg(not(feature = "ingest-image"))]
    fn next_frame(&mut self) -> Result<Frame> {
        Err(OccupancyError::Capture(format!(
            "cannot decode {} without the ingest-image feature",
            self.path.display()
        )))
    }
}
