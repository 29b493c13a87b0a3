//! Frame capture sources.
//!
//! Sources are addressed by URI:
//! - `stub://WxH` produces uniform frames (every slot reads as empty),
//! - `stub://WxH/noise` produces high-texture noise frames,
//! - a plain filesystem path decodes a still image (feature: ingest-image).
//!
//! Capture is owned by the caller of a scan; the occupancy core only ever
//! sees the resulting `Frame`. Camera lifecycle and drivers are out of scope.

pub mod file;
pub mod normalize;
pub mod stub;

pub use file::ImageFileSource;
pub use normalize::PixelFormat;
pub use stub::StubSource;

use crate::error::{OccupancyError, Result};
use crate::frame::Frame;

/// Anything that can hand over one frame on demand.
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    fn next_frame(&mut self) -> Result<Frame>;
}

/// Open the capture source described by `uri`.
pub fn open_source(uri: &str) -> Result<Box<dyn FrameSource>> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(OccupancyError::Capture("empty capture source".to_string()));
    }
    if let Some(spec) = uri.strip_prefix("stub://") {
        return Ok(Box::new(StubSource::parse(spec)?));
    }
    if uri.contains("://") {
        return Err(OccupancyError::Capture(format!(
            "unsupported capture source '{}': only stub:// and local image paths are supported",
            uri
        )));
    }
    Ok(Box::new(ImageFileSource::new(uri)?))
}
