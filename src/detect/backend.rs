use crate::detect::result::RawDetection;
use crate::error::Result;
use crate::frame::Frame;

/// What a detector backend can produce.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    /// Axis-aligned object boxes in frame coordinates.
    ObjectBoxes,
    /// Class labels on those boxes, needed for allow-list filtering.
    ClassLabels,
}

/// Detector backend trait.
///
/// The detector is opaque to the occupancy core: it receives one frame and
/// returns boxes. Implementations must not keep the frame beyond the call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, called once at startup.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
