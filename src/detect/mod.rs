mod adapter;
mod backend;
mod backends;
mod evidence;
mod registry;
mod result;

pub use adapter::{variance_evidence, ClassAllowList, DetectionAdapter, DEFAULT_ALLOWED_CLASSES};
pub use backend::{DetectionCapability, DetectorBackend};
pub use backends::{ScriptHandle, ScriptedBackend};
pub use evidence::{BoxEvidence, Evidence, VarianceEvidence};
pub use registry::BackendRegistry;
pub use result::RawDetection;

#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
