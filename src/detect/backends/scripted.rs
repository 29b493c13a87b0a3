use std::sync::{Arc, Mutex};

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::RawDetection;
use crate::error::{OccupancyError, Result};
use crate::frame::Frame;

/// Handle for changing what a `ScriptedBackend` reports next.
#[derive(Clone, Default)]
pub struct ScriptHandle {
    detections: Arc<Mutex<Vec<RawDetection>>>,
}

impl ScriptHandle {
    pub fn set(&self, detections: Vec<RawDetection>) {
        if let Ok(mut guard) = self.detections.lock() {
            *guard = detections;
        }
    }

    pub fn clear(&self) {
        self.set(Vec::new());
    }
}

/// Backend that ignores pixels and replays preset detections.
///
/// Used by tests, the demo lot, and the CLI's `--detections` replay.
pub struct ScriptedBackend {
    script: ScriptHandle,
    calls: u64,
}

impl ScriptedBackend {
    pub fn fixed(detections: Vec<RawDetection>) -> Self {
        let script = ScriptHandle::default();
        script.set(detections);
        Self { script, calls: 0 }
    }

    /// Backend plus a handle to re-script it after registration.
    pub fn shared() -> (Self, ScriptHandle) {
        let script = ScriptHandle::default();
        (
            Self {
                script: script.clone(),
                calls: 0,
            },
            script,
        )
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(
            capability,
            DetectionCapability::ObjectBoxes | DetectionCapability::ClassLabels
        )
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
        self.calls += 1;
        let guard = self
            .script
            .detections
            .lock()
            .map_err(|_| OccupancyError::Detector("script lock poisoned".into()))?;
        Ok(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_and_rescripts() {
        let (mut backend, handle) = ScriptedBackend::shared();
        let frame = Frame::filled(4, 4, 0).unwrap();

        assert!(backend.detect(&frame).unwrap().is_empty());

        handle.set(vec![RawDetection::labeled(0.0, 0.0, 2.0, 2.0, "car")]);
        let dets = backend.detect(&frame).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name.as_deref(), Some("car"));

        handle.clear();
        assert!(backend.detect(&frame).unwrap().is_empty());
        assert_eq!(backend.calls(), 3);
    }
}
