use std::sync::{Arc, Mutex};

use crate::detect::result::RawDetection;
use crate::error::{OccupancyError, Result};
use crate::frame::Frame;

use super::backend::{DetectionCapability, DetectorBackend};

type SharedBackend = Arc<Mutex<dyn DetectorBackend>>;

/// Detector backends installed in this deployment, in preference order.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
/// A later registration under an existing name replaces the earlier backend
/// but keeps its position.
pub struct BackendRegistry {
    backends: Vec<(String, SharedBackend)>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        let shared: SharedBackend = Arc::new(Mutex::new(backend));
        match self.backends.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                log::warn!("detector backend '{}' registered twice, replacing", name);
                entry.1 = shared;
            }
            None => self.backends.push((name, shared)),
        }
    }

    /// Registered backend names, in preference order.
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Name of the backend that would serve `capability`, if any.
    pub fn name_for_capability(&self, capability: DetectionCapability) -> Option<String> {
        self.select(capability)
            .ok()
            .flatten()
            .map(|(name, _)| name.to_string())
    }

    fn select(&self, capability: DetectionCapability) -> Result<Option<(&str, &SharedBackend)>> {
        for (name, backend) in &self.backends {
            let guard = backend
                .lock()
                .map_err(|_| OccupancyError::Detector(format!("backend '{}' lock poisoned", name)))?;
            if guard.supports(capability) {
                return Ok(Some((name.as_str(), backend)));
            }
        }
        Ok(None)
    }

    /// Run the first backend that supports `capability` on `frame`.
    pub fn detect_with_capability(
        &self,
        capability: DetectionCapability,
        frame: &Frame,
    ) -> Result<Vec<RawDetection>> {
        let (name, backend) = self.select(capability)?.ok_or_else(|| {
            OccupancyError::Detector(format!(
                "no registered backend supports capability {:?}",
                capability
            ))
        })?;
        let mut guard = backend
            .lock()
            .map_err(|_| OccupancyError::Detector(format!("backend '{}' lock poisoned", name)))?;
        let detections = guard.detect(frame)?;
        log::debug!("backend '{}' returned {} detection(s)", name, detections.len());
        Ok(detections)
    }

    /// Warm up every registered backend.
    pub fn warm_up_all(&self) -> Result<()> {
        for (name, backend) in &self.backends {
            let mut guard = backend
                .lock()
                .map_err(|_| OccupancyError::Detector(format!("backend '{}' lock poisoned", name)))?;
            guard.warm_up()?;
            log::debug!("detector backend '{}' warmed up", name);
        }
        Ok(())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
