//! Scan, assignment, and release orchestration.
//!
//! A scan runs synchronously: capture one frame, scale the area's slots to
//! it, turn detector output (or texture scores) into evidence, decide, and
//! merge the result into the store. Capture and detection happen before any
//! store lock is taken; only the final merge is serialized.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::area::{Area, AreaCatalog};
use crate::assign::{available_in_order, compare_slot_ids};
use crate::detect::{BackendRegistry, DetectionAdapter, DetectionCapability, Evidence};
use crate::engine::{
    apply_bookings, decide, diagnostics, EngineParams, OccupancyMode, OverlapDiagnostic,
    SlotDecision,
};
use crate::error::{OccupancyError, Result};
use crate::frame::Frame;
use crate::ingest::open_source;
use crate::scale::{scale_area, Resolution, ScaledSlot};
use crate::status::{BookingRecord, ScanSummary, SlotState, SlotStatus, TimestampMs};
use crate::store::StatusStore;
use crate::texture;

/// Requested occupancy mode, before looking at what is installed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModePreference {
    /// Detector when one is registered, otherwise variance.
    #[default]
    Auto,
    Detector,
    Variance,
}

impl FromStr for ModePreference {
    type Err = OccupancyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ModePreference::Auto),
            "detector" => Ok(ModePreference::Detector),
            "variance" => Ok(ModePreference::Variance),
            other => Err(OccupancyError::config(format!(
                "unknown occupancy mode '{}', expected auto, detector or variance",
                other
            ))),
        }
    }
}

impl fmt::Display for ModePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModePreference::Auto => "auto",
            ModePreference::Detector => "detector",
            ModePreference::Variance => "variance",
        };
        f.write_str(s)
    }
}

/// What this deployment can do, resolved once at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub mode: OccupancyMode,
    /// Backend serving box detection, when in detector mode.
    pub detector: Option<String>,
}

impl Capabilities {
    pub fn resolve(preference: ModePreference, registry: &BackendRegistry) -> Result<Self> {
        let detector = registry.name_for_capability(DetectionCapability::ObjectBoxes);
        match (preference, detector) {
            (ModePreference::Variance, _) | (ModePreference::Auto, None) => Ok(Self {
                mode: OccupancyMode::VarianceFallback,
                detector: None,
            }),
            (ModePreference::Auto | ModePreference::Detector, Some(name)) => Ok(Self {
                mode: OccupancyMode::Detector,
                detector: Some(name),
            }),
            (ModePreference::Detector, None) => Err(OccupancyError::config(
                "detector mode requested but no detector backend is registered",
            )),
        }
    }
}

/// Hands over one frame for an area's camera.
pub trait CaptureProvider: Send + Sync {
    fn capture(&self, area: &Area) -> Result<Frame>;
}

impl<F> CaptureProvider for F
where
    F: Fn(&Area) -> Result<Frame> + Send + Sync,
{
    fn capture(&self, area: &Area) -> Result<Frame> {
        self(area)
    }
}

/// Opens a capture source by URI for every scan. Cameras without their own
/// URI use the default one.
#[derive(Clone, Debug)]
pub struct UriCapture {
    default_source: String,
    cameras: HashMap<u32, String>,
}

impl UriCapture {
    pub fn new(default_source: &str) -> Self {
        Self {
            default_source: default_source.to_string(),
            cameras: HashMap::new(),
        }
    }

    pub fn with_camera(mut self, camera_index: u32, uri: &str) -> Self {
        self.cameras.insert(camera_index, uri.to_string());
        self
    }

    pub fn source_for(&self, camera_index: u32) -> &str {
        self.cameras
            .get(&camera_index)
            .map(String::as_str)
            .unwrap_or(&self.default_source)
    }
}

impl CaptureProvider for UriCapture {
    fn capture(&self, area: &Area) -> Result<Frame> {
        let uri = self.source_for(area.camera_index);
        let mut source = open_source(uri)?;
        let frame = source.next_frame()?;
        log::debug!(
            "captured {}x{} frame for '{}' from {}",
            frame.width,
            frame.height,
            area.name,
            source.name()
        );
        Ok(frame)
    }
}

/// One slot as reported by a scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedSlot {
    #[serde(rename = "id")]
    pub slot_id: String,
    pub status: SlotStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub area: String,
    pub taken_at_ms: TimestampMs,
    pub mode: OccupancyMode,
    /// Ascending numeric slot id order.
    pub slots: Vec<ReportedSlot>,
    pub summary: ScanSummary,
}

/// Latest scan of an area with everything that went into it.
#[derive(Clone, Debug)]
pub struct ScanSnapshot {
    pub report: ScanReport,
    pub resolution: Resolution,
    pub evidence: Vec<Evidence>,
    pub decisions: Vec<SlotDecision>,
}

/// Stored view of an area without scanning.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub area: String,
    pub slots: Vec<SlotState>,
    pub summary: ScanSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaInfo {
    pub name: String,
    pub camera_index: u32,
    pub slot_count: usize,
}

/// Per (box, slot) overlap rows for one fresh frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
    pub rows: Vec<OverlapDiagnostic>,
}

/// Most detections listed by `ParkingService::detections`.
pub const MAX_DETECTION_ROWS: usize = 50;

/// One unfiltered detector hit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionRow {
    #[serde(rename = "cls")]
    pub class_name: Option<String>,
    #[serde(rename = "conf")]
    pub confidence: Option<f64>,
}

/// Raw detector output for one fresh frame, before the class allow-list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectorOutput {
    pub count: usize,
    pub detector: Option<String>,
    pub detections: Vec<DetectionRow>,
}

#[derive(Clone, Debug, Default)]
pub struct ServiceOptions {
    pub mode: ModePreference,
    pub params: EngineParams,
    pub adapter: DetectionAdapter,
}

pub struct ParkingService {
    areas: AreaCatalog,
    store: Arc<dyn StatusStore>,
    registry: BackendRegistry,
    capture: Box<dyn CaptureProvider>,
    capabilities: Capabilities,
    params: EngineParams,
    adapter: DetectionAdapter,
    snapshots: Mutex<HashMap<String, ScanSnapshot>>,
}

impl ParkingService {
    /// Validate parameters, warm up detectors, and fix the occupancy mode.
    pub fn new(
        areas: AreaCatalog,
        store: Arc<dyn StatusStore>,
        registry: BackendRegistry,
        capture: Box<dyn CaptureProvider>,
        options: ServiceOptions,
    ) -> Result<Self> {
        options.params.validate()?;
        registry.warm_up_all()?;
        let capabilities = Capabilities::resolve(options.mode, &registry)?;
        match &capabilities.detector {
            Some(name) => log::info!("occupancy mode: detector ({})", name),
            None => log::info!("occupancy mode: variance fallback"),
        }
        Ok(Self {
            areas,
            store,
            registry,
            capture,
            capabilities,
            params: options.params,
            adapter: options.adapter,
            snapshots: Mutex::new(HashMap::new()),
        })
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn areas(&self) -> &AreaCatalog {
        &self.areas
    }

    pub fn list_areas(&self) -> Vec<AreaInfo> {
        self.areas
            .iter()
            .map(|area| AreaInfo {
                name: area.name.clone(),
                camera_index: area.camera_index,
                slot_count: area.slots.len(),
            })
            .collect()
    }

    /// Capture a frame for `area` and scan it.
    pub fn scan(&self, area: &str) -> Result<ScanReport> {
        let area = self.areas.require(area)?;
        let frame = self.capture.capture(&area)?;
        self.scan_area_frame(&area, &frame)
    }

    /// Scan a frame supplied by the caller.
    pub fn scan_frame(&self, area: &str, frame: &Frame) -> Result<ScanReport> {
        let area = self.areas.require(area)?;
        self.scan_area_frame(&area, frame)
    }

    fn evaluate(&self, area: &Area, frame: &Frame) -> Result<(Vec<ScaledSlot>, Vec<Evidence>)> {
        let slots = scale_area(area, frame.resolution())?;
        let evidence = match self.capabilities.mode {
            OccupancyMode::Detector => {
                let raw = self
                    .registry
                    .detect_with_capability(DetectionCapability::ObjectBoxes, frame)?;
                self.adapter.to_evidence(raw)
            }
            OccupancyMode::VarianceFallback => {
                let gray = frame.to_gray()?;
                texture::variance_evidence(&gray, &slots)
            }
        };
        Ok((slots, evidence))
    }

    fn scan_area_frame(&self, area: &Area, frame: &Frame) -> Result<ScanReport> {
        let (slots, evidence) = self.evaluate(area, frame)?;
        let mut decisions = decide(&slots, &evidence, self.capabilities.mode, &self.params);

        let observed: Vec<(String, SlotStatus)> = decisions
            .iter()
            .map(|d| (d.slot_id.clone(), d.observed))
            .collect();
        let stored = self
            .store
            .apply_scan(&area.name, &observed, frame.captured_at_ms)?;
        apply_bookings(&mut decisions, &stored);

        let mut reported: Vec<ReportedSlot> = decisions
            .iter()
            .map(|d| ReportedSlot {
                slot_id: d.slot_id.clone(),
                status: d.status,
            })
            .collect();
        reported.sort_by(|a, b| compare_slot_ids(&a.slot_id, &b.slot_id));
        let summary = ScanSummary::from_statuses(reported.iter().map(|s| &s.status));
        let report = ScanReport {
            area: area.name.clone(),
            taken_at_ms: frame.captured_at_ms,
            mode: self.capabilities.mode,
            slots: reported,
            summary,
        };
        log::info!(
            "scan '{}' ({}): {} occupied, {} available, {} booked",
            area.name,
            report.mode,
            summary.occupied,
            summary.available,
            summary.booked
        );

        let snapshot = ScanSnapshot {
            report: report.clone(),
            resolution: frame.resolution(),
            evidence,
            decisions,
        };
        self.snapshots
            .lock()
            .map_err(|_| OccupancyError::LockPoisoned)?
            .insert(area.name.clone(), snapshot);
        Ok(report)
    }

    /// Scan, then book the first available slot for `user_id`.
    ///
    /// A candidate taken by a concurrent booking is skipped in favour of the
    /// next one.
    pub fn assign(&self, area: &str, user_id: &str) -> Result<BookingRecord> {
        self.scan(area)?;
        self.book_first_available(area, user_id)
    }

    /// Book the first available slot according to the store, without scanning.
    pub fn book_first_available(&self, area: &str, user_id: &str) -> Result<BookingRecord> {
        let area = self.areas.require(area)?;
        let states = self.store.list(&area.name)?;
        let known: Vec<SlotState> = states
            .into_iter()
            .filter(|s| area.slot(&s.slot_id).is_some())
            .collect();
        for slot_id in available_in_order(&known) {
            match self
                .store
                .book(user_id, &area.name, slot_id, crate::now_ms())
            {
                Ok(record) => {
                    log::info!(
                        "booked slot '{}' in '{}' for '{}'",
                        record.slot_id,
                        area.name,
                        user_id
                    );
                    return Ok(record);
                }
                Err(OccupancyError::SlotUnavailable { .. }) => {
                    log::debug!("slot '{}' taken concurrently, trying next", slot_id);
                }
                Err(e) => return Err(e),
            }
        }
        Err(OccupancyError::NoCapacity(area.name.clone()))
    }

    /// Book a specific slot.
    pub fn book(&self, area: &str, slot_id: &str, user_id: &str) -> Result<BookingRecord> {
        let area = self.require_slot(area, slot_id)?;
        self.store
            .book(user_id, &area.name, slot_id, crate::now_ms())
    }

    /// Release a booking. Returns whether a booking was active.
    pub fn release(&self, area: &str, slot_id: &str) -> Result<bool> {
        let area = self.require_slot(area, slot_id)?;
        let released = self.store.release(&area.name, slot_id, crate::now_ms())?;
        if released {
            log::info!("released slot '{}' in '{}'", slot_id, area.name);
        }
        Ok(released)
    }

    pub fn status(&self, area: &str) -> Result<StatusView> {
        let area = self.areas.require(area)?;
        let slots = self.store.list(&area.name)?;
        let summary = ScanSummary::from_statuses(slots.iter().map(|s| &s.status));
        Ok(StatusView {
            area: area.name.clone(),
            slots,
            summary,
        })
    }

    pub fn bookings(&self, area: &str) -> Result<Vec<BookingRecord>> {
        let area = self.areas.require(area)?;
        self.store.bookings(&area.name)
    }

    pub fn latest_snapshot(&self, area: &str) -> Result<Option<ScanSnapshot>> {
        let area = self.areas.require(area)?;
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|_| OccupancyError::LockPoisoned)?;
        Ok(snapshots.get(&area.name).cloned())
    }

    /// Overlap rows for a fresh frame. Nothing is persisted.
    pub fn diagnostics(&self, area: &str) -> Result<Diagnostics> {
        let area = self.areas.require(area)?;
        let frame = self.capture.capture(&area)?;
        let (slots, evidence) = self.evaluate(&area, &frame)?;
        Ok(Diagnostics {
            width: frame.width,
            height: frame.height,
            rows: diagnostics(&slots, &evidence),
        })
    }

    /// Run the detector on a fresh frame and list what it saw, unfiltered.
    ///
    /// `count` covers every detection; at most `MAX_DETECTION_ROWS` are
    /// listed. Nothing is persisted.
    pub fn detections(&self, area: &str) -> Result<DetectorOutput> {
        let area = self.areas.require(area)?;
        if self.capabilities.mode != OccupancyMode::Detector {
            return Err(OccupancyError::config(
                "no object detector is active; raw detections are unavailable",
            ));
        }
        let frame = self.capture.capture(&area)?;
        let raw = self
            .registry
            .detect_with_capability(DetectionCapability::ObjectBoxes, &frame)?;
        let count = raw.len();
        let detections = raw
            .into_iter()
            .take(MAX_DETECTION_ROWS)
            .map(|det| DetectionRow {
                class_name: det.class_name,
                confidence: det
                    .confidence
                    .map(|conf| (f64::from(conf) * 1000.0).round() / 1000.0),
            })
            .collect();
        log::debug!("'{}': detector reported {} boxes", area.name, count);
        Ok(DetectorOutput {
            count,
            detector: self.capabilities.detector.clone(),
            detections,
        })
    }

    fn require_slot(&self, area: &str, slot_id: &str) -> Result<Arc<Area>> {
        let area = self.areas.require(area)?;
        if area.slot(slot_id).is_none() {
            return Err(OccupancyError::UnknownSlot {
                area: area.name.clone(),
                slot_id: slot_id.to_string(),
            });
        }
        Ok(area)
    }
}
