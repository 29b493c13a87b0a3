//! Parking-slot occupancy service.
//!
//! Maps object-detector boxes (or a texture-variance fallback) from one
//! camera frame onto calibrated slot polygons, keeps the last known status of
//! every slot, and hands out bookings on top of it.
//!
//! # Module Structure
//!
//! - `geometry`, `scale`: polygons, boxes, and calibration-to-frame scaling
//! - `area`: slot definitions and the areas file loader
//! - `frame`, `ingest`: captured frames and where they come from
//! - `detect`: detector backends and the evidence adapter
//! - `engine`, `texture`: the occupancy decision rules
//! - `store`: last known status per slot plus the booking trail
//! - `assign`: deterministic slot choice
//! - `service`: scan / assign / release orchestration
//! - `config`, `api`: daemon configuration and the HTTP surface

use rand::RngCore;
use rusqlite::{Connection, OpenFlags};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod api;
pub mod area;
pub mod assign;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod scale;
pub mod service;
pub mod status;
pub mod store;
pub mod texture;

pub use area::{load_areas, parse_areas, Area, AreaCatalog, Slot};
pub use assign::first_available;
pub use detect::{
    BackendRegistry, ClassAllowList, DetectionAdapter, DetectionCapability, DetectorBackend,
    Evidence, RawDetection, ScriptedBackend,
};
pub use engine::{EngineParams, OccupancyMode, SlotDecision};
pub use error::{OccupancyError, Result};
pub use frame::{Frame, GrayFrame};
pub use geometry::{BoundingBox, Point, Polygon};
pub use ingest::{open_source, FrameSource, PixelFormat, StubSource};
pub use scale::{Resolution, ScaleFactors, ScaledSlot};
pub use service::{
    Capabilities, CaptureProvider, DetectionRow, DetectorOutput, ModePreference, ParkingService,
    ScanReport, ServiceOptions, UriCapture,
};
pub use status::{BookingRecord, BookingState, ScanSummary, SlotState, SlotStatus, TimestampMs};
pub use store::{InMemoryStatusStore, SqliteStatusStore, StatusStore, UpsertOutcome};

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as TimestampMs)
        .unwrap_or(0)
}

/// URI for a private shared-cache in-memory SQLite database.
pub fn shared_memory_uri() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!(
        "file:parkwatch_{:x}?mode=memory&cache=shared",
        u64::from_le_bytes(bytes)
    )
}

pub(crate) fn open_db_connection(db_path: &str) -> Result<Connection> {
    if db_path.starts_with("file:") {
        return Ok(Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?);
    }
    Ok(Connection::open(db_path)?)
}
