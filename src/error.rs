use thiserror::Error;

/// Errors surfaced by the occupancy core.
///
/// Capture and detector failures come from collaborators and are carried
/// through unchanged; the core never retries them.
#[derive(Debug, Error)]
pub enum OccupancyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid geometry for slot '{slot_id}': {reason}")]
    InvalidGeometry { slot_id: String, reason: String },

    #[error("no available slots in area '{0}'")]
    NoCapacity(String),

    #[error("unknown area '{0}'")]
    UnknownArea(String),

    #[error("unknown slot '{slot_id}' in area '{area}'")]
    UnknownSlot { area: String, slot_id: String },

    #[error("slot '{slot_id}' in area '{area}' is {status}, not available")]
    SlotUnavailable {
        area: String,
        slot_id: String,
        status: String,
    },

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("detector failed: {0}")]
    Detector(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl OccupancyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn geometry(slot_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            slot_id: slot_id.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status the API answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnknownArea(_) | Self::UnknownSlot { .. } => 404,
            Self::NoCapacity(_) | Self::SlotUnavailable { .. } => 409,
            Self::Configuration(_) => 400,
            _ => 500,
        }
    }

    /// Stable machine-readable code for JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidGeometry { .. } => "invalid_geometry",
            Self::NoCapacity(_) => "no_capacity",
            Self::UnknownArea(_) => "unknown_area",
            Self::UnknownSlot { .. } => "unknown_slot",
            Self::SlotUnavailable { .. } => "slot_unavailable",
            Self::Capture(_) => "capture_failed",
            Self::Detector(_) => "detector_failed",
            Self::Storage(_) | Self::LockPoisoned => "storage",
        }
    }
}

pub type Result<T> = std::result::Result<T, OccupancyError>;
