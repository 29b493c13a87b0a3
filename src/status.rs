use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OccupancyError;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Occupied,
    /// Sticky: only an explicit release clears it.
    Booked,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Occupied => "occupied",
            SlotStatus::Booked => "booked",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotStatus {
    type Err = OccupancyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(SlotStatus::Available),
            "occupied" => Ok(SlotStatus::Occupied),
            "booked" => Ok(SlotStatus::Booked),
            other => Err(OccupancyError::config(format!(
                "unknown slot status '{}'",
                other
            ))),
        }
    }
}

/// Last known status of one slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotState {
    #[serde(rename = "id")]
    pub slot_id: String,
    pub status: SlotStatus,
    pub updated_at_ms: TimestampMs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    Booked,
    Released,
}

impl BookingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Booked => "booked",
            BookingState::Released => "released",
        }
    }
}

impl FromStr for BookingState {
    type Err = OccupancyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(BookingState::Booked),
            "released" => Ok(BookingState::Released),
            other => Err(OccupancyError::config(format!(
                "unknown booking state '{}'",
                other
            ))),
        }
    }
}

/// Audit record of one booking. Never the source of truth for availability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: i64,
    pub user_id: String,
    pub area: String,
    pub slot_id: String,
    pub state: BookingState,
    pub created_at_ms: TimestampMs,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub occupied: usize,
    pub available: usize,
    pub booked: usize,
    pub total: usize,
}

impl ScanSummary {
    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a SlotStatus>) -> Self {
        let mut summary = ScanSummary::default();
        for status in statuses {
            match status {
                SlotStatus::Available => summary.available += 1,
                SlotStatus::Occupied => summary.occupied += 1,
                SlotStatus::Booked => summary.booked += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [SlotStatus::Available, SlotStatus::Occupied, SlotStatus::Booked] {
            assert_eq!(status.as_str().parse::<SlotStatus>().unwrap(), status);
        }
        assert!("reserved".parse::<SlotStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&SlotStatus::Booked).unwrap(),
            "\"booked\""
        );
    }

    #[test]
    fn summary_counts_each_status() {
        let statuses = [
            SlotStatus::Available,
            SlotStatus::Occupied,
            SlotStatus::Occupied,
            SlotStatus::Booked,
        ];
        let summary = ScanSummary::from_statuses(&statuses);
        assert_eq!(
            summary,
            ScanSummary {
                occupied: 2,
                available: 1,
                booked: 1,
                total: 4
            }
        );
    }
}
