//! Occupancy decision engine.
//!
//! Maps one scan's evidence onto scaled slot polygons:
//!
//! - Detector mode: a slot is occupied when any evidence box has its centroid
//!   strictly inside the slot, or covers more than `overlap_threshold` of the
//!   slot's area.
//! - Variance mode: a slot is occupied when its texture score exceeds
//!   `variance_threshold`.
//!
//! Every slot starts available and can only move to occupied within a scan.
//! Booked slots are overlaid afterwards by `apply_bookings`; the engine itself
//! never reads the store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::detect::Evidence;
use crate::error::{OccupancyError, Result};
use crate::scale::ScaledSlot;
use crate::status::{SlotState, SlotStatus};

pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.10;
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 300.0;
pub const MAX_DIAGNOSTIC_ROWS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Fraction of slot area a box must cover, compared strictly.
    pub overlap_threshold: f64,
    /// Population variance of slot luma above which a slot is occupied.
    pub variance_threshold: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> Result<()> {
        if !self.overlap_threshold.is_finite()
            || self.overlap_threshold < 0.0
            || self.overlap_threshold >= 1.0
        {
            return Err(OccupancyError::config(format!(
                "overlap_threshold must be within [0, 1), got {}",
                self.overlap_threshold
            )));
        }
        if !self.variance_threshold.is_finite() || self.variance_threshold < 0.0 {
            return Err(OccupancyError::config(format!(
                "variance_threshold must be a non-negative number, got {}",
                self.variance_threshold
            )));
        }
        Ok(())
    }
}

/// How a scan decides occupancy. Chosen once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccupancyMode {
    #[serde(rename = "detector")]
    Detector,
    #[serde(rename = "variance")]
    VarianceFallback,
}

impl OccupancyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyMode::Detector => "detector",
            OccupancyMode::VarianceFallback => "variance",
        }
    }
}

impl fmt::Display for OccupancyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What settled a slot's status.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DecisionReason {
    NoEvidence,
    CentroidInside { evidence: usize },
    Overlap { evidence: usize, ratio: f64 },
    VarianceAbove { score: f64 },
    VarianceBelow { score: f64 },
    DegenerateGeometry,
    BookingHeld,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotDecision {
    pub slot_id: String,
    /// Status to report, including any booking overlay.
    pub status: SlotStatus,
    /// What the pixels alone said.
    pub observed: SlotStatus,
    pub reason: DecisionReason,
}

impl SlotDecision {
    fn new(slot_id: &str, observed: SlotStatus, reason: DecisionReason) -> Self {
        Self {
            slot_id: slot_id.to_string(),
            status: observed,
            observed,
            reason,
        }
    }
}

/// Decide every slot for one scan, in slot order.
///
/// Degenerate slots are logged and reported available; they never fail the
/// scan.
pub fn decide(
    slots: &[ScaledSlot],
    evidence: &[Evidence],
    mode: OccupancyMode,
    params: &EngineParams,
) -> Vec<SlotDecision> {
    match mode {
        OccupancyMode::Detector => decide_boxes(slots, evidence, params),
        OccupancyMode::VarianceFallback => decide_variance(slots, evidence, params),
    }
}

fn decide_boxes(
    slots: &[ScaledSlot],
    evidence: &[Evidence],
    params: &EngineParams,
) -> Vec<SlotDecision> {
    let boxes: Vec<_> = evidence
        .iter()
        .enumerate()
        .filter_map(|(idx, ev)| match ev {
            Evidence::Box(b) => Some((idx, b)),
            Evidence::Variance(v) => {
                log::debug!("ignoring variance evidence for '{}' in detector mode", v.slot_id);
                None
            }
        })
        .collect();

    slots
        .iter()
        .map(|slot| {
            if let Some(err) = slot.degeneracy() {
                log::warn!("{}; slot stays available", err);
                return SlotDecision::new(
                    &slot.slot_id,
                    SlotStatus::Available,
                    DecisionReason::DegenerateGeometry,
                );
            }
            for &(idx, b) in &boxes {
                if slot.polygon.contains(b.bbox.centroid()) {
                    log::debug!("slot '{}': centroid of evidence {} inside", slot.slot_id, idx);
                    return SlotDecision::new(
                        &slot.slot_id,
                        SlotStatus::Occupied,
                        DecisionReason::CentroidInside { evidence: idx },
                    );
                }
                let ratio = slot.polygon.intersection_area(&b.bbox) / slot.area;
                if ratio > params.overlap_threshold {
                    log::debug!(
                        "slot '{}': evidence {} overlaps {:.3} of slot",
                        slot.slot_id,
                        idx,
                        ratio
                    );
                    return SlotDecision::new(
                        &slot.slot_id,
                        SlotStatus::Occupied,
                        DecisionReason::Overlap {
                            evidence: idx,
                            ratio,
                        },
                    );
                }
            }
            SlotDecision::new(&slot.slot_id, SlotStatus::Available, DecisionReason::NoEvidence)
        })
        .collect()
}

fn decide_variance(
    slots: &[ScaledSlot],
    evidence: &[Evidence],
    params: &EngineParams,
) -> Vec<SlotDecision> {
    let mut scores: HashMap<&str, f64> = HashMap::new();
    for ev in evidence {
        match ev {
            Evidence::Variance(v) => {
                if slots.iter().any(|s| s.slot_id == v.slot_id) {
                    let entry = scores.entry(v.slot_id.as_str()).or_insert(v.score);
                    *entry = entry.max(v.score);
                } else {
                    log::debug!("ignoring variance evidence for unknown slot '{}'", v.slot_id);
                }
            }
            Evidence::Box(_) => log::debug!("ignoring box evidence in variance mode"),
        }
    }

    slots
        .iter()
        .map(|slot| {
            if let Some(err) = slot.degeneracy() {
                log::warn!("{}; slot stays available", err);
                return SlotDecision::new(
                    &slot.slot_id,
                    SlotStatus::Available,
                    DecisionReason::DegenerateGeometry,
                );
            }
            match scores.get(slot.slot_id.as_str()) {
                Some(&score) if score > params.variance_threshold => SlotDecision::new(
                    &slot.slot_id,
                    SlotStatus::Occupied,
                    DecisionReason::VarianceAbove { score },
                ),
                Some(&score) => SlotDecision::new(
                    &slot.slot_id,
                    SlotStatus::Available,
                    DecisionReason::VarianceBelow { score },
                ),
                None => SlotDecision::new(
                    &slot.slot_id,
                    SlotStatus::Available,
                    DecisionReason::NoEvidence,
                ),
            }
        })
        .collect()
}

/// Report stored bookings over the scan result. `observed` is left untouched.
pub fn apply_bookings(decisions: &mut [SlotDecision], stored: &[SlotState]) {
    for decision in decisions.iter_mut() {
        let booked = stored
            .iter()
            .any(|s| s.slot_id == decision.slot_id && s.status == SlotStatus::Booked);
        if booked {
            decision.status = SlotStatus::Booked;
            decision.reason = DecisionReason::BookingHeld;
        }
    }
}

/// One (evidence box, slot) pairing, as shown by the debug endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlapDiagnostic {
    #[serde(rename = "slot")]
    pub slot_id: String,
    #[serde(rename = "cls")]
    pub class_name: Option<String>,
    /// Covered fraction of the slot, rounded to three decimals.
    pub ratio: f64,
    #[serde(rename = "center")]
    pub centroid_inside: bool,
}

/// Overlap rows for every box against every slot, capped at
/// `MAX_DIAGNOSTIC_ROWS`.
pub fn diagnostics(slots: &[ScaledSlot], evidence: &[Evidence]) -> Vec<OverlapDiagnostic> {
    let mut rows = Vec::new();
    for b in evidence.iter().filter_map(Evidence::as_box) {
        let centroid = b.bbox.centroid();
        for slot in slots {
            if rows.len() == MAX_DIAGNOSTIC_ROWS {
                return rows;
            }
            let ratio = if slot.area > 0.0 {
                slot.polygon.intersection_area(&b.bbox) / slot.area
            } else {
                0.0
            };
            rows.push(OverlapDiagnostic {
                slot_id: slot.slot_id.clone(),
                class_name: b.class_name.clone(),
                ratio: (ratio * 1000.0).round() / 1000.0,
                centroid_inside: slot.polygon.contains(centroid),
            });
        }
    }
    rows
}
