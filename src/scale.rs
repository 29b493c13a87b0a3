//! Calibration-to-frame scaling of slot polygons.
//!
//! Slots are drawn once against a calibration resolution. Captured frames can
//! arrive at any resolution, so every scan maps the slot rings into frame
//! pixels with independent x/y factors before any containment test runs.

use serde::{Deserialize, Serialize};

use crate::area::Area;
use crate::error::{OccupancyError, Result};
use crate::geometry::{Point, Polygon};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Per-axis factors mapping calibration coordinates to frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactors {
    pub sx: f64,
    pub sy: f64,
}

impl ScaleFactors {
    pub const IDENTITY: ScaleFactors = ScaleFactors { sx: 1.0, sy: 1.0 };

    pub fn new(sx: f64, sy: f64) -> Self {
        Self { sx, sy }
    }

    /// Factors taking `calibration` pixels to `actual` pixels.
    pub fn between(calibration: Resolution, actual: Resolution) -> Result<Self> {
        if calibration.width == 0 || calibration.height == 0 {
            return Err(OccupancyError::config(format!(
                "calibration resolution must be positive, got {}x{}",
                calibration.width, calibration.height
            )));
        }
        Ok(Self {
            sx: actual.width as f64 / calibration.width as f64,
            sy: actual.height as f64 / calibration.height as f64,
        })
    }

    /// Compose with a second scaling applied after this one.
    pub fn then(self, next: ScaleFactors) -> Self {
        Self {
            sx: self.sx * next.sx,
            sy: self.sy * next.sy,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.sx, p.y * self.sy)
    }
}

pub fn scale_polygon(polygon: &Polygon, factors: ScaleFactors) -> Polygon {
    polygon.map_points(|p| factors.apply(p))
}

/// A slot ring expressed in frame pixels, with its area cached.
#[derive(Clone, Debug)]
pub struct ScaledSlot {
    pub slot_id: String,
    pub polygon: Polygon,
    pub area: f64,
}

impl ScaledSlot {
    /// Reason this slot can never be occupied, when its scaled ring is unusable.
    pub fn degeneracy(&self) -> Option<OccupancyError> {
        self.polygon
            .degeneracy()
            .map(|reason| OccupancyError::geometry(&self.slot_id, reason))
    }
}

/// Scale every slot of `area` into a frame of size `actual`, in slot order.
pub fn scale_area(area: &Area, actual: Resolution) -> Result<Vec<ScaledSlot>> {
    let factors = ScaleFactors::between(area.calibration, actual)?;
    Ok(area
        .slots
        .iter()
        .map(|slot| {
            let polygon = scale_polygon(&slot.polygon, factors);
            let area = polygon.area();
            ScaledSlot {
                slot_id: slot.id.clone(),
                polygon,
                area,
            }
        })
        .collect())
}
