//! Area and slot definitions, plus the areas file loader.
//!
//! The areas file is JSON:
//!
//! ```json
//! { "areas": [ { "name": "Demo", "camera_index": 0,
//!                "frame_width": 1920, "frame_height": 1080,
//!                "slots": [ { "id": "1", "polygon": [[0,0],[10,0],[10,10],[0,10]] } ] } ] }
//! ```
//!
//! Every problem is reported at load time; scans never see a malformed area.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{OccupancyError, Result};
use crate::geometry::{Point, Polygon};
use crate::scale::Resolution;

const DEFAULT_FRAME_WIDTH: u32 = 1920;
const DEFAULT_FRAME_HEIGHT: u32 = 1080;

#[derive(Clone, Debug)]
pub struct Slot {
    pub id: String,
    /// Ring in calibration coordinates.
    pub polygon: Polygon,
}

#[derive(Clone, Debug)]
pub struct Area {
    pub name: String,
    pub camera_index: u32,
    /// Resolution the slot polygons were drawn against.
    pub calibration: Resolution,
    /// Display order.
    pub slots: Vec<Slot>,
}

impl Area {
    /// Validate and build an area.
    pub fn new(
        name: &str,
        camera_index: u32,
        calibration: Resolution,
        slots: Vec<Slot>,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OccupancyError::config("area name must not be empty"));
        }
        if calibration.width == 0 || calibration.height == 0 {
            return Err(OccupancyError::config(format!(
                "area '{}': calibration resolution must be positive, got {}x{}",
                name, calibration.width, calibration.height
            )));
        }
        if slots.is_empty() {
            return Err(OccupancyError::config(format!(
                "area '{}' has no slots",
                name
            )));
        }
        let mut seen = HashSet::new();
        for slot in &slots {
            if slot.id.trim().is_empty() {
                return Err(OccupancyError::config(format!(
                    "area '{}': slot id must not be empty",
                    name
                )));
            }
            if !seen.insert(slot.id.as_str()) {
                return Err(OccupancyError::config(format!(
                    "area '{}': duplicate slot id '{}'",
                    name, slot.id
                )));
            }
            if let Some(reason) = slot.polygon.degeneracy() {
                return Err(OccupancyError::config(format!(
                    "area '{}', slot '{}': {}",
                    name, slot.id, reason
                )));
            }
        }
        Ok(Self {
            name: name.to_string(),
            camera_index,
            calibration,
            slots,
        })
    }

    pub fn slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == slot_id)
    }

    pub fn slot_ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.id.as_str())
    }
}

/// Every configured area, in file order.
#[derive(Clone, Debug, Default)]
pub struct AreaCatalog {
    areas: Vec<Arc<Area>>,
}

impl AreaCatalog {
    pub fn new(areas: Vec<Area>) -> Result<Self> {
        let mut seen = HashSet::new();
        for area in &areas {
            if !seen.insert(area.name.clone()) {
                return Err(OccupancyError::config(format!(
                    "duplicate area name '{}'",
                    area.name
                )));
            }
        }
        Ok(Self {
            areas: areas.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<Area>> {
        self.areas.iter().find(|area| area.name == name).cloned()
    }

    /// Like `get`, but an unknown name is an error.
    pub fn require(&self, name: &str) -> Result<Arc<Area>> {
        self.get(name)
            .ok_or_else(|| OccupancyError::UnknownArea(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Area>> {
        self.areas.iter()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct AreasFile {
    areas: Vec<AreaEntry>,
}

#[derive(Debug, Deserialize)]
struct AreaEntry {
    name: String,
    #[serde(default)]
    camera_index: Option<u32>,
    #[serde(default)]
    frame_width: Option<u32>,
    #[serde(default)]
    frame_height: Option<u32>,
    slots: Vec<SlotEntry>,
}

#[derive(Debug, Deserialize)]
struct SlotEntry {
    id: SlotIdEntry,
    polygon: Vec<[f64; 2]>,
}

/// Slot ids may be written as strings or bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlotIdEntry {
    Text(String),
    Number(u64),
}

impl SlotIdEntry {
    fn into_string(self) -> String {
        match self {
            SlotIdEntry::Text(s) => s.trim().to_string(),
            SlotIdEntry::Number(n) => n.to_string(),
        }
    }
}

/// Parse an areas document.
pub fn parse_areas(raw: &str) -> Result<AreaCatalog> {
    let file: AreasFile = serde_json::from_str(raw)
        .map_err(|e| OccupancyError::config(format!("invalid areas file: {}", e)))?;
    if file.areas.is_empty() {
        return Err(OccupancyError::config("areas file defines no areas"));
    }
    let mut areas = Vec::with_capacity(file.areas.len());
    for entry in file.areas {
        let slots = entry
            .slots
            .into_iter()
            .map(|slot| Slot {
                id: slot.id.into_string(),
                polygon: Polygon::new(slot.polygon.into_iter().map(Point::from).collect()),
            })
            .collect();
        let calibration = Resolution::new(
            entry.frame_width.unwrap_or(DEFAULT_FRAME_WIDTH),
            entry.frame_height.unwrap_or(DEFAULT_FRAME_HEIGHT),
        );
        areas.push(Area::new(
            &entry.name,
            entry.camera_index.unwrap_or(0),
            calibration,
            slots,
        )?);
    }
    AreaCatalog::new(areas)
}

pub fn load_areas(path: &Path) -> Result<AreaCatalog> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        OccupancyError::config(format!(
            "failed to read areas file {}: {}",
            path.display(),
            e
        ))
    })?;
    let catalog = parse_areas(&raw)?;
    log::info!(
        "loaded {} area(s) from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"{
        "areas": [
            {
                "name": "Demo",
                "camera_index": 1,
                "frame_width": 40,
                "frame_height": 10,
                "slots": [
                    { "id": "1", "polygon": [[0,0],[10,0],[10,10],[0,10]] },
                    { "id": 2, "polygon": [[20,0],[30,0],[30,10],[20,10]] }
                ]
            },
            {
                "name": "Lot B",
                "slots": [ { "id": "7", "polygon": [[0,0],[100,0],[100,50]] } ]
            }
        ]
    }"#;

    #[test]
    fn parses_areas_with_defaults() {
        let catalog = parse_areas(DEMO).unwrap();
        assert_eq!(catalog.len(), 2);

        let demo = catalog.get("Demo").unwrap();
        assert_eq!(demo.camera_index, 1);
        assert_eq!(demo.calibration, Resolution::new(40, 10));
        assert_eq!(demo.slot_ids().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(demo.slot("2").unwrap().polygon.area(), 100.0);

        let lot_b = catalog.get("Lot B").unwrap();
        assert_eq!(lot_b.camera_index, 0);
        assert_eq!(lot_b.calibration, Resolution::new(1920, 1080));
    }

    #[test]
    fn rejects_empty_slot_list() {
        let err = parse_areas(r#"{"areas":[{"name":"A","slots":[]}]}"#).unwrap_err();
        assert!(matches!(err, OccupancyError::Configuration(_)));
    }

    #[test]
    fn rejects_non_numeric_coordinates() {
        let raw = r#"{"areas":[{"name":"A","slots":[{"id":"1","polygon":[["a",0],[1,0],[1,1]]}]}]}"#;
        assert!(matches!(
            parse_areas(raw).unwrap_err(),
            OccupancyError::Configuration(_)
        ));
    }

    #[test]
    fn rejects_zero_area_and_duplicates() {
        let flat = r#"{"areas":[{"name":"A","slots":[{"id":"1","polygon":[[0,0],[5,0],[10,0]]}]}]}"#;
        assert!(parse_areas(flat).is_err());

        let dup_slot = r#"{"areas":[{"name":"A","slots":[
            {"id":"1","polygon":[[0,0],[5,0],[5,5]]},
            {"id":"1","polygon":[[0,0],[5,0],[5,5]]}]}]}"#;
        assert!(parse_areas(dup_slot).is_err());

        let dup_area = r#"{"areas":[
            {"name":"A","slots":[{"id":"1","polygon":[[0,0],[5,0],[5,5]]}]},
            {"name":"A","slots":[{"id":"1","polygon":[[0,0],[5,0],[5,5]]}]}]}"#;
        assert!(parse_areas(dup_area).is_err());
    }

    #[test]
    fn rejects_zero_calibration() {
        let raw = r#"{"areas":[{"name":"A","frame_width":0,"slots":[{"id":"1","polygon":[[0,0],[5,0],[5,5]]}]}]}"#;
        assert!(parse_areas(raw).is_err());
    }

    #[test]
    fn unknown_area_is_reported() {
        let catalog = parse_areas(DEMO).unwrap();
        assert!(matches!(
            catalog.require("Nowhere").unwrap_err(),
            OccupancyError::UnknownArea(_)
        ));
    }
}
