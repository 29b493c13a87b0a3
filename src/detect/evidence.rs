use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// One box that survived the class allow-list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxEvidence {
    pub bbox: BoundingBox,
    pub class_name: Option<String>,
    pub confidence: Option<f32>,
}

/// Texture score for a single slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarianceEvidence {
    pub slot_id: String,
    pub score: f64,
}

/// Normalized scan input for the decision engine.
///
/// Produced per scan and consumed once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Evidence {
    Box(BoxEvidence),
    Variance(VarianceEvidence),
}

impl Evidence {
    pub fn boxed(bbox: BoundingBox, class_name: Option<&str>, confidence: Option<f32>) -> Self {
        Evidence::Box(BoxEvidence {
            bbox,
            class_name: class_name.map(str::to_string),
            confidence,
        })
    }

    pub fn variance(slot_id: &str, score: f64) -> Self {
        Evidence::Variance(VarianceEvidence {
            slot_id: slot_id.to_string(),
            score,
        })
    }

    pub fn as_box(&self) -> Option<&BoxEvidence> {
        match self {
            Evidence::Box(b) => Some(b),
            Evidence::Variance(_) => None,
        }
    }
}
