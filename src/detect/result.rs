use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// One object reported by a detector, in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "DetectionRecord", into = "DetectionRecord")]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub class_name: Option<String>,
    pub confidence: Option<f32>,
}

impl RawDetection {
    pub fn new(bbox: BoundingBox, class_name: Option<&str>, confidence: Option<f32>) -> Self {
        Self {
            bbox,
            class_name: class_name.map(str::to_string),
            confidence,
        }
    }

    /// Box with a class label and no confidence.
    pub fn labeled(x1: f64, y1: f64, x2: f64, y2: f64, class_name: &str) -> Self {
        Self::new(BoundingBox::new(x1, y1, x2, y2), Some(class_name), None)
    }
}

/// Wire shape: `{"box": [x1, y1, x2, y2], "class_name": "car", "confidence": 0.9}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct DetectionRecord {
    #[serde(rename = "box")]
    bbox: [f64; 4],
    #[serde(default, alias = "cls", skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    #[serde(default, alias = "conf", skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
}

impl From<DetectionRecord> for RawDetection {
    fn from(record: DetectionRecord) -> Self {
        let [x1, y1, x2, y2] = record.bbox;
        Self {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            class_name: record.class_name,
            confidence: record.confidence,
        }
    }
}

impl From<RawDetection> for DetectionRecord {
    fn from(det: RawDetection) -> Self {
        Self {
            bbox: [det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2],
            class_name: det.class_name,
            confidence: det.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detector_wire_format() {
        let dets: Vec<RawDetection> = serde_json::from_str(
            r#"[{"box": [8, 8, 2, 2], "class_name": "car", "confidence": 0.9},
                {"box": [0, 0, 1, 1], "cls": "person"},
                {"box": [0, 0, 1, 1]}]"#,
        )
        .unwrap();
        assert_eq!(dets.len(), 3);
        assert_eq!(dets[0].bbox, BoundingBox::new(2.0, 2.0, 8.0, 8.0));
        assert_eq!(dets[0].confidence, Some(0.9));
        assert_eq!(dets[1].class_name.as_deref(), Some("person"));
        assert_eq!(dets[2].class_name, None);
    }
}
