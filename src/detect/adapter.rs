//! Turns detector output into engine evidence.
//!
//! Filtering happens here so the engine never sees a class it should ignore:
//! labels are matched case-insensitively against the allow-list, unlabeled
//! boxes pass only when the allow-list is empty, and boxes with non-finite
//! corners are dropped.

use crate::detect::evidence::Evidence;
use crate::detect::result::RawDetection;
use crate::error::{OccupancyError, Result};

pub const DEFAULT_ALLOWED_CLASSES: [&str; 5] = ["car", "truck", "bus", "motorcycle", "bicycle"];

/// Case-insensitive set of vehicle classes that count as occupancy evidence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassAllowList {
    classes: Vec<String>,
}

impl ClassAllowList {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = classes
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Accept every labeled and unlabeled box.
    pub fn allow_all() -> Self {
        Self {
            classes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn admits(&self, class_name: Option<&str>) -> bool {
        if self.classes.is_empty() {
            return true;
        }
        match class_name {
            Some(name) => {
                let name = name.trim().to_ascii_lowercase();
                self.classes.iter().any(|c| *c == name)
            }
            None => false,
        }
    }
}

impl Default for ClassAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_CLASSES)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DetectionAdapter {
    allow: ClassAllowList,
    min_confidence: f32,
}

impl DetectionAdapter {
    pub fn new(allow: ClassAllowList, min_confidence: f32) -> Result<Self> {
        if !min_confidence.is_finite() || !(0.0..=1.0).contains(&min_confidence) {
            return Err(OccupancyError::config(format!(
                "min_confidence must be within [0, 1], got {}",
                min_confidence
            )));
        }
        Ok(Self {
            allow,
            min_confidence,
        })
    }

    pub fn allow_list(&self) -> &ClassAllowList {
        &self.allow
    }

    /// Filter raw detections down to box evidence, preserving detector order.
    ///
    /// A detection without a confidence is kept regardless of
    /// `min_confidence`; the detector already applied its own threshold.
    pub fn to_evidence(&self, detections: Vec<RawDetection>) -> Vec<Evidence> {
        let total = detections.len();
        let evidence: Vec<Evidence> = detections
            .into_iter()
            .filter(|det| {
                if !det.bbox.is_finite() {
                    log::debug!("dropping detection with non-finite box {:?}", det.bbox);
                    return false;
                }
                if !self.allow.admits(det.class_name.as_deref()) {
                    log::debug!("dropping detection of class {:?}", det.class_name);
                    return false;
                }
                match det.confidence {
                    Some(conf) if conf < self.min_confidence => {
                        log::debug!("dropping detection with confidence {}", conf);
                        false
                    }
                    _ => true,
                }
            })
            .map(|det| {
                Evidence::boxed(det.bbox, det.class_name.as_deref(), det.confidence)
            })
            .collect();
        log::debug!("{} of {} detections kept as evidence", evidence.len(), total);
        evidence
    }
}

/// Wrap per-slot texture scores as evidence.
pub fn variance_evidence<I, S>(samples: I) -> Vec<Evidence>
where
    I: IntoIterator<Item = (S, f64)>,
    S: AsRef<str>,
{
    samples
        .into_iter()
        .map(|(slot_id, score)| Evidence::variance(slot_id.as_ref(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    #[test]
    fn allow_list_is_case_insensitive() {
        let allow = ClassAllowList::default();
        assert!(allow.admits(Some("Car")));
        assert!(allow.admits(Some(" TRUCK ")));
        assert!(!allow.admits(Some("person")));
        assert!(!allow.admits(None));
    }

    #[test]
    fn empty_allow_list_admits_unlabeled() {
        let allow = ClassAllowList::new(Vec::<String>::new());
        assert!(allow.is_empty());
        assert!(allow.admits(None));
        assert!(allow.admits(Some("person")));
    }

    #[test]
    fn filters_class_confidence_and_bad_boxes() {
        let adapter = DetectionAdapter::new(ClassAllowList::default(), 0.3).unwrap();
        let dets = vec![
            RawDetection::new(BoundingBox::new(0.0, 0.0, 4.0, 4.0), Some("car"), Some(0.9)),
            RawDetection::new(BoundingBox::new(0.0, 0.0, 4.0, 4.0), Some("car"), Some(0.1)),
            RawDetection::labeled(0.0, 0.0, 4.0, 4.0, "person"),
            RawDetection::labeled(0.0, 0.0, f64::NAN, 4.0, "bus"),
            RawDetection::new(BoundingBox::new(1.0, 1.0, 2.0, 2.0), None, None),
            RawDetection::labeled(8.0, 8.0, 2.0, 2.0, "Bicycle"),
        ];
        let evidence = adapter.to_evidence(dets);
        assert_eq!(evidence.len(), 2);
        let second = evidence[1].as_box().unwrap();
        assert_eq!(second.bbox, BoundingBox::new(2.0, 2.0, 8.0, 8.0));
        assert_eq!(second.class_name.as_deref(), Some("Bicycle"));
    }

    #[test]
    fn zero_detections_is_valid() {
        let adapter = DetectionAdapter::default();
        assert!(adapter.to_evidence(Vec::new()).is_empty());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(DetectionAdapter::new(ClassAllowList::default(), 1.5).is_err());
        assert!(DetectionAdapter::new(ClassAllowList::default(), f32::NAN).is_err());
    }

    #[test]
    fn wraps_variance_samples() {
        let evidence = variance_evidence(vec![("1", 12.5), ("2", 400.0)]);
        assert_eq!(evidence[1], Evidence::variance("2", 400.0));
    }
}
