use std::path::Path;

use tract_onnx::prelude::*;

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::RawDetection;
use crate::error::{OccupancyError, Result};
use crate::frame::Frame;
use crate::geometry::BoundingBox;
use crate::ingest::PixelFormat;

const DEFAULT_CONFIDENCE: f32 = 0.05;
const DEFAULT_NMS_IOU: f64 = 0.5;

/// Tract-based backend for YOLOv8-style ONNX detectors.
///
/// Expects one output shaped `[1, 4 + classes, anchors]` (or transposed),
/// where each anchor carries `cx, cy, w, h` in model input pixels followed by
/// per-class scores. Frames are resized nearest-neighbour to the model input
/// and boxes are mapped back to frame pixels.
pub struct TractBackend {
    model: RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>,
    input_width: u32,
    input_height: u32,
    class_names: Vec<String>,
    confidence_threshold: f32,
    nms_iou: f64,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_width: u32,
        input_height: u32,
        class_names: Vec<String>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(1, 3, input_height as usize, input_width as usize),
                    ),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                OccupancyError::Detector(format!(
                    "failed to load ONNX model from {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        Ok(Self {
            model,
            input_width,
            input_height,
            class_names,
            confidence_threshold: DEFAULT_CONFIDENCE,
            nms_iou: DEFAULT_NMS_IOU,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let (fw, fh) = (frame.width as usize, frame.height as usize);
        let (iw, ih) = (self.input_width as usize, self.input_height as usize);
        let pixels = frame.pixels();
        let format = frame.format;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, ih, iw), |(_, channel, y, x)| {
            let sx = (x * fw / iw).min(fw - 1);
            let sy = (y * fh / ih).min(fh - 1);
            let value = match format {
                PixelFormat::Rgb24 => pixels[(sy * fw + sx) * 3 + channel],
                PixelFormat::Gray8 => pixels[sy * fw + sx],
            };
            value as f32 / 255.0
        });
        input.into_tensor()
    }

    fn decode(&self, output: &Tensor, frame: &Frame) -> Result<Vec<RawDetection>> {
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| OccupancyError::Detector(format!("model output was not f32: {}", e)))?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .map_err(|e| OccupancyError::Detector(format!("unexpected output rank: {}", e)))?;
        let (_, a, b) = view.dim();
        // Anchors outnumber attributes; pick the layout accordingly.
        let transposed = a > b;
        let (attrs, anchors) = if transposed { (b, a) } else { (a, b) };
        if attrs < 5 {
            return Err(OccupancyError::Detector(format!(
                "output has {} attributes per anchor, need at least 5",
                attrs
            )));
        }
        let at = |attr: usize, anchor: usize| {
            if transposed {
                view[[0, anchor, attr]]
            } else {
                view[[0, attr, anchor]]
            }
        };

        let sx = frame.width as f64 / self.input_width as f64;
        let sy = frame.height as f64 / self.input_height as f64;
        let mut candidates: Vec<(usize, f32, BoundingBox)> = Vec::new();
        for anchor in 0..anchors {
            let mut best = (0usize, f32::NEG_INFINITY);
            for class in 0..attrs - 4 {
                let score = at(4 + class, anchor);
                if score > best.1 {
                    best = (class, score);
                }
            }
            if best.1 < self.confidence_threshold {
                continue;
            }
            let (cx, cy) = (at(0, anchor) as f64, at(1, anchor) as f64);
            let (w, h) = (at(2, anchor) as f64, at(3, anchor) as f64);
            let bbox = BoundingBox::new(
                (cx - w / 2.0) * sx,
                (cy - h / 2.0) * sy,
                (cx + w / 2.0) * sx,
                (cy + h / 2.0) * sy,
            );
            candidates.push((best.0, best.1, bbox));
        }

        candidates.sort_by(|x, y| y.1.total_cmp(&x.1));
        let mut kept: Vec<(usize, f32, BoundingBox)> = Vec::new();
        for cand in candidates {
            let suppressed = kept
                .iter()
                .any(|k| k.0 == cand.0 && box_iou(&k.2, &cand.2) > self.nms_iou);
            if !suppressed {
                kept.push(cand);
            }
        }

        Ok(kept
            .into_iter()
            .map(|(class, score, bbox)| {
                let name = self
                    .class_names
                    .get(class)
                    .cloned()
                    .unwrap_or_else(|| class.to_string());
                RawDetection {
                    bbox,
                    class_name: Some(name),
                    confidence: Some(score),
                }
            })
            .collect())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        match capability {
            DetectionCapability::ObjectBoxes => true,
            DetectionCapability::ClassLabels => !self.class_names.is_empty(),
        }
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| OccupancyError::Detector(format!("ONNX inference failed: {}", e)))?;
        let output = outputs
            .first()
            .ok_or_else(|| OccupancyError::Detector("model produced no outputs".into()))?;
        self.decode(output, frame)
    }
}

/// Intersection-over-union of two boxes in frame pixels.
fn box_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_overlapping_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((box_iou(&a, &b) - 50.0 / 150.0).abs() < 1e-12);
        assert_eq!(box_iou(&a, &BoundingBox::new(20.0, 20.0, 30.0, 30.0)), 0.0);
        assert_eq!(box_iou(&a, &a), 1.0);
    }
}
