//! Texture-variance fallback used when no box detector is available.
//!
//! An empty slot is mostly flat asphalt; a parked vehicle adds edges and
//! highlights. For each slot the luma of every pixel whose center lies
//! strictly inside the scaled polygon is collected, black pixels are skipped,
//! and the population variance of what remains becomes the slot's score.

use crate::detect::{variance_evidence as wrap_scores, Evidence};
use crate::frame::GrayFrame;
use crate::geometry::Point;
use crate::scale::ScaledSlot;

/// Population variance of the nonzero luma under `slot`, or `None` when no
/// such pixel exists.
pub fn slot_variance(gray: &GrayFrame, slot: &ScaledSlot) -> Option<f64> {
    let bounds = slot.polygon.bounds()?;
    if !bounds.is_finite() || gray.width == 0 || gray.height == 0 {
        return None;
    }
    let x_start = bounds.x1.floor().max(0.0) as u32;
    let y_start = bounds.y1.floor().max(0.0) as u32;
    let x_end = (bounds.x2.ceil().max(0.0) as u32).min(gray.width);
    let y_end = (bounds.y2.ceil().max(0.0) as u32).min(gray.height);

    let mut count = 0u64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in y_start..y_end {
        for x in x_start..x_end {
            let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if !slot.polygon.contains(center) {
                continue;
            }
            let Some(value) = gray.get(x, y) else {
                continue;
            };
            if value == 0 {
                continue;
            }
            let v = value as f64;
            count += 1;
            sum += v;
            sum_sq += v * v;
        }
    }
    if count == 0 {
        return None;
    }
    let n = count as f64;
    let mean = sum / n;
    Some((sum_sq / n - mean * mean).max(0.0))
}

/// Variance evidence for every usable slot. Slots with no measurable pixels
/// produce no evidence and therefore read as available.
pub fn variance_evidence(gray: &GrayFrame, slots: &[ScaledSlot]) -> Vec<Evidence> {
    let scores = slots.iter().filter_map(|slot| {
        if slot.degeneracy().is_some() {
            return None;
        }
        let score = slot_variance(gray, slot);
        if score.is_none() {
            log::debug!("slot '{}' has no measurable pixels", slot.slot_id);
        }
        score.map(|s| (slot.slot_id.as_str(), s))
    });
    wrap_scores(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn rect_slot(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> ScaledSlot {
        let polygon = BoundingBox::new(x1, y1, x2, y2).to_polygon();
        let area = polygon.area();
        ScaledSlot {
            slot_id: id.to_string(),
            polygon,
            area,
        }
    }

    fn checkerboard(width: u32, height: u32, lo: u8, hi: u8) -> GrayFrame {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| if (x + y) % 2 == 0 { lo } else { hi }))
            .collect();
        GrayFrame::from_raw(data, width, height).unwrap()
    }

    #[test]
    fn uniform_region_has_zero_variance() {
        let gray = GrayFrame::from_raw(vec![90; 16 * 16], 16, 16).unwrap();
        let slot = rect_slot("1", 2.0, 2.0, 10.0, 10.0);
        assert_eq!(slot_variance(&gray, &slot), Some(0.0));
    }

    #[test]
    fn checkerboard_variance_matches_population_formula() {
        // Half 50, half 250: mean 150, variance 100^2.
        let gray = checkerboard(16, 16, 50, 250);
        let slot = rect_slot("1", 0.0, 0.0, 8.0, 8.0);
        let v = slot_variance(&gray, &slot).unwrap();
        assert!((v - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn zero_pixels_are_ignored() {
        // Black/white checkerboard: only the 255s count, so the slot is flat.
        let gray = checkerboard(16, 16, 0, 255);
        let slot = rect_slot("1", 0.0, 0.0, 8.0, 8.0);
        assert_eq!(slot_variance(&gray, &slot), Some(0.0));

        let black = GrayFrame::from_raw(vec![0; 64], 8, 8).unwrap();
        assert_eq!(slot_variance(&black, &slot), None);
    }

    #[test]
    fn slot_outside_frame_has_no_score() {
        let gray = GrayFrame::from_raw(vec![90; 64], 8, 8).unwrap();
        let slot = rect_slot("far", 100.0, 100.0, 120.0, 120.0);
        assert_eq!(slot_variance(&gray, &slot), None);
        assert!(variance_evidence(&gray, &[slot]).is_empty());
    }

    #[test]
    fn evidence_per_measurable_slot() {
        let gray = checkerboard(20, 10, 50, 250);
        let slots = vec![
            rect_slot("1", 0.0, 0.0, 10.0, 10.0),
            rect_slot("2", 10.0, 0.0, 20.0, 10.0),
        ];
        let evidence = variance_evidence(&gray, &slots);
        assert_eq!(evidence.len(), 2);
        assert!(matches!(&evidence[1], Evidence::Variance(v) if v.slot_id == "2" && v.score > 300.0));
    }
}
