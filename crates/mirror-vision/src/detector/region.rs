//! Two-stage detection: a region proposer finds faces or palms, each region
//! is expanded to a square crop, and the landmark model runs on the crop.
//!
//! Crop-space landmarks are mapped back to coordinates normalized to the
//! full frame using a center-based transform, so clamping the crop at the
//! frame edge does not shift the points.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use mirror_models::{Landmark, LandmarkKind, LandmarkSet};
use tracing::debug;

use super::LandmarkDetector;
use crate::error::VisionResult;

/// Crops smaller than this many pixels on a side are skipped.
const MIN_CROP_PX: f32 = 8.0;

/// Box around a face or palm, normalized to the frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

impl Region {
    pub fn new(x: f32, y: f32, width: f32, height: f32, score: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            score,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection over union with another region.
    pub fn iou(&self, other: &Region) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Finds candidate face or palm regions in a frame.
#[cfg_attr(test, mockall::automock)]
pub trait RegionProposer: Send + Sync {
    /// Regions ordered best first.
    fn propose(&self, image: &DynamicImage) -> VisionResult<Vec<Region>>;
}

/// Greedy non-maximum suppression. Output is sorted by score, best first.
pub fn non_maximum_suppression(mut regions: Vec<Region>, iou_threshold: f32) -> Vec<Region> {
    regions.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Region> = Vec::with_capacity(regions.len());
    for region in regions {
        if keep.iter().all(|kept| kept.iou(&region) <= iou_threshold) {
            keep.push(region);
        }
    }
    keep
}

/// Square pixel crop inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareCrop {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl SquareCrop {
    /// Expand `region` by `pad_ratio`, square it around its center and clamp
    /// it to the frame. `None` when the result is too small to use.
    pub fn around(region: &Region, frame_width: u32, frame_height: u32, pad_ratio: f32) -> Option<Self> {
        let frame_w = frame_width as f32;
        let frame_h = frame_height as f32;

        let w = region.width * frame_w;
        let h = region.height * frame_h;
        let size = w.max(h) * (1.0 + pad_ratio);
        let center_x = region.x * frame_w + w / 2.0;
        let center_y = region.y * frame_h + h / 2.0;

        let mut x = center_x - size / 2.0;
        let mut y = center_y - size / 2.0;
        let mut s = size;

        if x < 0.0 {
            s += x;
            x = 0.0;
        }
        if y < 0.0 {
            s += y;
            y = 0.0;
        }
        if x + s > frame_w {
            s = frame_w - x;
        }
        if y + s > frame_h {
            s = frame_h - y;
        }

        if s < MIN_CROP_PX {
            return None;
        }

        let x = x.round() as u32;
        let y = y.round() as u32;
        let size = (s.round() as u32)
            .min(frame_width.saturating_sub(x))
            .min(frame_height.saturating_sub(y));
        Some(Self { x, y, size })
    }

    /// Map a crop-normalized landmark to frame-normalized coordinates.
    pub fn to_frame(&self, point: Landmark, frame_width: u32, frame_height: u32) -> Landmark {
        let size = self.size as f32;
        let center_x = self.x as f32 + size / 2.0;
        let center_y = self.y as f32 + size / 2.0;
        Landmark::new(
            (center_x + (point.x - 0.5) * size) / frame_width as f32,
            (center_y + (point.y - 0.5) * size) / frame_height as f32,
            point.z * size / frame_width as f32,
        )
    }
}

/// Landmark detector that runs a single-instance landmark model on each
/// proposed region.
///
/// Returns up to `max_instances` sets, in the proposer's order.
pub struct RegionLandmarkDetector {
    regions: Arc<dyn RegionProposer>,
    landmarks: Arc<dyn LandmarkDetector>,
    max_instances: usize,
    pad_ratio: f32,
}

impl RegionLandmarkDetector {
    /// Face crops are padded by a quarter; palm boxes cover only the palm
    /// and are grown to take in the fingers.
    pub fn new(
        regions: Arc<dyn RegionProposer>,
        landmarks: Arc<dyn LandmarkDetector>,
        max_instances: usize,
    ) -> Self {
        let pad_ratio = match landmarks.kind() {
            LandmarkKind::Face => 0.25,
            LandmarkKind::Hand => 1.6,
        };
        Self {
            regions,
            landmarks,
            max_instances,
            pad_ratio,
        }
    }

    pub fn with_pad_ratio(mut self, pad_ratio: f32) -> Self {
        self.pad_ratio = pad_ratio;
        self
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }
}

impl LandmarkDetector for RegionLandmarkDetector {
    fn kind(&self) -> LandmarkKind {
        self.landmarks.kind()
    }

    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<LandmarkSet>> {
        let (width, height) = image.dimensions();
        let regions = self.regions.propose(image)?;

        let mut sets = Vec::with_capacity(self.max_instances);
        for region in regions.iter().take(self.max_instances) {
            let Some(crop) = SquareCrop::around(region, width, height, self.pad_ratio) else {
                debug!(?region, "Region too small for landmarks");
                continue;
            };

            let patch = image.crop_imm(crop.x, crop.y, crop.size, crop.size);
            let Some(mut set) = self.landmarks.detect(&patch)?.into_iter().next() else {
                debug!(?region, "No landmarks in region");
                continue;
            };

            for point in &mut set.points {
                *point = crop.to_frame(*point, width, height);
            }
            sets.push(set);
        }
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::MockLandmarkDetector;
    use image::RgbImage;

    fn frame() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(200, 100))
    }

    fn proposer(regions: Vec<Region>) -> Arc<dyn RegionProposer> {
        let mut proposer = MockRegionProposer::new();
        proposer
            .expect_propose()
            .returning(move |_| Ok(regions.clone()));
        Arc::new(proposer)
    }

    fn hand_model(calls: usize) -> MockLandmarkDetector {
        let mut model = MockLandmarkDetector::new();
        model.expect_kind().return_const(LandmarkKind::Hand);
        model.expect_detect().times(calls).returning(|patch| {
            assert_eq!(patch.width(), patch.height());
            Ok(vec![LandmarkSet::new(
                LandmarkKind::Hand,
                vec![Landmark::new(0.5, 0.5, 0.1), Landmark::new(0.0, 0.0, 0.0)],
            )])
        });
        model
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 1e-5, "{actual} != {expected}");
    }

    #[test]
    fn test_square_crop_pads_around_center() {
        let region = Region::new(0.1, 0.2, 0.2, 0.4, 0.9);
        let crop = SquareCrop::around(&region, 200, 100, 0.25).unwrap();
        assert_eq!(crop, SquareCrop { x: 15, y: 15, size: 50 });
    }

    #[test]
    fn test_square_crop_clamps_to_frame() {
        let region = Region::new(0.0, 0.0, 0.2, 0.4, 0.9);
        let crop = SquareCrop::around(&region, 200, 100, 0.25).unwrap();
        assert_eq!((crop.x, crop.y), (0, 0));
        assert!(crop.size <= 100);
    }

    #[test]
    fn test_square_crop_rejects_tiny_region() {
        let region = Region::new(0.5, 0.5, 0.01, 0.01, 0.9);
        assert!(SquareCrop::around(&region, 200, 100, 0.25).is_none());
    }

    #[test]
    fn test_nms_keeps_best_of_overlapping() {
        let kept = non_maximum_suppression(
            vec![
                Region::new(0.0, 0.0, 0.2, 0.2, 0.6),
                Region::new(0.01, 0.01, 0.2, 0.2, 0.9),
                Region::new(0.6, 0.6, 0.2, 0.2, 0.7),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.7);
    }

    #[test]
    fn test_two_hands_mapped_to_frame_in_order() {
        let detector = RegionLandmarkDetector::new(
            proposer(vec![
                Region::new(0.1, 0.2, 0.2, 0.4, 0.95),
                Region::new(0.6, 0.2, 0.2, 0.4, 0.90),
            ]),
            Arc::new(hand_model(2)),
            2,
        )
        .with_pad_ratio(0.25);

        let hands = detector.detect(&frame()).unwrap();
        assert_eq!(hands.len(), 2);
        assert!(hands.iter().all(|h| h.kind == LandmarkKind::Hand));

        // Crop centers are (40, 40) and (140, 40), each 50px wide.
        assert_close(hands[0].points[0].x, 0.2);
        assert_close(hands[0].points[0].y, 0.4);
        assert_close(hands[0].points[0].z, 0.025);
        assert_close(hands[0].points[1].x, 0.075);
        assert_close(hands[0].points[1].y, 0.15);
        assert_close(hands[1].points[0].x, 0.7);
        assert_close(hands[1].points[0].y, 0.4);
    }

    #[test]
    fn test_extra_regions_are_ignored() {
        let detector = RegionLandmarkDetector::new(
            proposer(vec![
                Region::new(0.1, 0.2, 0.2, 0.4, 0.95),
                Region::new(0.6, 0.2, 0.2, 0.4, 0.90),
                Region::new(0.4, 0.5, 0.2, 0.4, 0.80),
            ]),
            Arc::new(hand_model(2)),
            2,
        );
        assert_eq!(detector.detect(&frame()).unwrap().len(), 2);
    }

    #[test]
    fn test_region_without_landmarks_is_skipped() {
        let mut model = MockLandmarkDetector::new();
        model.expect_kind().return_const(LandmarkKind::Face);
        model.expect_detect().returning(|_| Ok(Vec::new()));

        let detector = RegionLandmarkDetector::new(
            proposer(vec![Region::new(0.1, 0.2, 0.2, 0.4, 0.95)]),
            Arc::new(model),
            1,
        );
        assert!(detector.detect(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_no_regions_skips_landmark_model() {
        let mut model = MockLandmarkDetector::new();
        model.expect_kind().return_const(LandmarkKind::Face);
        model.expect_detect().never();

        let detector = RegionLandmarkDetector::new(proposer(Vec::new()), Arc::new(model), 1);
        assert!(detector.detect(&frame()).unwrap().is_empty());
        assert_eq!(detector.kind(), LandmarkKind::Face);
    }
}
