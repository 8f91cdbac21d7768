//! Landmark detectors.
//!
//! A detector takes a decoded image and returns zero or more landmark sets
//! with coordinates normalized to the image size. Order of sets and of points
//! within a set is defined by the detector and preserved downstream.
//!
//! The pipelines use [`RegionLandmarkDetector`]: a face or palm box detector
//! proposes regions and a single-instance landmark model runs on each crop.

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
mod proposer;
mod region;

use image::DynamicImage;
use mirror_models::{LandmarkKind, LandmarkSet};

use crate::error::VisionResult;

#[cfg(feature = "onnx")]
pub use onnx::{LandmarkModelConfig, OrtLandmarkDetector, PixelRange, TensorLayout};
#[cfg(feature = "onnx")]
pub use proposer::{BoxFormat, OrtRegionProposer, RegionModelConfig};
pub use region::{non_maximum_suppression, Region, RegionLandmarkDetector, RegionProposer, SquareCrop};
#[cfg(test)]
pub(crate) use region::MockRegionProposer;

/// Finds face or hand landmarks in an image.
#[cfg_attr(test, mockall::automock)]
pub trait LandmarkDetector: Send + Sync {
    /// What this detector finds.
    fn kind(&self) -> LandmarkKind;

    /// Detect landmark sets in the image. An empty vec means nothing found.
    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<LandmarkSet>>;
}
