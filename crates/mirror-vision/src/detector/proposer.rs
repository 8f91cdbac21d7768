//! ONNX Runtime face and palm box detectors.
//!
//! The model takes the full frame resized to its square input and emits one
//! row per candidate: four box values in input pixels, then a score. Extra
//! trailing columns (keypoints) are ignored. Rows below the score threshold
//! are dropped and the rest go through non-maximum suppression.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use mirror_models::LandmarkKind;
use ort::session::Session;
use serde::Deserialize;
use tracing::{debug, info};

use super::onnx::{image_tensor, PixelRange, TensorLayout};
use super::region::{non_maximum_suppression, Region, RegionProposer};
use crate::error::{VisionError, VisionResult};
use crate::session::create_session;

/// Values before the score in each output row.
const BOX_VALUES: usize = 4;

/// How the four box values are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxFormat {
    /// `x1, y1, x2, y2`
    Corners,
    /// `cx, cy, w, h`
    Center,
}

/// Description of a box detector's input and output.
#[derive(Debug, Clone)]
pub struct RegionModelConfig {
    /// Square input edge in pixels.
    pub input_size: u32,
    pub pixel_range: PixelRange,
    pub layout: TensorLayout,
    pub boxes_output: String,
    pub box_format: BoxFormat,
    pub score_threshold: f32,
    /// IoU above which the weaker of two boxes is dropped.
    pub nms_threshold: f32,
}

impl RegionModelConfig {
    /// Short-range face detector: 128x128 input.
    pub fn face() -> Self {
        Self {
            input_size: 128,
            pixel_range: PixelRange::SignedUnit,
            layout: TensorLayout::Nchw,
            boxes_output: "detections".to_string(),
            box_format: BoxFormat::Corners,
            score_threshold: 0.5,
            nms_threshold: 0.3,
        }
    }

    /// Palm detector: 192x192 input.
    pub fn palm() -> Self {
        Self {
            input_size: 192,
            pixel_range: PixelRange::Unit,
            layout: TensorLayout::Nchw,
            boxes_output: "detections".to_string(),
            box_format: BoxFormat::Corners,
            score_threshold: 0.5,
            nms_threshold: 0.3,
        }
    }

    pub fn preset(kind: LandmarkKind) -> Self {
        match kind {
            LandmarkKind::Face => Self::face(),
            LandmarkKind::Hand => Self::palm(),
        }
    }

    /// Preset for `kind`, with overrides from `<model>.json` when present.
    pub fn for_model(model_path: &Path, kind: LandmarkKind) -> VisionResult<Self> {
        let mut config = Self::preset(kind);
        let sidecar = model_path.with_extension("json");
        if sidecar.exists() {
            let overrides: RegionOverrides =
                serde_json::from_str(&std::fs::read_to_string(&sidecar)?)?;
            overrides.apply(&mut config);
            debug!(path = %sidecar.display(), "Applied region model overrides");
        }
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegionOverrides {
    input_size: Option<u32>,
    pixel_range: Option<PixelRange>,
    layout: Option<TensorLayout>,
    boxes_output: Option<String>,
    box_format: Option<BoxFormat>,
    score_threshold: Option<f32>,
    nms_threshold: Option<f32>,
}

impl RegionOverrides {
    fn apply(self, config: &mut RegionModelConfig) {
        if let Some(v) = self.input_size {
            config.input_size = v;
        }
        if let Some(v) = self.pixel_range {
            config.pixel_range = v;
        }
        if let Some(v) = self.layout {
            config.layout = v;
        }
        if let Some(v) = self.boxes_output {
            config.boxes_output = v;
        }
        if let Some(v) = self.box_format {
            config.box_format = v;
        }
        if let Some(v) = self.score_threshold {
            config.score_threshold = v;
        }
        if let Some(v) = self.nms_threshold {
            config.nms_threshold = v;
        }
    }
}

/// Face or palm box detector backed by ONNX Runtime.
pub struct OrtRegionProposer {
    session: Mutex<Session>,
    config: RegionModelConfig,
}

impl OrtRegionProposer {
    /// Load a model using the preset for `kind` plus any sidecar overrides.
    pub fn load(model_path: &Path, kind: LandmarkKind) -> VisionResult<Self> {
        let config = RegionModelConfig::for_model(model_path, kind)?;
        Self::with_config(model_path, config)
    }

    pub fn with_config(model_path: &Path, config: RegionModelConfig) -> VisionResult<Self> {
        let session = Mutex::new(create_session(model_path)?);
        info!(
            path = %model_path.display(),
            input_size = config.input_size,
            score_threshold = config.score_threshold,
            "Region detector initialized"
        );
        Ok(Self { session, config })
    }

    pub fn config(&self) -> &RegionModelConfig {
        &self.config
    }
}

impl RegionProposer for OrtRegionProposer {
    fn propose(&self, image: &DynamicImage) -> VisionResult<Vec<Region>> {
        let input = image_tensor(
            image,
            self.config.input_size,
            self.config.pixel_range,
            self.config.layout,
        )?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference(format!("ORT run failed: {e}")))?;

        let output = outputs
            .get(self.config.boxes_output.as_str())
            .ok_or_else(|| {
                VisionError::inference(format!("missing output '{}'", self.config.boxes_output))
            })?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("ORT extract: {e}")))?;

        let row_len = shape.iter().last().copied().unwrap_or(0) as usize;
        let regions = decode_regions(data, row_len, &self.config)?;
        debug!(regions = regions.len(), "Regions proposed");
        Ok(regions)
    }
}

/// Turn raw detector rows into scored, suppressed, frame-normalized regions.
fn decode_regions(data: &[f32], row_len: usize, config: &RegionModelConfig) -> VisionResult<Vec<Region>> {
    if row_len <= BOX_VALUES {
        return Err(VisionError::invalid_model(format!(
            "box output rows have {row_len} values, expected at least {}",
            BOX_VALUES + 1
        )));
    }

    let scale = config.input_size as f32;
    let candidates = data
        .chunks_exact(row_len)
        .filter(|row| row[BOX_VALUES] >= config.score_threshold)
        .filter_map(|row| {
            let (x1, y1, x2, y2) = match config.box_format {
                BoxFormat::Corners => (row[0], row[1], row[2], row[3]),
                BoxFormat::Center => (
                    row[0] - row[2] / 2.0,
                    row[1] - row[3] / 2.0,
                    row[0] + row[2] / 2.0,
                    row[1] + row[3] / 2.0,
                ),
            };
            let x = (x1 / scale).clamp(0.0, 1.0);
            let y = (y1 / scale).clamp(0.0, 1.0);
            let width = (x2 / scale).clamp(0.0, 1.0) - x;
            let height = (y2 / scale).clamp(0.0, 1.0) - y;
            (width > 0.0 && height > 0.0).then(|| Region::new(x, y, width, height, row[BOX_VALUES]))
        })
        .collect();

    Ok(non_maximum_suppression(candidates, config.nms_threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(RegionModelConfig::preset(LandmarkKind::Face).input_size, 128);
        assert_eq!(RegionModelConfig::preset(LandmarkKind::Hand).input_size, 192);
    }

    #[test]
    fn test_decode_corner_rows() {
        let config = RegionModelConfig::palm();
        // Two hands, one weak candidate, one row with trailing keypoints.
        let data = [
            96.0, 48.0, 144.0, 96.0, 0.9, 0.0, //
            0.0, 0.0, 48.0, 48.0, 0.2, 0.0, //
            0.0, 96.0, 48.0, 192.0, 0.8, 7.0,
        ];
        let regions = decode_regions(&data, 6, &config).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], Region::new(0.5, 0.25, 0.25, 0.25, 0.9));
        assert_eq!(regions[1], Region::new(0.0, 0.5, 0.25, 0.5, 0.8));
    }

    #[test]
    fn test_decode_center_rows_clamped() {
        let config = RegionModelConfig {
            box_format: BoxFormat::Center,
            ..RegionModelConfig::face()
        };
        let regions = decode_regions(&[0.0, 64.0, 64.0, 64.0, 0.7], 5, &config).unwrap();
        assert_eq!(regions, vec![Region::new(0.0, 0.25, 0.25, 0.5, 0.7)]);
    }

    #[test]
    fn test_decode_suppresses_duplicates() {
        let config = RegionModelConfig::face();
        let data = [
            0.0, 0.0, 64.0, 64.0, 0.6, //
            2.0, 2.0, 64.0, 64.0, 0.9,
        ];
        let regions = decode_regions(&data, 5, &config).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].score, 0.9);
    }

    #[test]
    fn test_decode_rejects_short_rows() {
        assert!(decode_regions(&[1.0, 2.0, 3.0, 4.0], 4, &RegionModelConfig::face()).is_err());
    }

    #[test]
    fn test_sidecar_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("palm.onnx");
        std::fs::write(
            dir.path().join("palm.json"),
            r#"{"box_format": "center", "score_threshold": 0.7}"#,
        )
        .unwrap();
        let config = RegionModelConfig::for_model(&model, LandmarkKind::Hand).unwrap();
        assert_eq!(config.box_format, BoxFormat::Center);
        assert_eq!(config.score_threshold, 0.7);
        assert_eq!(config.input_size, 192);
    }

    #[test]
    fn test_missing_model() {
        assert!(matches!(
            OrtRegionProposer::load(Path::new("/missing/palm.onnx"), LandmarkKind::Hand),
            Err(VisionError::ModelNotFound(_))
        ));
    }
}
