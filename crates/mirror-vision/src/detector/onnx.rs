//! ONNX Runtime landmark model for MediaPipe-style landmark networks.
//!
//! The model runs on whatever image it is given, resized to its square
//! input; in the pipelines that is a face or palm crop from
//! [`RegionLandmarkDetector`](super::RegionLandmarkDetector). Landmark
//! outputs are in input pixel space and are normalized back to `[0, 1]` by
//! dividing by the input size; `z` uses the same scale.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use image::DynamicImage;
use mirror_models::{Landmark, LandmarkKind, LandmarkSet};
use ort::session::Session;
use ort::value::{Tensor, Value};
use serde::Deserialize;
use tracing::{debug, info};

use super::LandmarkDetector;
use crate::error::{VisionError, VisionResult};
use crate::session::create_session;

/// How pixel values are scaled before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelRange {
    /// `[-1, 1]`
    SignedUnit,
    /// `[0, 1]`
    Unit,
}

impl PixelRange {
    fn scale(self, value: u8) -> f32 {
        let unit = value as f32 / 255.0;
        match self {
            PixelRange::SignedUnit => unit * 2.0 - 1.0,
            PixelRange::Unit => unit,
        }
    }
}

/// Input tensor memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    Nchw,
    Nhwc,
}

/// Description of a landmark model's inputs and outputs.
#[derive(Debug, Clone)]
pub struct LandmarkModelConfig {
    pub kind: LandmarkKind,
    /// Square input edge in pixels.
    pub input_size: u32,
    pub num_landmarks: usize,
    pub pixel_range: PixelRange,
    pub layout: TensorLayout,
    /// Output holding `num_landmarks * 3` coordinates.
    pub landmarks_output: String,
    /// Output holding the presence score, if the model has one.
    pub presence_output: Option<String>,
    /// Presence output is a logit rather than a probability.
    pub presence_is_logit: bool,
    pub presence_threshold: f32,
}

impl LandmarkModelConfig {
    /// MediaPipe face mesh: 192x192 input, 468 points.
    pub fn face() -> Self {
        Self {
            kind: LandmarkKind::Face,
            input_size: 192,
            num_landmarks: LandmarkKind::Face.default_points(),
            pixel_range: PixelRange::SignedUnit,
            layout: TensorLayout::Nchw,
            landmarks_output: "conv2d_21".to_string(),
            presence_output: Some("conv2d_31".to_string()),
            presence_is_logit: true,
            presence_threshold: 0.5,
        }
    }

    /// MediaPipe hand landmark: 224x224 input, 21 points.
    pub fn hand() -> Self {
        Self {
            kind: LandmarkKind::Hand,
            input_size: 224,
            num_landmarks: LandmarkKind::Hand.default_points(),
            pixel_range: PixelRange::Unit,
            layout: TensorLayout::Nchw,
            landmarks_output: "Identity".to_string(),
            presence_output: Some("Identity_1".to_string()),
            presence_is_logit: false,
            presence_threshold: 0.5,
        }
    }

    pub fn preset(kind: LandmarkKind) -> Self {
        match kind {
            LandmarkKind::Face => Self::face(),
            LandmarkKind::Hand => Self::hand(),
        }
    }

    /// Preset for `kind`, with overrides from `<model>.json` when present.
    pub fn for_model(model_path: &Path, kind: LandmarkKind) -> VisionResult<Self> {
        let mut config = Self::preset(kind);
        let sidecar = model_path.with_extension("json");
        if sidecar.exists() {
            let overrides: ModelOverrides =
                serde_json::from_str(&std::fs::read_to_string(&sidecar)?)?;
            overrides.apply(&mut config);
            debug!(path = %sidecar.display(), "Applied landmark model overrides");
        }
        Ok(config)
    }

    fn presence_probability(&self, raw: f32) -> f32 {
        if self.presence_is_logit {
            1.0 / (1.0 + (-raw).exp())
        } else {
            raw
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelOverrides {
    input_size: Option<u32>,
    num_landmarks: Option<usize>,
    pixel_range: Option<PixelRange>,
    layout: Option<TensorLayout>,
    landmarks_output: Option<String>,
    presence_output: Option<String>,
    presence_is_logit: Option<bool>,
    presence_threshold: Option<f32>,
}

impl ModelOverrides {
    fn apply(self, config: &mut LandmarkModelConfig) {
        if let Some(v) = self.input_size {
            config.input_size = v;
        }
        if let Some(v) = self.num_landmarks {
            config.num_landmarks = v;
        }
        if let Some(v) = self.pixel_range {
            config.pixel_range = v;
        }
        if let Some(v) = self.layout {
            config.layout = v;
        }
        if let Some(v) = self.landmarks_output {
            config.landmarks_output = v;
        }
        if self.presence_output.is_some() {
            config.presence_output = self.presence_output;
        }
        if let Some(v) = self.presence_is_logit {
            config.presence_is_logit = v;
        }
        if let Some(v) = self.presence_threshold {
            config.presence_threshold = v;
        }
    }
}

/// Single-instance landmark model backed by ONNX Runtime.
///
/// Yields at most one landmark set per image, normalized to that image.
pub struct OrtLandmarkDetector {
    session: Mutex<Session>,
    config: LandmarkModelConfig,
}

impl OrtLandmarkDetector {
    /// Load a model using the preset for `kind` plus any sidecar overrides.
    pub fn load(model_path: &Path, kind: LandmarkKind) -> VisionResult<Self> {
        let config = LandmarkModelConfig::for_model(model_path, kind)?;
        Self::with_config(model_path, config)
    }

    pub fn with_config(model_path: &Path, config: LandmarkModelConfig) -> VisionResult<Self> {
        let session = Mutex::new(create_session(model_path)?);
        info!(
            path = %model_path.display(),
            kind = %config.kind,
            input_size = config.input_size,
            num_landmarks = config.num_landmarks,
            "Landmark detector initialized"
        );
        Ok(Self { session, config })
    }

    pub fn config(&self) -> &LandmarkModelConfig {
        &self.config
    }

    fn preprocess(&self, image: &DynamicImage) -> VisionResult<Value> {
        image_tensor(
            image,
            self.config.input_size,
            self.config.pixel_range,
            self.config.layout,
        )
    }
}

impl LandmarkDetector for OrtLandmarkDetector {
    fn kind(&self) -> LandmarkKind {
        self.config.kind
    }

    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<LandmarkSet>> {
        let input = self.preprocess(image)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference(format!("ORT run failed: {e}")))?;

        let mut score = None;
        if let Some(name) = &self.config.presence_output {
            let output = outputs
                .get(name.as_str())
                .ok_or_else(|| VisionError::inference(format!("missing output '{name}'")))?;
            let (_, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::inference(format!("ORT extract: {e}")))?;
            let raw = data
                .first()
                .copied()
                .ok_or_else(|| VisionError::inference("empty presence output"))?;
            let probability = self.config.presence_probability(raw);
            if probability < self.config.presence_threshold {
                debug!(kind = %self.config.kind, probability, "Nothing detected");
                return Ok(Vec::new());
            }
            score = Some(probability);
        }

        let output = outputs
            .get(self.config.landmarks_output.as_str())
            .ok_or_else(|| {
                VisionError::inference(format!(
                    "missing output '{}'",
                    self.config.landmarks_output
                ))
            })?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("ORT extract: {e}")))?;

        let points = decode_landmarks(data, self.config.num_landmarks, self.config.input_size)?;
        let mut set = LandmarkSet::new(self.config.kind, points);
        if let Some(score) = score {
            set = set.with_score(score);
        }
        Ok(vec![set])
    }
}

/// Resize to a square `size` input and build the model tensor.
pub(super) fn image_tensor(
    image: &DynamicImage,
    size: u32,
    range: PixelRange,
    layout: TensorLayout,
) -> VisionResult<Value> {
    let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let edge = size as usize;

    let data = pixels_to_tensor_data(&rgb, range, layout);
    let shape = match layout {
        TensorLayout::Nchw => vec![1usize, 3, edge, edge],
        TensorLayout::Nhwc => vec![1usize, edge, edge, 3],
    };

    Tensor::from_array((shape, data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| VisionError::inference(format!("ORT tensor: {e}")))
}

fn pixels_to_tensor_data(rgb: &image::RgbImage, range: PixelRange, layout: TensorLayout) -> Vec<f32> {
    let (w, h) = rgb.dimensions();
    let mut data = Vec::with_capacity(3 * (w * h) as usize);
    match layout {
        TensorLayout::Nchw => {
            for c in 0..3 {
                for y in 0..h {
                    for x in 0..w {
                        data.push(range.scale(rgb.get_pixel(x, y)[c]));
                    }
                }
            }
        }
        TensorLayout::Nhwc => {
            for pixel in rgb.pixels() {
                data.extend(pixel.0.iter().map(|&v| range.scale(v)));
            }
        }
    }
    data
}

/// Turn a flat `[x, y, z, x, y, z, ...]` output into normalized landmarks.
fn decode_landmarks(data: &[f32], num_landmarks: usize, input_size: u32) -> VisionResult<Vec<Landmark>> {
    let needed = num_landmarks * 3;
    if data.len() < needed {
        return Err(VisionError::invalid_model(format!(
            "landmark output has {} values, expected {needed}",
            data.len()
        )));
    }
    let scale = input_size as f32;
    Ok(data[..needed]
        .chunks_exact(3)
        .map(|p| Landmark::new(p[0] / scale, p[1] / scale, p[2] / scale))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_presets() {
        let face = LandmarkModelConfig::face();
        assert_eq!(face.input_size, 192);
        assert_eq!(face.num_landmarks, 468);
        let hand = LandmarkModelConfig::preset(LandmarkKind::Hand);
        assert_eq!(hand.input_size, 224);
        assert_eq!(hand.num_landmarks, 21);
    }

    #[test]
    fn test_presence_logit() {
        let face = LandmarkModelConfig::face();
        assert!((face.presence_probability(0.0) - 0.5).abs() < 1e-6);
        let hand = LandmarkModelConfig::hand();
        assert_eq!(hand.presence_probability(0.8), 0.8);
    }

    #[test]
    fn test_decode_landmarks_normalizes() {
        let data = [96.0, 48.0, 24.0, 0.0, 192.0, -48.0];
        let points = decode_landmarks(&data, 2, 192).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Landmark::new(0.5, 0.25, 0.125));
        assert_eq!(points[1], Landmark::new(0.0, 1.0, -0.25));
    }

    #[test]
    fn test_decode_landmarks_too_short() {
        assert!(decode_landmarks(&[1.0, 2.0], 1, 192).is_err());
    }

    #[test]
    fn test_tensor_layouts() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));

        let chw = pixels_to_tensor_data(&rgb, PixelRange::Unit, TensorLayout::Nchw);
        assert_eq!(chw, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

        let hwc = pixels_to_tensor_data(&rgb, PixelRange::SignedUnit, TensorLayout::Nhwc);
        assert_eq!(hwc, vec![1.0, -1.0, -1.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_sidecar_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("hand.onnx");
        std::fs::write(
            dir.path().join("hand.json"),
            r#"{"input_size": 256, "landmarks_output": "landmarks"}"#,
        )
        .unwrap();
        let config = LandmarkModelConfig::for_model(&model, LandmarkKind::Hand).unwrap();
        assert_eq!(config.input_size, 256);
        assert_eq!(config.landmarks_output, "landmarks");
        assert_eq!(config.num_landmarks, 21);
    }

    #[test]
    fn test_missing_model() {
        assert!(matches!(
            OrtLandmarkDetector::load(Path::new("/missing/face.onnx"), LandmarkKind::Face),
            Err(VisionError::ModelNotFound(_))
        ));
    }
}
