use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A detector-reported point with normalized coordinates.
///
/// `x` and `y` are relative to the image width and height; `z` uses the
/// same scale as `x` with the origin at the center of the head or wrist.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Coordinates as `[x, y, z]`.
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// What a landmark set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    Face,
    Hand,
}

impl LandmarkKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LandmarkKind::Face => "face",
            LandmarkKind::Hand => "hand",
        }
    }

    /// Landmarks per instance for the stock MediaPipe models.
    pub const fn default_points(&self) -> usize {
        match self {
            LandmarkKind::Face => 468,
            LandmarkKind::Hand => 21,
        }
    }
}

impl fmt::Display for LandmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered landmarks for one detected face or hand.
///
/// The order is defined by the detector and encodes which anatomical point
/// each entry is, so it is never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LandmarkSet {
    pub kind: LandmarkKind,
    pub points: Vec<Landmark>,
    /// Detector presence score for this instance, when the model reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl LandmarkSet {
    pub fn new(kind: LandmarkKind, points: Vec<Landmark>) -> Self {
        Self {
            kind,
            points,
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Landmark> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a LandmarkSet {
    type Item = &'a Landmark;
    type IntoIter = std::slice::Iter<'a, Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_string(&LandmarkKind::Hand).unwrap(), "\"hand\"");
        let kind: LandmarkKind = serde_json::from_str("\"face\"").unwrap();
        assert_eq!(kind, LandmarkKind::Face);
    }

    #[test]
    fn test_default_points() {
        assert_eq!(LandmarkKind::Face.default_points(), 468);
        assert_eq!(LandmarkKind::Hand.default_points(), 21);
    }

    #[test]
    fn test_set_skips_missing_score() {
        let set = LandmarkSet::new(LandmarkKind::Hand, vec![Landmark::new(0.1, 0.2, 0.3)]);
        let json = serde_json::to_value(&set).unwrap();
        assert!(json.get("score").is_none());

        let scored = set.with_score(0.9);
        assert_eq!(scored.score, Some(0.9));
        assert_eq!(scored.len(), 1);
    }
}
