//! Display names for raw gesture labels.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

/// Display string for raw labels missing from the mapping.
pub const UNKNOWN_GESTURE: &str = "Unknown";

/// Gestures the stock two-hand model was trained on.
const DEFAULT_GESTURES: &[(&str, &str)] = &[
    ("victory", "Victory ✌️"),
    ("love", "Love 🤘"),
    ("open_palm", "Open Palm 🖐️"),
    ("pointing_up", "Pointing ☝️"),
    ("thumbs_up", "Thumbs Up 👍"),
    ("nice", "Nice 👌"),
    ("thumbs_down", "Thumbs Down 👎"),
    ("none", "None ❌"),
    ("closed_fist", "Closed Fist ✊"),
    ("heart", "Heart 🫶"),
];

#[derive(Debug, Error)]
pub enum GestureLabelsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid gesture label map: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Empty display name for gesture '{0}'")]
    EmptyDisplay(String),
}

/// Raw classifier label to display string mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureLabels {
    names: HashMap<String, String>,
}

impl Default for GestureLabels {
    fn default() -> Self {
        Self {
            names: DEFAULT_GESTURES
                .iter()
                .map(|(raw, display)| (raw.to_string(), display.to_string()))
                .collect(),
        }
    }
}

impl GestureLabels {
    /// Build from explicit pairs. Empty display names are rejected so a
    /// lookup never yields an empty string.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, GestureLabelsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut names = HashMap::new();
        for (raw, display) in pairs {
            let raw = raw.into();
            let display = display.into();
            if display.trim().is_empty() {
                return Err(GestureLabelsError::EmptyDisplay(raw));
            }
            names.insert(raw, display);
        }
        Ok(Self { names })
    }

    /// Parse a JSON object of `raw -> display`.
    pub fn from_json(json: &str) -> Result<Self, GestureLabelsError> {
        let names: HashMap<String, String> = serde_json::from_str(json)?;
        Self::from_pairs(names)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GestureLabelsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Display name for a raw label, falling back to [`UNKNOWN_GESTURE`].
    ///
    /// The fallback is the same text for every unmapped label, including a
    /// raw label that is itself `"Unknown"`.
    pub fn display(&self, raw: &str) -> &str {
        self.names
            .get(raw)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_GESTURE)
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.names.contains_key(raw)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
