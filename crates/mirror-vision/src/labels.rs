//! Class index to label decoding.

use std::path::Path;

use serde::Deserialize;

use crate::error::{VisionError, VisionResult};

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    Wrapped { classes: Vec<String> },
    Bare(Vec<String>),
}

/// Maps classifier class indices back to the labels the model was trained on.
///
/// Files are either `{"classes": [...]}` or a bare JSON array, in the
/// order the encoder assigned indices.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> VisionResult<Self> {
        if classes.is_empty() {
            return Err(VisionError::invalid_model("label decoder has no classes"));
        }
        Ok(Self { classes })
    }

    pub fn from_json(json: &str) -> VisionResult<Self> {
        let classes = match serde_json::from_str::<LabelFile>(json)? {
            LabelFile::Wrapped { classes } | LabelFile::Bare(classes) => classes,
        };
        Self::new(classes)
    }

    pub fn from_file(path: impl AsRef<Path>) -> VisionResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VisionError::ModelNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn decode(&self, index: usize) -> VisionResult<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(VisionError::UnknownClass {
                index,
                classes: self.classes.len(),
            })
    }

    /// Fail unless the decoder has one label per classifier output.
    pub fn ensure_matches(&self, classes: usize) -> VisionResult<()> {
        if classes != self.classes.len() {
            return Err(VisionError::invalid_model(format!(
                "label decoder has {} classes but the classifier has {classes}",
                self.classes.len()
            )));
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped() {
        let decoder = LabelDecoder::from_json(r#"{"classes": ["angry", "happy", "sad"]}"#).unwrap();
        assert_eq!(decoder.decode(1).unwrap(), "happy");
        assert_eq!(decoder.len(), 3);
    }

    #[test]
    fn test_decode_bare_array() {
        let decoder = LabelDecoder::from_json(r#"["left", "right"]"#).unwrap();
        assert_eq!(decoder.decode(0).unwrap(), "left");
    }

    #[test]
    fn test_out_of_range() {
        let decoder = LabelDecoder::new(vec!["only".to_string()]).unwrap();
        assert!(matches!(
            decoder.decode(4),
            Err(VisionError::UnknownClass { index: 4, classes: 1 })
        ));
    }

    #[test]
    fn test_ensure_matches() {
        let decoder = LabelDecoder::new(vec!["good".to_string(), "slouch".to_string()]).unwrap();
        assert!(decoder.ensure_matches(2).is_ok());
        assert!(matches!(
            decoder.ensure_matches(3),
            Err(VisionError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(LabelDecoder::from_json("[]").is_err());
        assert!(matches!(
            LabelDecoder::from_file("/definitely/missing/labels.json"),
            Err(VisionError::ModelNotFound(_))
        ));
    }
}
