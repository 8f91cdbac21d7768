use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Flat classifier input built from one or more landmark sets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, value: f32) {
        self.0.push(value);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Right-pad with zeros until `len` values are present.
    ///
    /// Never truncates: a vector already at or past `len` is left as is.
    pub fn pad_to(&mut self, len: usize) {
        if self.0.len() < len {
            self.0.resize(len, 0.0);
        }
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl Extend<f32> for FeatureVector {
    fn extend<T: IntoIterator<Item = f32>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_to_appends_zeros() {
        let mut v = FeatureVector::new(vec![1.0, 2.0]);
        v.pad_to(5);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pad_to_never_truncates() {
        let mut v = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        v.pad_to(2);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_serializes_as_array() {
        let v = FeatureVector::new(vec![0.5, 1.5]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[0.5,1.5]");
    }
}
