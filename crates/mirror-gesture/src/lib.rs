//! Two-hand gesture recognition over a stream of frames.
//!
//! Frames come from a [`FrameSource`]; each one is run through the
//! [`GestureRecognizer`] and the result is logged. Per-frame failures are
//! logged and skipped.

pub mod args;
pub mod source;

use mirror_vision::{GestureRecognizer, VisionError};
use tracing::{info, warn};

pub use args::Args;
pub use source::{Frame, FrameSource, ImageFiles};

/// Counts over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub recognized: usize,
    pub no_hands: usize,
    pub errors: usize,
}

/// Process frames until the source ends or `limit` frames were seen.
pub fn run<S>(recognizer: &GestureRecognizer, source: S, limit: Option<usize>) -> RunSummary
where
    S: FrameSource,
{
    let mut summary = RunSummary::default();

    for item in source.take(limit.unwrap_or(usize::MAX)) {
        summary.frames += 1;

        let frame = match item {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Skipping unreadable frame");
                summary.errors += 1;
                continue;
            }
        };

        match recognizer.recognize(&frame.image) {
            Ok(reading) => {
                info!(
                    frame = frame.index,
                    source = %frame.name,
                    gesture = %reading.display,
                    hands = reading.hands,
                    "Gesture: {} | Hands detected: {}",
                    reading.display,
                    reading.hands
                );
                summary.recognized += 1;
            }
            Err(VisionError::NoDetection(_)) => {
                info!(frame = frame.index, source = %frame.name, "No hands detected");
                summary.no_hands += 1;
            }
            Err(e) => {
                warn!(
                    frame = frame.index,
                    source = %frame.name,
                    error = %e,
                    kind = e.kind(),
                    "Gesture recognition failed"
                );
                summary.errors += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use anyhow::anyhow;
    use image::{DynamicImage, RgbImage};
    use mirror_models::{GestureLabels, Landmark, LandmarkKind, LandmarkSet};
    use mirror_vision::{
        LandmarkDetector, LinearClassifier, VisionResult, HAND_FEATURE_LEN, HAND_LANDMARKS,
    };

    /// Finds one hand in frames wider than 2px, none otherwise.
    struct WidthHandDetector;

    impl LandmarkDetector for WidthHandDetector {
        fn kind(&self) -> LandmarkKind {
            LandmarkKind::Hand
        }

        fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<LandmarkSet>> {
            if image.width() <= 2 {
                return Ok(Vec::new());
            }
            let points = vec![Landmark::new(0.5, 0.5, 0.0); HAND_LANDMARKS];
            Ok(vec![LandmarkSet::new(LandmarkKind::Hand, points)])
        }
    }

    struct VecSource(std::vec::IntoIter<anyhow::Result<Frame>>);

    impl Iterator for VecSource {
        type Item = anyhow::Result<Frame>;

        fn next(&mut self) -> Option<Self::Item> {
            self.0.next()
        }
    }

    impl FrameSource for VecSource {
        fn remaining(&self) -> Option<usize> {
            Some(self.0.len())
        }
    }

    fn frame(index: u64, width: u32) -> anyhow::Result<Frame> {
        Ok(Frame {
            image: DynamicImage::ImageRgb8(RgbImage::new(width, 4)),
            index,
            name: format!("frame-{index}"),
        })
    }

    fn recognizer() -> GestureRecognizer {
        let classifier = LinearClassifier::new(
            vec!["thumbs_up".to_string(), "heart".to_string()],
            vec![vec![1.0; HAND_FEATURE_LEN], vec![0.0; HAND_FEATURE_LEN]],
            vec![0.0, 0.0],
        )
        .unwrap();
        GestureRecognizer::new(
            Arc::new(WidthHandDetector),
            Arc::new(classifier),
            GestureLabels::default(),
        )
    }

    #[test]
    fn test_run_counts_outcomes() {
        let source = VecSource(
            vec![
                frame(0, 8),
                frame(1, 2),
                Err(anyhow!("corrupt")),
                frame(3, 8),
            ]
            .into_iter(),
        );
        let summary = run(&recognizer(), source, None);
        assert_eq!(
            summary,
            RunSummary {
                frames: 4,
                recognized: 2,
                no_hands: 1,
                errors: 1,
            }
        );
    }

    #[test]
    fn test_run_respects_limit() {
        let source = VecSource(vec![frame(0, 8), frame(1, 8), frame(2, 8)].into_iter());
        let summary = run(&recognizer(), source, Some(2));
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.recognized, 2);
    }
}
