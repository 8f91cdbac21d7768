//! Gesture recognizer binary.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mirror_models::{GestureLabels, LandmarkKind};
use mirror_vision::{
    load_classifier, GestureRecognizer, OrtLandmarkDetector, OrtRegionProposer,
    RegionLandmarkDetector, HAND_FEATURE_LEN,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mirror_gesture::{run, Args, FrameSource, ImageFiles};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let args = Args::parse();

    let palms = OrtRegionProposer::load(&args.palm_detector, LandmarkKind::Hand).with_context(|| {
        format!("failed to load palm detector {}", args.palm_detector.display())
    })?;
    let landmarker = OrtLandmarkDetector::load(&args.landmarker, LandmarkKind::Hand)
        .with_context(|| format!("failed to load hand landmarker {}", args.landmarker.display()))?;
    let detector = RegionLandmarkDetector::new(Arc::new(palms), Arc::new(landmarker), args.max_hands);
    let classifier = load_classifier(&args.classifier)
        .with_context(|| format!("failed to load classifier {}", args.classifier.display()))?;
    if classifier.n_features() != HAND_FEATURE_LEN {
        warn!(
            n_features = classifier.n_features(),
            expected = HAND_FEATURE_LEN,
            "Classifier width differs from the two-hand feature length"
        );
    }

    let labels = match &args.labels {
        Some(path) => GestureLabels::from_json_file(path)
            .with_context(|| format!("failed to load gesture labels {}", path.display()))?,
        None => GestureLabels::default(),
    };
    info!(gestures = labels.len(), "Gesture labels loaded");

    let recognizer = GestureRecognizer::new(Arc::new(detector), classifier, labels);

    let source = ImageFiles::from_inputs(&args.inputs)?;
    info!(frames = ?source.remaining(), limit = ?args.limit, "Starting gesture recognition");

    let summary = run(&recognizer, source, args.limit);
    info!(
        frames = summary.frames,
        recognized = summary.recognized,
        no_hands = summary.no_hands,
        errors = summary.errors,
        "Done"
    );
    Ok(())
}

/// Colored output by default, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("mirror=info".parse()?)
        .add_directive("gesture_recognize=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(env_filter)
            .init();
    }
    Ok(())
}
