//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use mirror_vision::MAX_HANDS;

/// Recognize two-hand gestures in image frames.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// ONNX palm detector that locates each hand
    #[arg(long, value_name = "FILE")]
    pub palm_detector: PathBuf,

    /// ONNX hand landmark model, run on each palm crop
    #[arg(long, value_name = "FILE")]
    pub landmarker: PathBuf,

    /// Most hands to read per frame
    #[arg(long, value_name = "COUNT", default_value_t = MAX_HANDS)]
    pub max_hands: usize,

    /// Gesture classifier (`.onnx` with manifest, or linear `.json`)
    #[arg(long, value_name = "FILE")]
    pub classifier: PathBuf,

    /// JSON object mapping raw labels to display names
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Image files or directories of frames, processed in order
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,
}
