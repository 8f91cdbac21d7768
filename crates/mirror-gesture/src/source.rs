//! Frame sources.
//!
//! A frame source yields decoded frames in order. Decode failures are
//! yielded as errors for the caller to skip; they do not end the stream.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// One decoded frame.
pub struct Frame {
    pub image: DynamicImage,
    /// Position in the stream, from 0.
    pub index: u64,
    /// Where the frame came from, for logs.
    pub name: String,
}

/// An ordered stream of frames.
pub trait FrameSource: Iterator<Item = Result<Frame>> {
    /// Frames remaining, when known up front.
    fn remaining(&self) -> Option<usize>;
}

/// Frames read from image files on disk.
pub struct ImageFiles {
    paths: std::vec::IntoIter<PathBuf>,
    index: u64,
}

impl ImageFiles {
    /// Expand inputs into image paths. Directories contribute their image
    /// files sorted by name; files are taken as given.
    pub fn from_inputs(inputs: &[PathBuf]) -> Result<Self> {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let mut entries: Vec<PathBuf> = std::fs::read_dir(input)
                    .with_context(|| format!("cannot read directory {}", input.display()))?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| path.is_file() && is_image(path))
                    .collect();
                entries.sort();
                paths.extend(entries);
            } else if input.is_file() {
                paths.push(input.clone());
            } else {
                anyhow::bail!("input not found: {}", input.display());
            }
        }
        Ok(Self {
            paths: paths.into_iter(),
            index: 0,
        })
    }
}

impl Iterator for ImageFiles {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let index = self.index;
        self.index += 1;

        let name = path.display().to_string();
        Some(
            image::open(&path)
                .with_context(|| format!("cannot decode {name}"))
                .map(|image| Frame { image, index, name }),
        )
    }
}

impl FrameSource for ImageFiles {
    fn remaining(&self) -> Option<usize> {
        Some(self.paths.len())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
