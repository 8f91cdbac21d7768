//! Upload staging: how uploaded image bytes become a decoded image.
//!
//! In-memory decoding is the default. Disk staging writes the bytes to a
//! uniquely named file first; the file is removed when the guard drops, on
//! every exit path.

use std::io::Write;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::VisionResult;

const STAGED_PREFIX: &str = "temp_";
const STAGED_SUFFIX: &str = ".jpg";

/// Where uploads are decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStaging {
    /// Decode straight from the request bytes.
    #[default]
    Memory,
    /// Write to a scoped temp file in `dir`, then decode from disk.
    Disk { dir: PathBuf },
}

impl UploadStaging {
    pub fn disk(dir: impl Into<PathBuf>) -> Self {
        Self::Disk { dir: dir.into() }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStaging::Memory => "memory",
            UploadStaging::Disk { .. } => "disk",
        }
    }

    /// Decode uploaded bytes into an image.
    pub fn load_image(&self, bytes: &[u8]) -> VisionResult<DynamicImage> {
        match self {
            UploadStaging::Memory => Ok(image::load_from_memory(bytes)?),
            UploadStaging::Disk { dir } => {
                let staged = StagedUpload::write(dir, bytes)?;
                staged.decode()
            }
        }
    }
}

/// An upload written to disk. Deleted on drop.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Write `bytes` to a new uniquely named file in `dir`.
    pub fn write(dir: &Path, bytes: &[u8]) -> VisionResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(STAGED_SUFFIX)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!(path = %file.path().display(), size = bytes.len(), "Staged upload");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Decode the staged file, sniffing the format from its contents.
    pub fn decode(&self) -> VisionResult<DynamicImage> {
        let image = image::io::Reader::open(self.path())?
            .with_guessed_format()?
            .decode()?;
        Ok(image)
    }
}
