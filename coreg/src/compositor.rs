//! Output stage: hands aligned images to their destination.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::image::{save_image, BandImage};

/// Destination for aligned band images, keyed by source file name.
pub trait ImageSink: Send + Sync {
    fn write(&self, file_name: &str, image: &BandImage) -> Result<()>;
}

/// Writes each image into a directory under its original file name, using
/// the container implied by the extension.
#[derive(Debug, Clone)]
pub struct FileSink {
    dest_dir: PathBuf,
}

impl FileSink {
    /// Create the destination directory (and parents) if missing.
    pub fn create(dest_dir: &Path) -> Result<Self> {
        fs::create_dir_all(dest_dir).map_err(|source| Error::Io {
            path: dest_dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dest_dir: dest_dir.to_path_buf(),
        })
    }
}

impl ImageSink for FileSink {
    fn write(&self, file_name: &str, image: &BandImage) -> Result<()> {
        save_image(image, &self.dest_dir.join(file_name))
    }
}

/// Write one aligned image; failures are logged and reported as `false`.
pub fn emit(sink: &dyn ImageSink, file_name: &str, image: &BandImage) -> bool {
    match sink.write(file_name, image) {
        Ok(()) => {
            log::info!("  Saved {file_name}");
            true
        }
        Err(err) => {
            log::error!("  Failed to write {file_name}: {err}");
            false
        }
    }
}
