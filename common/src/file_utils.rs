//! File utility functions for listing and filtering files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Supported TIFF file extensions.
pub const TIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// Supported JPEG file extensions.
pub const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Returns true if the path's extension is one of `extensions` (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Returns paths to all regular files directly inside `dir` whose extension
/// matches one of `extensions` (case-insensitive), sorted by file name.
///
/// The listing is non-recursive. Entries that cannot be inspected are skipped.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.is_file() && has_extension(path, extensions))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Returns paths to all TIFF and JPEG files in the given directory, sorted by file name.
pub fn band_image_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let extensions: Vec<&str> = TIFF_EXTENSIONS
        .iter()
        .chain(JPEG_EXTENSIONS.iter())
        .copied()
        .collect();
    files_with_extensions(dir, &extensions)
}
