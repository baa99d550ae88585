//! Embedded XMP packet extraction from band images.
//!
//! Extraction never fails: a missing, unreadable or foreign file yields an
//! empty packet, which later parses as "no metadata".

mod jpeg;
mod ifd;

#[cfg(test)]
mod tests;

use std::path::Path;

use ::image as image_lib;
use common::file_utils::{has_extension, TIFF_EXTENSIONS};

pub use jpeg::{find_xmp_segment, XMP_SIGNATURE};

/// Raw metadata found in an image container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    /// XMP packet text, empty when absent.
    pub text: String,
    /// Pixel dimensions read from the container headers.
    pub dimensions: Option<(usize, usize)>,
}

/// Read the XMP packet and frame size of the image at `path`.
///
/// TIFF files are read through the IFD (tag 700). A TIFF-named file that is
/// not a valid TIFF, and every other file, is scanned as a JPEG segment
/// stream; its dimensions come from the generic image header reader, which
/// sniffs the actual format.
pub fn extract_metadata(path: &Path) -> EmbeddedMetadata {
    if has_extension(path, TIFF_EXTENSIONS) {
        if let Some(meta) = ifd::read_tiff_metadata(path) {
            return meta;
        }
        log::debug!(
            "{} did not open as TIFF, scanning JPEG segments",
            path.display()
        );
    }

    let text = jpeg::read_jpeg_xmp(path).unwrap_or_default();
    let dimensions = image_lib::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .map(|(w, h)| (w as usize, h as usize));

    EmbeddedMetadata { text, dimensions }
}

/// Packet bytes to text; invalid UTF-8 is replaced and trailing NULs dropped.
pub(crate) fn packet_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}
