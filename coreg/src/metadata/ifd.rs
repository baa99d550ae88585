use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, Limits};
use tiff::tags::Tag;

use super::{packet_to_string, EmbeddedMetadata};

/// TIFF tag holding the XMP packet.
pub(crate) const XMP_TAG: u16 = 700;

/// `None` when the file does not open as a TIFF. A missing tag gives an
/// empty packet.
pub(super) fn read_tiff_metadata(path: &Path) -> Option<EmbeddedMetadata> {
    let file = File::open(path).ok()?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .ok()?
        .with_limits(Limits::unlimited());

    let dimensions = decoder
        .dimensions()
        .ok()
        .map(|(w, h)| (w as usize, h as usize));

    let text = match decoder.find_tag(Tag::from_u16_exhaustive(XMP_TAG)) {
        Ok(Some(value)) => value_bytes(value)
            .map(|bytes| packet_to_string(&bytes))
            .unwrap_or_default(),
        Ok(None) => String::new(),
        Err(err) => {
            log::debug!("{}: unreadable XMP tag: {err}", path.display());
            String::new()
        }
    };

    Some(EmbeddedMetadata { text, dimensions })
}

fn value_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::Ascii(s) => Some(s.into_bytes()),
        other => other.into_u8_vec().ok(),
    }
}
