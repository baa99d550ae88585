use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::packet_to_string;

/// APP1 identifier of an XMP packet, including the terminating NUL.
pub const XMP_SIGNATURE: &[u8; 29] = b"http://ns.adobe.com/xap/1.0/\0";

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP1: u8 = 0xE1;

pub(super) fn read_jpeg_xmp(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    find_xmp_segment(&mut BufReader::new(file)).map(|bytes| packet_to_string(&bytes))
}

fn read_array<const N: usize, R: Read>(reader: &mut R) -> Option<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).ok()?;
    Some(buf)
}

/// Walk the marker segments of a JPEG stream and return the payload of the
/// first APP1 segment carrying the XMP signature.
///
/// Scanning stops at the start of scan or end of image, on a byte that is
/// not a marker prefix and on any short read.
pub fn find_xmp_segment<R: Read + Seek>(reader: &mut R) -> Option<Vec<u8>> {
    let soi: [u8; 2] = read_array(reader)?;
    if soi != [MARKER_PREFIX, SOI] {
        return None;
    }

    loop {
        let [prefix, marker] = read_array::<2, _>(reader)?;
        if prefix != MARKER_PREFIX {
            return None;
        }
        if marker == EOI || marker == SOS {
            return None;
        }

        let length = u16::from_be_bytes(read_array(reader)?) as usize;
        // The length field counts itself.
        let content_len = length.checked_sub(2)?;

        if marker == APP1 && content_len > XMP_SIGNATURE.len() {
            let signature: [u8; 29] = read_array(reader)?;
            let rest = content_len - XMP_SIGNATURE.len();
            if &signature == XMP_SIGNATURE {
                let mut packet = vec![0u8; rest];
                reader.read_exact(&mut packet).ok()?;
                return Some(packet);
            }
            reader.seek(SeekFrom::Current(rest as i64)).ok()?;
        } else {
            reader.seek(SeekFrom::Current(content_len as i64)).ok()?;
        }
    }
}
