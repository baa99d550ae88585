use std::fs;
use std::io::Cursor;

use ::image as image_lib;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use super::*;

const PACKET: &str = r#"<x:xmpmeta><rdf:Description drone-dji:CaptureUUID="abc"/></x:xmpmeta>"#;

fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn xmp_payload(text: &str) -> Vec<u8> {
    let mut payload = XMP_SIGNATURE.to_vec();
    payload.extend_from_slice(text.as_bytes());
    payload
}

fn stream(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    for s in segments {
        out.extend_from_slice(s);
    }
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

#[test]
fn test_finds_xmp_after_other_segments() {
    let bytes = stream(&[
        segment(0xE0, b"JFIF\0\x01\x02"),
        segment(0xE1, b"Exif\0\0 not xmp, but long enough to compare"),
        segment(0xE1, &xmp_payload(PACKET)),
    ]);
    let found = find_xmp_segment(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(found, PACKET.as_bytes());
}

#[test]
fn test_first_xmp_segment_wins() {
    let bytes = stream(&[
        segment(0xE1, &xmp_payload("first")),
        segment(0xE1, &xmp_payload("second")),
    ]);
    let found = find_xmp_segment(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(found, b"first");
}

#[test]
fn test_stops_at_start_of_scan() {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend(segment(0xDA, b"\x01\x02"));
    bytes.extend(segment(0xE1, &xmp_payload(PACKET)));
    assert_eq!(find_xmp_segment(&mut Cursor::new(bytes)), None);
}

#[test]
fn test_requires_soi() {
    let mut bytes = stream(&[segment(0xE1, &xmp_payload(PACKET))]);
    bytes[1] = 0xD9;
    assert_eq!(find_xmp_segment(&mut Cursor::new(bytes)), None);
}

#[test]
fn test_non_marker_byte_stops_scan() {
    let mut bytes = vec![0xFF, 0xD8, 0x00, 0x12];
    bytes.extend(segment(0xE1, &xmp_payload(PACKET)));
    assert_eq!(find_xmp_segment(&mut Cursor::new(bytes)), None);
}

#[test]
fn test_truncated_segment_is_empty() {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend(segment(0xE1, &xmp_payload(PACKET)));
    bytes.truncate(bytes.len() - 10);
    assert_eq!(find_xmp_segment(&mut Cursor::new(bytes)), None);
}

#[test]
fn test_tiff_tag_and_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("IMG_0001_1.TIF");

    let file = fs::File::create(&path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<colortype::Gray16>(6, 4).unwrap();
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(700), PACKET.as_bytes())
        .unwrap();
    image.write_data(&[0u16; 24]).unwrap();

    let meta = extract_metadata(&path);
    assert_eq!(meta.text, PACKET);
    assert_eq!(meta.dimensions, Some((6, 4)));
}

#[test]
fn test_tiff_without_tag_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.tif");

    let file = fs::File::create(&path).unwrap();
    TiffEncoder::new(file)
        .unwrap()
        .write_image::<colortype::Gray8>(3, 2, &[0u8; 6])
        .unwrap();

    let meta = extract_metadata(&path);
    assert!(meta.text.is_empty());
    assert_eq!(meta.dimensions, Some((3, 2)));
}

#[test]
fn test_jpeg_content_with_tiff_name_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("IMG_0001_2.tif");

    let mut encoded = Vec::new();
    image_lib::codecs::jpeg::JpegEncoder::new(&mut encoded)
        .encode(&[128u8; 8 * 5], 8, 5, image_lib::ExtendedColorType::L8)
        .unwrap();

    // Splice the XMP segment right after SOI.
    let mut bytes = encoded[..2].to_vec();
    bytes.extend(segment(0xE1, &xmp_payload(PACKET)));
    bytes.extend_from_slice(&encoded[2..]);
    fs::write(&path, bytes).unwrap();

    let meta = extract_metadata(&path);
    assert_eq!(meta.text, PACKET);
    assert_eq!(meta.dimensions, Some((8, 5)));
}

#[test]
fn test_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let meta = extract_metadata(&dir.path().join("nope.jpg"));
    assert_eq!(meta, EmbeddedMetadata::default());
}
