use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ::image as image_lib;
use common::file_utils::{has_extension, JPEG_EXTENSIONS, TIFF_EXTENSIONS};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};

use super::{BandImage, ChannelLayout, SampleDepth};
use crate::error::{Error, Result};

/// Container format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ImageFormat {
    Tiff,
    Jpeg,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        if has_extension(path, TIFF_EXTENSIONS) {
            Some(ImageFormat::Tiff)
        } else if has_extension(path, JPEG_EXTENSIONS) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }
}

/// Decode a band image, keeping its channel layout and sample depth.
///
/// A TIFF-named file that is not a valid TIFF is retried through the
/// generic decoder with content sniffing.
pub fn load_image(path: &Path) -> Result<BandImage> {
    match ImageFormat::from_path(path) {
        Some(ImageFormat::Tiff) => load_tiff(path).or_else(|tiff_err| {
            log::debug!(
                "{} is not a readable TIFF ({tiff_err}), trying other decoders",
                path.display()
            );
            load_guessed(path).map_err(|_| tiff_err)
        }),
        Some(ImageFormat::Jpeg) => load_guessed(path),
        None => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: "unknown file extension".to_string(),
        }),
    }
}

/// Encode a band image into the container implied by the file extension.
pub fn save_image(image: &BandImage, path: &Path) -> Result<()> {
    match ImageFormat::from_path(path) {
        Some(ImageFormat::Tiff) => save_tiff(image, path),
        Some(ImageFormat::Jpeg) => save_jpeg(image, path),
        None => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: "unknown file extension".to_string(),
        }),
    }
}

fn decode_err(path: &Path, reason: impl ToString) -> Error {
    Error::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn encode_err(path: &Path, reason: impl ToString) -> Error {
    Error::Encode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn load_tiff(path: &Path) -> Result<BandImage> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Multispectral frames can exceed the default decoder limits.
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| decode_err(path, e))?
        .with_limits(Limits::unlimited());

    let layout = match decoder.colortype().map_err(|e| decode_err(path, e))? {
        tiff::ColorType::Gray(_) => ChannelLayout::Gray,
        tiff::ColorType::RGB(_) => ChannelLayout::Rgb,
        tiff::ColorType::RGBA(_) => ChannelLayout::Rgba,
        other => {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("TIFF color type {other:?}"),
            });
        }
    };

    let (w, h) = decoder.dimensions().map_err(|e| decode_err(path, e))?;
    let (width, height) = (w as usize, h as usize);

    let (depth, samples): (SampleDepth, Vec<f32>) =
        match decoder.read_image().map_err(|e| decode_err(path, e))? {
            DecodingResult::U8(buf) => (SampleDepth::U8, buf.iter().map(|&v| v as f32).collect()),
            DecodingResult::U16(buf) => {
                (SampleDepth::U16, buf.iter().map(|&v| v as f32).collect())
            }
            DecodingResult::F32(buf) => (SampleDepth::F32, buf),
            other => {
                return Err(Error::UnsupportedFormat {
                    path: path.to_path_buf(),
                    reason: format!("TIFF sample format {}", sample_kind(&other)),
                });
            }
        };

    if samples.len() != width * height * layout.channel_count() {
        return Err(decode_err(
            path,
            format!(
                "expected {} samples for {width}x{height} {layout}, got {}",
                width * height * layout.channel_count(),
                samples.len()
            ),
        ));
    }

    Ok(BandImage::from_interleaved(
        width, height, layout, depth, &samples,
    ))
}

fn sample_kind(result: &DecodingResult) -> &'static str {
    match result {
        DecodingResult::U8(_) => "u8",
        DecodingResult::U16(_) => "u16",
        DecodingResult::U32(_) => "u32",
        DecodingResult::U64(_) => "u64",
        DecodingResult::I8(_) => "i8",
        DecodingResult::I16(_) => "i16",
        DecodingResult::I32(_) => "i32",
        DecodingResult::I64(_) => "i64",
        DecodingResult::F16(_) => "f16",
        DecodingResult::F32(_) => "f32",
        DecodingResult::F64(_) => "f64",
    }
}

fn load_guessed(path: &Path) -> Result<BandImage> {
    let img = image_lib::ImageReader::open(path)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|e| decode_err(path, e))?;

    let (width, height) = (img.width() as usize, img.height() as usize);

    let image = match img.color() {
        image_lib::ColorType::L8 | image_lib::ColorType::La8 => {
            let buf = img.into_luma8();
            let samples: Vec<f32> = buf.as_raw().iter().map(|&v| v as f32).collect();
            BandImage::from_interleaved(
                width,
                height,
                ChannelLayout::Gray,
                SampleDepth::U8,
                &samples,
            )
        }
        image_lib::ColorType::L16 | image_lib::ColorType::La16 => {
            let buf = img.into_luma16();
            let samples: Vec<f32> = buf.as_raw().iter().map(|&v| v as f32).collect();
            BandImage::from_interleaved(
                width,
                height,
                ChannelLayout::Gray,
                SampleDepth::U16,
                &samples,
            )
        }
        _ => {
            let buf = img.into_rgb8();
            let samples: Vec<f32> = buf.as_raw().iter().map(|&v| v as f32).collect();
            BandImage::from_interleaved(width, height, ChannelLayout::Rgb, SampleDepth::U8, &samples)
        }
    };

    Ok(image)
}

fn save_tiff(image: &BandImage, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut encoder = TiffEncoder::new(file).map_err(|e| encode_err(path, e))?;

    let w = image.width() as u32;
    let h = image.height() as u32;
    let samples = image.to_interleaved();

    let result = match (image.layout(), image.depth()) {
        (ChannelLayout::Gray, SampleDepth::U8) => {
            encoder.write_image::<colortype::Gray8>(w, h, &to_u8(&samples))
        }
        (ChannelLayout::Gray, SampleDepth::U16) => {
            encoder.write_image::<colortype::Gray16>(w, h, &to_u16(&samples))
        }
        (ChannelLayout::Gray, SampleDepth::F32) => {
            encoder.write_image::<colortype::Gray32Float>(w, h, &samples)
        }
        (ChannelLayout::Rgb, SampleDepth::U8) => {
            encoder.write_image::<colortype::RGB8>(w, h, &to_u8(&samples))
        }
        (ChannelLayout::Rgb, SampleDepth::U16) => {
            encoder.write_image::<colortype::RGB16>(w, h, &to_u16(&samples))
        }
        (ChannelLayout::Rgb, SampleDepth::F32) => {
            encoder.write_image::<colortype::RGB32Float>(w, h, &samples)
        }
        (ChannelLayout::Rgba, SampleDepth::U8) => {
            encoder.write_image::<colortype::RGBA8>(w, h, &to_u8(&samples))
        }
        (ChannelLayout::Rgba, SampleDepth::U16) => {
            encoder.write_image::<colortype::RGBA16>(w, h, &to_u16(&samples))
        }
        (ChannelLayout::Rgba, SampleDepth::F32) => {
            encoder.write_image::<colortype::RGBA32Float>(w, h, &samples)
        }
    };

    result.map_err(|e| encode_err(path, e))
}

fn save_jpeg(image: &BandImage, path: &Path) -> Result<()> {
    if image.depth() != SampleDepth::U8 {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!("JPEG sample depth {}", image.depth()),
        });
    }

    let color_type = match image.layout() {
        ChannelLayout::Gray => image_lib::ColorType::L8,
        ChannelLayout::Rgb => image_lib::ColorType::Rgb8,
        ChannelLayout::Rgba => {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: "JPEG with alpha channel".to_string(),
            });
        }
    };

    let bytes = to_u8(&image.to_interleaved());
    image_lib::save_buffer_with_format(
        path,
        &bytes,
        image.width() as u32,
        image.height() as u32,
        color_type,
        image_lib::ImageFormat::Jpeg,
    )
    .map_err(|e| encode_err(path, e))
}

// Inputs are already quantized to the target range.
fn to_u8(samples: &[f32]) -> Vec<u8> {
    samples.iter().map(|&v| v as u8).collect()
}

fn to_u16(samples: &[f32]) -> Vec<u16> {
    samples.iter().map(|&v| v as u16).collect()
}
