//! Per-image calibration and alignment records.

pub mod parser;


use std::path::{Path, PathBuf};

use glam::DVec2;

use crate::math::DMat3;
use crate::metadata::{extract_metadata, EmbeddedMetadata};
use parser::*;

/// Lens calibration from `DewarpData`: focal lengths, principal-point
/// offset from the frame center, and Brown-Conrady coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DewarpParams {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

/// Everything known about one source image before its pixels are read.
///
/// Metadata-derived values stay `None` when the packet lacks them or they do
/// not parse; the accessors resolve absence to 0.0 or identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaptureRecord {
    pub path: PathBuf,
    pub file_name: String,
    /// Trimmed `CaptureUUID`, empty when none was found.
    pub capture_uuid: String,
    /// Frame size in pixels, 0 when undetermined.
    pub width: usize,
    pub height: usize,

    pub calibrated_cx: Option<f64>,
    pub calibrated_cy: Option<f64>,
    pub rel_x: Option<f64>,
    pub rel_y: Option<f64>,
    pub dewarp: Option<DewarpParams>,
    pub homography: Option<DMat3>,
}

impl CaptureRecord {
    /// Extract and parse the metadata of the image at `path`.
    pub fn load(path: &Path) -> Self {
        let meta = extract_metadata(path);
        let record = Self::from_metadata(path, &meta);
        log::debug!(
            "{}: uuid='{}', size={}x{}, rel=({}, {}), calibrated=({}, {}), dewarp={}, homography={}",
            record.file_name,
            record.capture_uuid,
            record.width,
            record.height,
            record.rel_x(),
            record.rel_y(),
            record.calibrated_cx(),
            record.calibrated_cy(),
            record.has_distortion(),
            record.has_homography(),
        );
        record
    }

    pub fn from_metadata(path: &Path, meta: &EmbeddedMetadata) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (width, height) = meta.dimensions.unwrap_or((0, 0));

        let mut record = Self {
            path: path.to_path_buf(),
            file_name,
            width,
            height,
            ..Default::default()
        };
        record.merge_packet(&meta.text);
        record
    }

    /// Fill fields from an XMP packet. Fields the packet does not provide
    /// are left as they are.
    pub fn merge_packet(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        if let Some(uuid) = find_value(text, KEY_CAPTURE_UUID) {
            self.capture_uuid = uuid.to_string();
        }

        let number = |key: &str| find_value(text, key).and_then(parse_f64);
        if let Some(v) = number(KEY_CALIBRATED_CENTER_X) {
            self.calibrated_cx = Some(v);
        }
        if let Some(v) = number(KEY_CALIBRATED_CENTER_Y) {
            self.calibrated_cy = Some(v);
        }
        if let Some(v) = number(KEY_RELATIVE_CENTER_X) {
            self.rel_x = Some(v);
        }
        if let Some(v) = number(KEY_RELATIVE_CENTER_Y) {
            self.rel_y = Some(v);
        }

        if let Some(dewarp) = find_value(text, KEY_DEWARP_DATA).and_then(parse_dewarp_data) {
            self.dewarp = Some(dewarp);
        }
        if let Some(h) = find_value(text, KEY_DEWARP_H_MATRIX).and_then(parse_h_matrix) {
            self.homography = Some(h);
        }
    }

    pub fn has_distortion(&self) -> bool {
        self.dewarp.is_some()
    }

    pub fn has_homography(&self) -> bool {
        self.homography.is_some()
    }

    pub fn has_capture_uuid(&self) -> bool {
        !self.capture_uuid.is_empty()
    }

    #[inline]
    pub fn rel_x(&self) -> f64 {
        self.rel_x.unwrap_or(0.0)
    }

    #[inline]
    pub fn rel_y(&self) -> f64 {
        self.rel_y.unwrap_or(0.0)
    }

    /// Optical-center offset relative to the reference band, in pixels.
    pub fn relative_offset(&self) -> DVec2 {
        DVec2::new(self.rel_x(), self.rel_y())
    }

    #[inline]
    pub fn calibrated_cx(&self) -> f64 {
        self.calibrated_cx.unwrap_or(0.0)
    }

    #[inline]
    pub fn calibrated_cy(&self) -> f64 {
        self.calibrated_cy.unwrap_or(0.0)
    }
}
