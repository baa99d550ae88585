//! Per-record transform construction: undistortion model and metadata
//! alignment.

use std::fmt;

use crate::record::CaptureRecord;
use crate::transform::Transform;
use crate::undistort::{CameraMatrix, DistortionCoeffs, Undistortion};

/// Lens model for a record, `None` when it carries no `DewarpData`.
///
/// The principal point is the frame center (or the calibrated optical
/// center when the frame size is unknown) shifted by the dewarp offset:
/// `cx = centerX - cx_d`, `cy = centerY + cy_d`. The opposite signs are how
/// the vendor encodes the offset.
pub fn undistortion_model(record: &CaptureRecord) -> Option<Undistortion> {
    let d = record.dewarp?;

    let center_x = if record.width > 0 {
        record.width as f64 / 2.0
    } else {
        record.calibrated_cx()
    };
    let center_y = if record.height > 0 {
        record.height as f64 / 2.0
    } else {
        record.calibrated_cy()
    };

    Some(Undistortion::new(
        CameraMatrix::new(d.fx, d.fy, center_x - d.cx, center_y + d.cy),
        DistortionCoeffs::new(d.k1, d.k2, d.p1, d.p2, d.k3),
    ))
}

/// `H_meta`: the explicit homography if present, else the relative
/// optical-center translation when it exceeds `translation_tolerance` on
/// either axis, else identity.
pub fn metadata_transform(record: &CaptureRecord, translation_tolerance: f64) -> Transform {
    if let Some(h) = record.homography {
        return Transform::homography(h);
    }

    let offset = record.relative_offset();
    if offset.x.abs() > translation_tolerance || offset.y.abs() > translation_tolerance {
        Transform::translation(offset)
    } else {
        Transform::identity()
    }
}

/// Transforms computed for one record. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformChain {
    pub undistortion: Option<Undistortion>,
    pub meta: Transform,
    pub ecc: Option<Transform>,
    pub total: Transform,
}

impl TransformChain {
    /// Chain without photometric refinement: `H_total = H_meta`.
    pub fn metadata_only(undistortion: Option<Undistortion>, meta: Transform) -> Self {
        Self {
            undistortion,
            meta,
            ecc: None,
            total: meta,
        }
    }

    /// `H_total = H_meta · H_ecc`.
    pub fn refined(undistortion: Option<Undistortion>, meta: Transform, ecc: Transform) -> Self {
        Self {
            undistortion,
            meta,
            ecc: Some(ecc),
            total: meta.compose(&ecc),
        }
    }
}

impl fmt::Display for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.undistortion {
            Some(u) => writeln!(
                f,
                "undistort: K=(fx={}, fy={}, cx={}, cy={}), D=({}, {}, {}, {}, {})",
                u.camera.fx,
                u.camera.fy,
                u.camera.cx,
                u.camera.cy,
                u.coeffs.k1,
                u.coeffs.k2,
                u.coeffs.p1,
                u.coeffs.p2,
                u.coeffs.k3
            )?,
            None => writeln!(f, "undistort: none")?,
        }
        writeln!(f, "H_meta: {}", self.meta)?;
        if let Some(ecc) = &self.ecc {
            writeln!(f, "H_ecc: {ecc}")?;
        }
        write!(f, "H_total: {}", self.total)
    }
}
