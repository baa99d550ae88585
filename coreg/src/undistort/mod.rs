//! Lens-distortion correction with the Brown-Conrady model.
//!
//! For a normalized camera coordinate `(x, y)` and `r² = x² + y²`:
//!
//! ```text
//! radial = 1 + k₁r² + k₂r⁴ + k₃r⁶
//! x' = x·radial + 2p₁xy + p₂(r² + 2x²)
//! y' = y·radial + p₁(r² + 2y²) + 2p₂xy
//! ```
//!
//! Undistortion is an inverse mapping: every corrected output pixel is
//! projected through the distortion model to find where it was recorded in
//! the raw frame. The same camera matrix serves as source and destination
//! camera, so the corrected frame keeps the raw frame's scale and center.

use glam::DVec2;

use crate::image::BandImage;
use crate::interpolation::{remap, InterpolationMethod, SampleMap};

#[cfg(test)]
mod tests;

/// Pinhole intrinsics: focal lengths and principal point in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrix {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraMatrix {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Zero focal lengths cannot normalize pixel coordinates.
    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx != 0.0
            && self.fy != 0.0
    }

    #[inline]
    fn normalize(&self, p: DVec2) -> DVec2 {
        DVec2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }

    #[inline]
    fn project(&self, p: DVec2) -> DVec2 {
        DVec2::new(p.x * self.fx + self.cx, p.y * self.fy + self.cy)
    }
}

/// Distortion vector in `(k1, k2, p1, p2, k3)` order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistortionCoeffs {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl DistortionCoeffs {
    pub fn new(k1: f64, k2: f64, p1: f64, p2: f64, k3: f64) -> Self {
        Self { k1, k2, p1, p2, k3 }
    }

    pub fn is_zero(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0 && self.p1 == 0.0 && self.p2 == 0.0 && self.k3 == 0.0
    }

    /// Apply the forward distortion model to a normalized coordinate.
    #[inline]
    pub fn distort(&self, p: DVec2) -> DVec2 {
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let xy2 = 2.0 * x * y;
        DVec2::new(
            x * radial + self.p1 * xy2 + self.p2 * (r2 + 2.0 * x * x),
            y * radial + self.p1 * (r2 + 2.0 * y * y) + self.p2 * xy2,
        )
    }
}

/// Undistortion model for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Undistortion {
    pub camera: CameraMatrix,
    pub coeffs: DistortionCoeffs,
}

impl Undistortion {
    pub fn new(camera: CameraMatrix, coeffs: DistortionCoeffs) -> Self {
        Self { camera, coeffs }
    }

    /// Raw-frame position recorded for the corrected pixel `p`.
    #[inline]
    pub fn source_position(&self, p: DVec2) -> DVec2 {
        let n = self.camera.normalize(p);
        self.camera.project(self.coeffs.distort(n))
    }

    /// Per-pixel source positions for a `width x height` frame.
    pub fn sample_map(&self, width: usize, height: usize) -> SampleMap {
        SampleMap::from_fn(width, height, |x, y| {
            let p = self.source_position(DVec2::new(x as f64, y as f64));
            p.is_finite().then_some(p)
        })
    }
}

/// Correct lens distortion, keeping dimensions, layout and sample depth.
///
/// Zero coefficients return the input unchanged.
pub fn undistort_image(
    image: &BandImage,
    model: &Undistortion,
    method: InterpolationMethod,
    border: f32,
) -> BandImage {
    if model.coeffs.is_zero() || !model.camera.is_valid() {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let map = model.sample_map(width, height);
    image.map_planes(|plane| remap(plane, &map, method, border))
}
