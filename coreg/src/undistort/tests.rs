use glam::DVec2;

use super::*;
use crate::image::{Plane, SampleDepth};

fn model(coeffs: DistortionCoeffs) -> Undistortion {
    Undistortion::new(CameraMatrix::new(500.0, 500.0, 32.0, 24.0), coeffs)
}

#[test]
fn test_principal_point_is_fixed() {
    let m = model(DistortionCoeffs::new(-0.3, 0.1, 0.001, -0.002, 0.05));
    let p = m.source_position(DVec2::new(32.0, 24.0));
    assert!((p - DVec2::new(32.0, 24.0)).length() < 1e-12);
}

#[test]
fn test_radial_only_moves_along_ray() {
    let m = model(DistortionCoeffs::new(0.2, 0.0, 0.0, 0.0, 0.0));
    let dst = DVec2::new(132.0, 24.0);
    let src = m.source_position(dst);
    // x = 0.2, r² = 0.04, radial = 1.008
    assert!((src.x - (32.0 + 100.0 * 1.008)).abs() < 1e-9);
    assert!((src.y - 24.0).abs() < 1e-12);
}

#[test]
fn test_tangential_terms() {
    let c = DistortionCoeffs::new(0.0, 0.0, 0.01, 0.02, 0.0);
    let d = c.distort(DVec2::new(0.5, -0.25));
    let r2 = 0.25 + 0.0625;
    let xy2 = 2.0 * 0.5 * -0.25;
    assert!((d.x - (0.5 + 0.01 * xy2 + 0.02 * (r2 + 0.5))).abs() < 1e-12);
    assert!((d.y - (-0.25 + 0.01 * (r2 + 0.125) + 0.02 * xy2)).abs() < 1e-12);
}

#[test]
fn test_zero_coefficients_pass_through() {
    let pixels = (0..64 * 48).map(|v| (v % 200) as f32).collect();
    let img = BandImage::gray(Plane::new(64, 48, pixels), SampleDepth::U8);
    let out = undistort_image(
        &img,
        &model(DistortionCoeffs::default()),
        InterpolationMethod::Bilinear,
        0.0,
    );
    assert_eq!(out, img);
}

#[test]
fn test_undistort_keeps_shape_and_fills_border() {
    let img = BandImage::gray(Plane::new_filled(64, 48, 100.0), SampleDepth::U16);
    // Strong barrel term pushes the corners outside the raw frame.
    let m = Undistortion::new(
        CameraMatrix::new(40.0, 40.0, 32.0, 24.0),
        DistortionCoeffs::new(0.5, 0.0, 0.0, 0.0, 0.0),
    );
    let out = undistort_image(&img, &m, InterpolationMethod::Bilinear, 0.0);

    assert_eq!(out.dimensions(), (64, 48));
    assert_eq!(out.depth(), SampleDepth::U16);
    assert_eq!(out.planes()[0].get(32, 24), 100.0);
    assert_eq!(out.planes()[0].get(0, 0), 0.0);
}
