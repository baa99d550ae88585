use glam::DVec2;

use super::*;
use crate::image::SampleDepth;
use crate::math::DMat3;

fn warp_gray(
    plane: &Plane,
    transform: &Transform,
    method: InterpolationMethod,
    border: f32,
) -> Plane {
    let img = BandImage::gray(plane.clone(), SampleDepth::F32);
    warp_image(&img, transform, method, border).planes()[0].clone()
}

fn ramp(width: usize, height: usize) -> Plane {
    let pixels = (0..width * height)
        .map(|i| (i % width) as f32 * 10.0 + (i / width) as f32)
        .collect();
    Plane::new(width, height, pixels)
}

#[test]
fn test_bilinear_midpoint() {
    let plane = Plane::new(2, 2, vec![0.0, 10.0, 20.0, 30.0]);
    let v = interpolate_pixel(&plane, 0.5, 0.5, InterpolationMethod::Bilinear, 0.0);
    assert!((v - 15.0).abs() < 1e-6);
}

#[test]
fn test_out_of_bounds_uses_border() {
    let plane = Plane::new_filled(4, 4, 1.0);
    for method in [
        InterpolationMethod::Nearest,
        InterpolationMethod::Bilinear,
        InterpolationMethod::Bicubic,
    ] {
        assert_eq!(interpolate_pixel(&plane, -10.0, 2.0, method, 7.0), 7.0);
        assert_eq!(interpolate_pixel(&plane, f32::NAN, 2.0, method, 7.0), 7.0);
    }
}

#[test]
fn test_bicubic_reproduces_linear_ramp() {
    let plane = ramp(16, 16);
    let v = interpolate_pixel(&plane, 7.25, 6.5, InterpolationMethod::Bicubic, 0.0);
    assert!((v - (72.5 + 6.5)).abs() < 1e-3);
}

#[test]
fn test_identity_warp_is_exact() {
    let plane = ramp(37, 41);
    let out = warp_gray(
        &plane,
        &Transform::identity(),
        InterpolationMethod::Bicubic,
        0.0,
    );
    assert_eq!(out, plane);
}

#[test]
fn test_integer_translation_shifts_pixels() {
    let plane = ramp(40, 40);
    // src = dst + (3, -2)
    let t = Transform::translation(DVec2::new(3.0, -2.0));
    let out = warp_gray(&plane, &t, InterpolationMethod::Bilinear, -1.0);

    for y in 2..40 {
        for x in 0..37 {
            assert_eq!(out.get(x, y), plane.get(x + 3, y - 2));
        }
    }
    assert_eq!(out.get(0, 0), -1.0);
    assert_eq!(out.get(39, 10), -1.0);
}

#[test]
fn test_sample_map_spans_multiple_chunks() {
    let height = ROWS_PER_CHUNK * 2 + 5;
    let map = SampleMap::from_fn(3, height, |x, y| Some(DVec2::new(x as f64, y as f64)));
    assert_eq!(map.get(2, height - 1), [2.0, (height - 1) as f32]);
    assert_eq!(map.get(1, ROWS_PER_CHUNK), [1.0, ROWS_PER_CHUNK as f32]);
}

#[test]
fn test_point_at_infinity_maps_to_border() {
    // w = 1 - 0.1 * x vanishes at x = 10
    let h = Transform::homography(DMat3::from_array([
        1.0, 0.0, 0.0, 0.0, 1.0, 0.0, -0.1, 0.0, 1.0,
    ]));
    let plane = Plane::new_filled(12, 2, 5.0);
    let out = warp_gray(&plane, &h, InterpolationMethod::Nearest, 0.0);
    assert_eq!(out.get(10, 0), 0.0);
    assert_eq!(out.get(0, 0), 5.0);
}

#[test]
fn test_warp_image_shares_map_across_planes() {
    let img = BandImage::from_interleaved(
        8,
        8,
        crate::image::ChannelLayout::Rgb,
        SampleDepth::U8,
        &(0..8 * 8 * 3).map(|v| (v % 251) as f32).collect::<Vec<_>>(),
    );
    let t = Transform::translation(DVec2::new(1.0, 0.0));
    let out = warp_image(&img, &t, InterpolationMethod::Bilinear, 0.0);

    assert_eq!(out.dimensions(), (8, 8));
    assert_eq!(out.depth(), SampleDepth::U8);
    for c in 0..3 {
        assert_eq!(out.planes()[c].get(0, 3), img.planes()[c].get(1, 3));
        assert_eq!(out.planes()[c].get(7, 3), 0.0);
    }
}
