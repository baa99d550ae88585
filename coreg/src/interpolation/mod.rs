//! Inverse-mapped resampling of band images.
//!
//! Every output pixel `(x, y)` looks up a source position and interpolates the
//! source plane there. Positions outside the source take the border value.
//!
//! # Interpolation Methods
//!
//! - **Nearest**: no interpolation.
//! - **Bilinear**: linear in both dimensions, the default.
//! - **Bicubic**: Catmull-Rom cubic convolution over a 4x4 neighborhood.

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::image::{BandImage, Plane};
use crate::transform::Transform;

/// Number of rows to process per parallel chunk.
pub(crate) const ROWS_PER_CHUNK: usize = 32;

#[cfg(test)]
mod tests;

/// Interpolation method for image warping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

/// Source sample position for every output pixel, row-major.
///
/// Built once per transform and reused for every channel plane.
/// Positions that cannot be mapped are stored as NaN and resolve to the
/// border value.
#[derive(Debug, Clone)]
pub struct SampleMap {
    coords: Vec<[f32; 2]>,
    width: usize,
    height: usize,
}

impl SampleMap {
    /// Build a map by evaluating `f` for every output pixel, in parallel rows.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> Option<DVec2> + Sync,
    {
        let mut coords = vec![[f32::NAN; 2]; width * height];
        if width > 0 {
            coords
                .par_chunks_mut(width * ROWS_PER_CHUNK)
                .enumerate()
                .for_each(|(chunk_idx, chunk)| {
                    let start_y = chunk_idx * ROWS_PER_CHUNK;
                    for (i, c) in chunk.iter_mut().enumerate() {
                        let x = i % width;
                        let y = start_y + i / width;
                        if let Some(p) = f(x, y) {
                            *c = [p.x as f32, p.y as f32];
                        }
                    }
                });
        }
        Self {
            coords,
            width,
            height,
        }
    }

    /// Inverse mapping through a homogeneous transform: `src = H * dst`.
    pub fn from_transform(width: usize, height: usize, transform: &Transform) -> Self {
        Self::from_fn(width, height, |x, y| {
            transform.apply(DVec2::new(x as f64, y as f64))
        })
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [f32; 2] {
        self.coords[y * self.width + x]
    }
}

/// Sample a pixel with bounds checking.
#[inline]
fn sample_pixel(data: &Plane, x: i32, y: i32, border: f32) -> f32 {
    if x < 0 || y < 0 || x >= data.width() as i32 || y >= data.height() as i32 {
        border
    } else {
        data.pixels()[y as usize * data.width() + x as usize]
    }
}

#[inline]
fn interpolate_nearest(data: &Plane, x: f32, y: f32, border: f32) -> f32 {
    sample_pixel(data, x.round() as i32, y.round() as i32, border)
}

#[inline]
fn interpolate_bilinear(data: &Plane, x: f32, y: f32, border: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = sample_pixel(data, x0, y0, border);
    if fx == 0.0 && fy == 0.0 {
        return p00;
    }
    let p10 = sample_pixel(data, x1, y0, border);
    let p01 = sample_pixel(data, x0, y1, border);
    let p11 = sample_pixel(data, x1, y1, border);

    let top = p00 + fx * (p10 - p00);
    let bottom = p01 + fx * (p11 - p01);

    top + fy * (bottom - top)
}

/// Bicubic kernel value (Catmull-Rom spline, a = -0.5).
#[inline]
pub(crate) fn bicubic_kernel(x: f32) -> f32 {
    const A: f32 = -0.5;

    let abs_x = x.abs();

    if abs_x <= 1.0 {
        ((A + 2.0) * abs_x - (A + 3.0)) * abs_x * abs_x + 1.0
    } else if abs_x < 2.0 {
        ((A * abs_x - 5.0 * A) * abs_x + 8.0 * A) * abs_x - 4.0 * A
    } else {
        0.0
    }
}

fn interpolate_bicubic(data: &Plane, x: f32, y: f32, border: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let wx = [
        bicubic_kernel(fx + 1.0),
        bicubic_kernel(fx),
        bicubic_kernel(fx - 1.0),
        bicubic_kernel(fx - 2.0),
    ];
    let wy = [
        bicubic_kernel(fy + 1.0),
        bicubic_kernel(fy),
        bicubic_kernel(fy - 1.0),
        bicubic_kernel(fy - 2.0),
    ];

    let mut sum = 0.0;
    for (j, &wyj) in wy.iter().enumerate() {
        let py = y0 - 1 + j as i32;
        for (i, &wxi) in wx.iter().enumerate() {
            let px = x0 - 1 + i as i32;
            sum += sample_pixel(data, px, py, border) * wxi * wyj;
        }
    }
    sum
}

/// Interpolate a single pixel at sub-pixel coordinates.
#[inline]
pub fn interpolate_pixel(
    data: &Plane,
    x: f32,
    y: f32,
    method: InterpolationMethod,
    border: f32,
) -> f32 {
    if !x.is_finite() || !y.is_finite() {
        return border;
    }
    match method {
        InterpolationMethod::Nearest => interpolate_nearest(data, x, y, border),
        InterpolationMethod::Bilinear => interpolate_bilinear(data, x, y, border),
        InterpolationMethod::Bicubic => interpolate_bicubic(data, x, y, border),
    }
}

/// Resample `input` at the positions stored in `map`.
///
/// The output has the map's dimensions.
pub fn remap(input: &Plane, map: &SampleMap, method: InterpolationMethod, border: f32) -> Plane {
    let (width, height) = map.dimensions();
    let mut output = Plane::new_filled(width, height, border);
    if width == 0 {
        return output;
    }

    output
        .pixels_mut()
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .zip(map.coords.par_chunks(width * ROWS_PER_CHUNK))
        .for_each(|(out, coords)| {
            for (o, &[sx, sy]) in out.iter_mut().zip(coords) {
                *o = interpolate_pixel(input, sx, sy, method, border);
            }
        });

    output
}

/// Warp every channel of `input` into an image of identical dimensions.
pub fn warp_image(
    input: &BandImage,
    transform: &Transform,
    method: InterpolationMethod,
    border: f32,
) -> BandImage {
    if transform.is_identity() {
        return input.clone();
    }
    let (width, height) = input.dimensions();
    let map = SampleMap::from_transform(width, height, transform);
    input.map_planes(|plane| remap(plane, &map, method, border))
}
