use rayon::prelude::*;

use crate::image::Plane;
use crate::interpolation::ROWS_PER_CHUNK;

/// Mirror an out-of-range index back into `0..len` without repeating the
/// edge sample (`gfedcb|abcdefgh|gfedcba`).
#[inline]
fn reflect101(i: isize, len: usize) -> usize {
    let n = len as isize;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

/// Separable Gaussian weights for an odd kernel size.
///
/// Sizes up to 7 use the binomial tables, larger sizes derive sigma from
/// the size as `0.3 * ((ksize - 1) / 2 - 1) + 0.8`.
pub(crate) fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    debug_assert!(ksize % 2 == 1);
    match ksize {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ],
        _ => {
            let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
            let half = (ksize / 2) as f64;
            let weights: Vec<f64> = (0..ksize)
                .map(|i| {
                    let d = i as f64 - half;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let sum: f64 = weights.iter().sum();
            weights.iter().map(|w| (w / sum) as f32).collect()
        }
    }
}

/// Convolve rows then columns with the same 1D kernel.
fn separable(input: &Plane, kernel: &[f32]) -> Plane {
    let (width, height) = input.dimensions();
    if width == 0 || height == 0 {
        return input.clone();
    }
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = Plane::new_filled(width, height, 0.0);
    horizontal
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out)| {
            let row = input.row(y);
            for (x, o) in out.iter_mut().enumerate() {
                *o = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * row[reflect101(x as isize + k as isize - radius, width)])
                    .sum();
            }
        });

    let mut output = Plane::new_filled(width, height, 0.0);
    output
        .pixels_mut()
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let start_y = chunk_idx * ROWS_PER_CHUNK;
            for (i, o) in chunk.iter_mut().enumerate() {
                let x = i % width;
                let y = (start_y + i / width) as isize;
                *o = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * horizontal.get(x, reflect101(y + k as isize - radius, height)))
                    .sum();
            }
        });
    output
}

/// Gaussian pre-smoothing. A kernel size of 0 or 1 leaves the plane as is.
pub(crate) fn gaussian_blur(input: &Plane, ksize: usize) -> Plane {
    if ksize <= 1 {
        return input.clone();
    }
    separable(input, &gaussian_kernel(ksize))
}

/// Central-difference gradients `0.5 * (I[x+1] - I[x-1])` in x and y.
pub(crate) fn gradients(input: &Plane) -> (Plane, Plane) {
    let (width, height) = input.dimensions();
    let mut gx = Plane::new_filled(width, height, 0.0);
    let mut gy = Plane::new_filled(width, height, 0.0);
    if width == 0 || height == 0 {
        return (gx, gy);
    }

    gx.pixels_mut()
        .par_chunks_mut(width)
        .zip(gy.pixels_mut().par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (row_x, row_y))| {
            let up = reflect101(y as isize - 1, height);
            let down = reflect101(y as isize + 1, height);
            for x in 0..width {
                let left = reflect101(x as isize - 1, width);
                let right = reflect101(x as isize + 1, width);
                row_x[x] = 0.5 * (input.get(right, y) - input.get(left, y));
                row_y[x] = 0.5 * (input.get(x, down) - input.get(x, up));
            }
        });

    (gx, gy)
}
