use rayon::prelude::*;

/// Single-channel f32 raster, row-major.
///
/// Values keep the scale of the source samples (0..255 for 8-bit,
/// 0..65535 for 16-bit) so that an untouched plane converts back to the
/// original samples exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pixels: Vec<f32>,
    width: usize,
    height: usize,
}

impl Plane {
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn new_filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.pixels
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Smallest and largest finite value, `None` for an empty plane.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.pixels
            .par_iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(
                || None,
                |acc: Option<(f32, f32)>, v| match acc {
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                    None => Some((v, v)),
                },
            )
            .reduce(
                || None,
                |a, b| match (a, b) {
                    (Some((alo, ahi)), Some((blo, bhi))) => Some((alo.min(blo), ahi.max(bhi))),
                    (a, None) => a,
                    (None, b) => b,
                },
            )
    }

    /// Min-max normalize into [0, 1].
    ///
    /// A constant plane maps to all zeros.
    pub fn normalized(&self) -> Plane {
        let Some((lo, hi)) = self.min_max() else {
            return self.clone();
        };
        let range = hi - lo;
        let scale = if range > 0.0 { 1.0 / range } else { 0.0 };
        let pixels = self
            .pixels
            .par_iter()
            .map(|&v| (v - lo) * scale)
            .collect();
        Plane::new(self.width, self.height, pixels)
    }
}
