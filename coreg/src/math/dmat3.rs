use std::fmt;

use glam::DVec2;

/// Row-major 3x3 homogeneous matrix.
///
/// `m[2]`/`m[5]` hold the translation, `m[6..9]` the perspective row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DMat3 {
    data: [f64; 9],
}

impl DMat3 {
    #[inline]
    pub const fn from_array(data: [f64; 9]) -> Self {
        Self { data }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self::from_array([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    #[inline]
    pub const fn as_array(&self) -> &[f64; 9] {
        &self.data
    }

    /// `self * rhs`: a point is mapped by `rhs` first.
    pub fn mul_mat(&self, rhs: &DMat3) -> DMat3 {
        let a = &self.data;
        let b = &rhs.data;
        let mut data = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                data[row * 3 + col] = (0..3).map(|k| a[row * 3 + k] * b[k * 3 + col]).sum();
            }
        }
        DMat3 { data }
    }

    pub fn determinant(&self) -> f64 {
        let d = &self.data;
        d[0] * (d[4] * d[8] - d[5] * d[7]) - d[1] * (d[3] * d[8] - d[5] * d[6])
            + d[2] * (d[3] * d[7] - d[4] * d[6])
    }

    /// Homogeneous point mapping; `None` when `w` vanishes.
    #[inline]
    pub fn transform_point(&self, p: DVec2) -> Option<DVec2> {
        let d = &self.data;
        let w = d[6] * p.x + d[7] * p.y + d[8];
        if w.abs() <= f64::EPSILON {
            return None;
        }
        Some(DVec2::new(
            (d[0] * p.x + d[1] * p.y + d[2]) / w,
            (d[3] * p.x + d[4] * p.y + d[5]) / w,
        ))
    }

    /// Exact, element-wise.
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl Default for DMat3 {
    fn default() -> Self {
        Self::identity()
    }
}

/// One row per line, for transform dumps in logs.
impl fmt::Display for DMat3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, values) in self.data.chunks(3).enumerate() {
            let sep = if row == 2 { "]" } else { ";\n " };
            let open = if row == 0 { "[" } else { "" };
            write!(
                f,
                "{open}{:.6}, {:.6}, {:.6}{sep}",
                values[0], values[1], values[2]
            )?;
        }
        Ok(())
    }
}
