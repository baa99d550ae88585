//! Homogeneous 2D transforms used by the alignment chain.
//!
//! Every transform here is applied with **inverse mapping**: for an output
//! pixel `p` the source sample position is `transform.apply(p)`. Composing
//! `a.compose(&b)` therefore yields a transform that first maps through `b`
//! and then through `a`, i.e. for `H_total = H_meta · H_ecc` a pixel of the
//! reference frame is mapped into the metadata-aligned frame by `H_ecc` and
//! from there back into the original frame by `H_meta`.

use glam::DVec2;

use crate::math::DMat3;

/// Kind of matrix a [`Transform`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum TransformType {
    /// Pure offset, also used for the identity.
    #[default]
    Translation,
    /// Full projective matrix.
    Homography,
}

/// A homography together with its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub matrix: DMat3,
    pub transform_type: TransformType,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.transform_type {
            TransformType::Translation => {
                let t = self.translation_components();
                write!(f, "Translation(dx={:.4}, dy={:.4})", t.x, t.y)
            }
            TransformType::Homography => write!(f, "Homography(\n{}\n)", self.matrix),
        }
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self::translation(DVec2::ZERO)
    }

    pub fn translation(t: DVec2) -> Self {
        Self {
            matrix: DMat3::from_array([1.0, 0.0, t.x, 0.0, 1.0, t.y, 0.0, 0.0, 1.0]),
            transform_type: TransformType::Translation,
        }
    }

    /// Wrap a full 3x3 homography without normalizing it.
    pub fn homography(matrix: DMat3) -> Self {
        Self {
            matrix,
            transform_type: TransformType::Homography,
        }
    }

    /// Map an output pixel position to its source sample position.
    ///
    /// `None` when the position maps to infinity.
    #[inline]
    pub fn apply(&self, p: DVec2) -> Option<DVec2> {
        self.matrix.transform_point(p)
    }

    /// `self * other`: `other` is applied first. Two translations stay a
    /// translation, anything else is a homography.
    pub fn compose(&self, other: &Self) -> Self {
        let transform_type = match (self.transform_type, other.transform_type) {
            (TransformType::Translation, TransformType::Translation) => TransformType::Translation,
            _ => TransformType::Homography,
        };
        Self {
            matrix: self.matrix.mul_mat(&other.matrix),
            transform_type,
        }
    }

    pub fn translation_components(&self) -> DVec2 {
        let m = self.matrix.as_array();
        DVec2::new(m[2], m[5])
    }

    /// Exact identity matrix, whatever the kind.
    pub fn is_identity(&self) -> bool {
        self.matrix.is_identity()
    }

    /// Finite and non-degenerate.
    pub fn is_valid(&self) -> bool {
        self.matrix.is_finite() && self.matrix.determinant().abs() > 1e-10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        let p = t.apply(DVec2::new(5.0, 7.0)).unwrap();
        assert_eq!(p, DVec2::new(5.0, 7.0));
        assert!(t.is_identity());
    }

    #[test]
    fn test_translation_transform() {
        let t = Transform::translation(DVec2::new(10.0, -5.0));
        let p = t.apply(DVec2::new(3.0, 4.0)).unwrap();
        assert!(approx_eq(p.x, 13.0));
        assert!(approx_eq(p.y, -1.0));
        assert_eq!(t.translation_components(), DVec2::new(10.0, -5.0));
    }

    #[test]
    fn test_compose_with_identity_is_exact() {
        let meta = Transform::translation(DVec2::new(5.0, -3.0));
        let total = meta.compose(&Transform::homography(DMat3::identity()));
        assert_eq!(total.matrix, meta.matrix);
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let meta = Transform::translation(DVec2::new(10.0, 0.0));
        let scale = Transform::homography(DMat3::from_array([
            2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0,
        ]));
        // meta(scale(p)) = 2p + (10, 0)
        let p = meta.compose(&scale).apply(DVec2::new(1.0, 1.0)).unwrap();
        assert!(approx_eq(p.x, 12.0));
        assert!(approx_eq(p.y, 2.0));
    }

    #[test]
    fn test_compose_keeps_translation_kind_only_for_two_translations() {
        let t = Transform::translation(DVec2::new(1.0, 2.0));
        let h = Transform::homography(DMat3::from_array([
            1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.001, 0.0, 1.0,
        ]));
        assert_eq!(t.compose(&h).transform_type, TransformType::Homography);
        assert_eq!(h.compose(&t).transform_type, TransformType::Homography);
        assert_eq!(t.compose(&t).transform_type, TransformType::Translation);
    }

    #[test]
    fn test_homography_perspective() {
        let t = Transform::homography(DMat3::from_array([
            1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.001, 0.0, 1.0,
        ]));
        let p = t.apply(DVec2::new(100.0, 0.0)).unwrap();
        assert!((p.x - 90.909).abs() < 0.01);
    }

    #[test]
    fn test_is_valid() {
        assert!(Transform::translation(DVec2::new(1.0, 2.0)).is_valid());
        let degenerate = Transform::homography(DMat3::from_array([0.0; 9]));
        assert!(!degenerate.is_valid());
        let nan = Transform::homography(DMat3::from_array([
            f64::NAN,
            0.0,
            0.0,
            0.0,
            1.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ]));
        assert!(!nan.is_valid());
    }

    #[test]
    fn test_display_translation() {
        let t = Transform::translation(DVec2::new(5.2, -3.1));
        assert_eq!(t.to_string(), "Translation(dx=5.2000, dy=-3.1000)");
    }
}
