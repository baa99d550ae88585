//! Photometric refinement of a metadata alignment.
//!
//! A [`Refiner`] estimates the residual homography between the reference
//! band and a band that was already warped by its metadata transform.

mod ecc;
mod filter;


pub use ecc::{EccParams, EccRefiner};

use crate::image::Plane;
use crate::transform::Transform;

/// Reason a refinement attempt was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineFailure {
    /// Reference and moving planes differ in size.
    DimensionMismatch,
    /// Too few overlapping pixels to estimate 8 parameters.
    InsufficientOverlap,
    /// One of the planes has no contrast inside the overlap.
    NoContrast,
    /// The Gauss-Newton system could not be solved.
    SingularHessian,
    /// The update would decrease the correlation.
    Diverged,
    /// The estimate is not a finite, invertible homography.
    DegenerateTransform,
}

impl std::fmt::Display for RefineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefineFailure::DimensionMismatch => write!(f, "reference and input sizes differ"),
            RefineFailure::InsufficientOverlap => write!(f, "insufficient overlap"),
            RefineFailure::NoContrast => write!(f, "no contrast in overlap"),
            RefineFailure::SingularHessian => write!(f, "singular Hessian"),
            RefineFailure::Diverged => {
                write!(f, "correlation would decrease, stopped before convergence")
            }
            RefineFailure::DegenerateTransform => write!(f, "degenerate transform"),
        }
    }
}

/// Result of one refinement attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineOutcome {
    Converged {
        /// Maps reference pixels into the metadata-aligned frame.
        transform: Transform,
        /// Enhanced correlation coefficient after the last iteration.
        correlation: f64,
        iterations: usize,
    },
    Failed {
        reason: RefineFailure,
    },
}

/// Photometric alignment of a moving plane onto a reference plane.
///
/// Both planes are single-channel intensity normalized to [0, 1] and share
/// the same dimensions. The returned transform is used with inverse mapping:
/// `moving(transform(p))` matches `reference(p)`.
pub trait Refiner: Send + Sync {
    fn refine(&self, reference: &Plane, moving: &Plane) -> RefineOutcome;
}
