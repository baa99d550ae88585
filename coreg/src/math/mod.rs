//! Small fixed-size linear algebra used by the transform chain.

mod dmat3;

pub use dmat3::DMat3;
