//! Enhanced Correlation Coefficient (ECC) maximization for homographies.
//!
//! Forward-additive Gauss-Newton on the zero-mean normalized correlation
//! between the reference (template) and the warped moving plane, following
//! Evangelidis & Psarakis, "Parametric Image Alignment Using Enhanced
//! Correlation Coefficient Maximization" (PAMI 2008).
//!
//! The warp has 8 parameters; `h[8]` stays fixed at 1. For a template pixel
//! `(x, y)` with `d = h6·x + h7·y + 1`, the moving frame position is
//! `((h0·x + h1·y + h2) / d, (h3·x + h4·y + h5) / d)`.

use glam::DVec2;
use nalgebra::{SMatrix, SVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::filter::{gaussian_blur, gradients};
use super::{RefineFailure, RefineOutcome, Refiner};
use crate::image::Plane;
use crate::interpolation::{interpolate_pixel, InterpolationMethod, ROWS_PER_CHUNK};
use crate::math::DMat3;
use crate::transform::Transform;

type Mat8 = SMatrix<f64, 8, 8>;
type Vec8 = SVector<f64, 8>;

/// Termination and smoothing parameters for the ECC search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EccParams {
    /// Iteration cap.
    pub max_iterations: usize,
    /// Stop when the correlation changes by less than this between iterations.
    pub epsilon: f64,
    /// Gaussian pre-blur kernel size (odd); 0 disables smoothing.
    pub gauss_kernel: usize,
}

impl Default for EccParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            epsilon: 1e-3,
            gauss_kernel: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EccRefiner {
    pub params: EccParams,
}

impl EccRefiner {
    pub fn new(params: EccParams) -> Self {
        Self { params }
    }
}

impl Refiner for EccRefiner {
    fn refine(&self, reference: &Plane, moving: &Plane) -> RefineOutcome {
        match find_transform_ecc(reference, moving, &self.params) {
            Ok((transform, correlation, iterations)) => RefineOutcome::Converged {
                transform,
                correlation,
                iterations,
            },
            Err(reason) => RefineOutcome::Failed { reason },
        }
    }
}

/// Moving-frame samples pulled back onto the template grid for one iteration.
struct WarpedSample {
    template: f32,
    image: f32,
    grad_x: f32,
    grad_y: f32,
    jacobian: [f64; 8],
}

/// Per-chunk sums needed for one Gauss-Newton step.
#[derive(Clone)]
struct Accumulator {
    count: usize,
    sum_t: f64,
    sum_i: f64,
    sum_tt: f64,
    sum_ii: f64,
    sum_ti: f64,
    hessian: Mat8,
    // Σ J·I, Σ J·T and Σ J on the raw (non zero-mean) values.
    jac_i: Vec8,
    jac_t: Vec8,
    jac: Vec8,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum_t: 0.0,
            sum_i: 0.0,
            sum_tt: 0.0,
            sum_ii: 0.0,
            sum_ti: 0.0,
            hessian: Mat8::zeros(),
            jac_i: Vec8::zeros(),
            jac_t: Vec8::zeros(),
            jac: Vec8::zeros(),
        }
    }

    fn add(&mut self, s: &WarpedSample) {
        let t = s.template as f64;
        let i = s.image as f64;
        let j = Vec8::from_row_slice(&s.jacobian);

        self.count += 1;
        self.sum_t += t;
        self.sum_i += i;
        self.sum_tt += t * t;
        self.sum_ii += i * i;
        self.sum_ti += t * i;
        self.hessian += j * j.transpose();
        self.jac_i += j * i;
        self.jac_t += j * t;
        self.jac += j;
    }

    fn merge(mut self, other: &Accumulator) -> Self {
        self.count += other.count;
        self.sum_t += other.sum_t;
        self.sum_i += other.sum_i;
        self.sum_tt += other.sum_tt;
        self.sum_ii += other.sum_ii;
        self.sum_ti += other.sum_ti;
        self.hessian += other.hessian;
        self.jac_i += other.jac_i;
        self.jac_t += other.jac_t;
        self.jac += other.jac;
        self
    }
}

fn warp_from_params(p: &[f64; 8]) -> DMat3 {
    DMat3::from_array([p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], 1.0])
}

/// Sample the moving plane and its gradients at the warped position of a
/// template pixel, `None` outside the moving frame.
#[inline]
fn warped_sample(
    x: usize,
    y: usize,
    warp: &DMat3,
    template: &Plane,
    image: &Plane,
    grad_x: &Plane,
    grad_y: &Plane,
) -> Option<WarpedSample> {
    let (xf, yf) = (x as f64, y as f64);
    let m = warp.as_array();
    let den = m[6] * xf + m[7] * yf + 1.0;
    if den.abs() <= f64::EPSILON {
        return None;
    }
    let inv_den = 1.0 / den;
    let p = DVec2::new(
        (m[0] * xf + m[1] * yf + m[2]) * inv_den,
        (m[3] * xf + m[4] * yf + m[5]) * inv_den,
    );

    let max_x = (image.width() - 1) as f64;
    let max_y = (image.height() - 1) as f64;
    if !(p.x >= 0.0 && p.y >= 0.0 && p.x <= max_x && p.y <= max_y) {
        return None;
    }

    let (sx, sy) = (p.x as f32, p.y as f32);
    let method = InterpolationMethod::Bilinear;
    let gx = interpolate_pixel(grad_x, sx, sy, method, 0.0);
    let gy = interpolate_pixel(grad_y, sx, sy, method, 0.0);
    let (gxd, gyd) = (gx as f64, gy as f64);

    let jacobian = [
        gxd * xf * inv_den,
        gxd * yf * inv_den,
        gxd * inv_den,
        gyd * xf * inv_den,
        gyd * yf * inv_den,
        gyd * inv_den,
        -(gxd * p.x + gyd * p.y) * xf * inv_den,
        -(gxd * p.x + gyd * p.y) * yf * inv_den,
    ];

    Some(WarpedSample {
        template: template.get(x, y),
        image: interpolate_pixel(image, sx, sy, method, 0.0),
        grad_x: gx,
        grad_y: gy,
        jacobian,
    })
}

/// Accumulate one iteration's sums.
///
/// Chunks are reduced in row order so the result does not depend on thread
/// scheduling.
fn accumulate(
    warp: &DMat3,
    template: &Plane,
    image: &Plane,
    grad_x: &Plane,
    grad_y: &Plane,
) -> Accumulator {
    let (width, height) = template.dimensions();
    let chunks: Vec<Accumulator> = (0..height.div_ceil(ROWS_PER_CHUNK))
        .into_par_iter()
        .map(|chunk_idx| {
            let mut acc = Accumulator::new();
            let start_y = chunk_idx * ROWS_PER_CHUNK;
            let end_y = (start_y + ROWS_PER_CHUNK).min(height);
            for y in start_y..end_y {
                for x in 0..width {
                    if let Some(s) = warped_sample(x, y, warp, template, image, grad_x, grad_y) {
                        if s.grad_x.is_finite() && s.grad_y.is_finite() && s.image.is_finite() {
                            acc.add(&s);
                        }
                    }
                }
            }
            acc
        })
        .collect();

    chunks
        .iter()
        .fold(Accumulator::new(), |total, chunk| total.merge(chunk))
}

/// Run the ECC search seeded at identity.
///
/// Returns the homography mapping template pixels into the moving frame,
/// the final correlation and the number of iterations run.
pub(crate) fn find_transform_ecc(
    template: &Plane,
    moving: &Plane,
    params: &EccParams,
) -> Result<(Transform, f64, usize), RefineFailure> {
    if template.dimensions() != moving.dimensions() {
        return Err(RefineFailure::DimensionMismatch);
    }
    let (width, height) = template.dimensions();
    if width < 3 || height < 3 {
        return Err(RefineFailure::InsufficientOverlap);
    }

    let template = gaussian_blur(template, params.gauss_kernel);
    let image = gaussian_blur(moving, params.gauss_kernel);
    let (grad_x, grad_y) = gradients(&image);

    let mut p = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
    let mut rho: f64 = -1.0;
    let mut last_rho = -params.epsilon;
    let mut iterations = 0;

    while iterations < params.max_iterations && (rho - last_rho).abs() >= params.epsilon {
        let warp = warp_from_params(&p);
        let acc = accumulate(&warp, &template, &image, &grad_x, &grad_y);
        if acc.count <= 8 {
            return Err(RefineFailure::InsufficientOverlap);
        }

        let n = acc.count as f64;
        let mean_t = acc.sum_t / n;
        let mean_i = acc.sum_i / n;

        // Zero-mean quantities over the overlap.
        let tmp_norm_sq = acc.sum_tt - n * mean_t * mean_t;
        let img_norm_sq = acc.sum_ii - n * mean_i * mean_i;
        let correlation = acc.sum_ti - n * mean_t * mean_i;
        if !(tmp_norm_sq > 0.0 && img_norm_sq > 0.0) {
            return Err(RefineFailure::NoContrast);
        }

        let image_projection = acc.jac_i - acc.jac * mean_i;
        let template_projection = acc.jac_t - acc.jac * mean_t;

        let hessian_inv = acc
            .hessian
            .try_inverse()
            .ok_or(RefineFailure::SingularHessian)?;

        last_rho = rho;
        rho = correlation / (img_norm_sq.sqrt() * tmp_norm_sq.sqrt());
        if !rho.is_finite() {
            return Err(RefineFailure::NoContrast);
        }

        let image_projection_hessian = hessian_inv * image_projection;
        let lambda_n = img_norm_sq - image_projection.dot(&image_projection_hessian);
        let lambda_d = correlation - template_projection.dot(&image_projection_hessian);
        if lambda_d <= 0.0 {
            return Err(RefineFailure::Diverged);
        }
        let lambda = lambda_n / lambda_d;

        // J^T (λ·T - I) on the zero-mean planes.
        let error_projection = template_projection * lambda - image_projection;
        let delta = hessian_inv * error_projection;
        for (pk, dk) in p.iter_mut().zip(delta.iter()) {
            *pk += dk;
        }

        iterations += 1;
    }

    let transform = Transform::homography(warp_from_params(&p));
    if !transform.is_valid() {
        return Err(RefineFailure::DegenerateTransform);
    }

    Ok((transform, rho, iterations))
}
