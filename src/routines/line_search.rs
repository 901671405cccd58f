//! Closed-form line search for the Frank-Wolfe step size
//!
//! Along the segment between the current iterate and a Frank-Wolfe vertex the dual
//! objective is a concave quadratic in the step size, so its maximizer is the ratio
//! of the directional derivative at zero to the curvature.

use ndarray::ArrayView1;

/// Floor added to the curvature to avoid dividing by zero when the vertex and
/// the current point (nearly) coincide
pub const CURVATURE_FLOOR: f64 = 1e-15;

/// Maximizer of the quadratic along the segment, clamped to `[0, 1]`
///
/// `f64::max` and `f64::min` discard a NaN operand, so a NaN ratio (e.g. from an
/// infinite curvature) yields 0.
pub fn step_size(numerator: f64, curvature: f64) -> f64 {
    let gamma = numerator / (curvature + CURVATURE_FLOOR);
    gamma.max(0.0).min(1.0)
}

/// Step size for moving the block `w_block` towards the vertex `ws`
///
/// `scale` converts the scalar accumulator to the units of the weight vector
/// (`C * n_samples` in the block-coordinate algorithm).
pub fn block_step_size(
    w: ArrayView1<f64>,
    w_block: ArrayView1<f64>,
    ws: ArrayView1<f64>,
    l_block: f64,
    ls: f64,
    scale: f64,
) -> f64 {
    let w_diff = &w_block - &ws;
    let numerator = w_diff.dot(&w) - scale * (l_block - ls);
    step_size(numerator, w_diff.dot(&w_diff))
}
