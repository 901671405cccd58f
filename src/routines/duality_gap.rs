//! Batch duality gap and objective values
//!
//! The gap is the convergence signal of both solvers. Computing it costs one full
//! pass of loss-augmented inference, as much as a pass of the block-coordinate
//! solver, which is why it only runs every `check_dual_every` passes.

use eyre::Result;
use ndarray::ArrayView1;
use serde::Serialize;

use crate::model::StructuredModel;

/// Dual and primal objective at a check point, and the gap between them
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DualityGap {
    pub dual: f64,
    pub gap: f64,
    pub primal: f64,
}

/// Duality gap of the iterate `(w, l)`
///
/// `l` is the scalar dual accumulator in units of average loss; it is scaled by
/// `n_samples * c` here. Inference runs in relaxed mode so the gap stays a valid
/// bound for models whose exact inference is intractable.
pub fn duality_gap<M: StructuredModel>(
    model: &M,
    x: &[M::Input],
    y: &[M::Label],
    w: ArrayView1<f64>,
    l: f64,
    c: f64,
) -> Result<DualityGap> {
    let psi_gt = model.batch_joint_feature(x, y)?;
    let y_hat = model.batch_loss_augmented_inference(x, y, w, true)?;
    let delta_psi = psi_gt - model.batch_joint_feature(x, &y_hat)?;
    let ls: f64 = model.batch_loss(y, &y_hat)?.iter().sum();
    let ws = delta_psi * c;

    let dual = dual_objective(w, l, x.len(), c);
    let w_diff = &w - &ws;
    let gap = w_diff.dot(&w) - l * x.len() as f64 * c + ls * c;
    Ok(DualityGap {
        dual,
        gap,
        primal: dual + gap,
    })
}

/// Primal objective `c * sum_i max(slack_i, 0) + 1/2 ||w||^2` with the slacks of the
/// most violated constraints
pub fn primal_objective<M: StructuredModel>(
    model: &M,
    x: &[M::Input],
    y: &[M::Label],
    w: ArrayView1<f64>,
    c: f64,
) -> Result<f64> {
    let mut slack_sum = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        slack_sum += model.find_constraint(xi, yi, w)?.slack.max(0.0);
    }
    Ok(slack_sum.max(0.0) * c + 0.5 * w.dot(&w))
}

/// Dual objective `-1/2 ||w||^2 + l n c` without running inference
pub fn dual_objective(w: ArrayView1<f64>, l: f64, n_samples: usize, c: f64) -> f64 {
    -0.5 * w.dot(&w) + l * n_samples as f64 * c
}
