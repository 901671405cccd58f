//! Batch Frank-Wolfe (Algorithm 2 of Lacoste-Julien et al., 2013)
//!
//! Mostly kept for reference and comparison: every iteration costs a full pass of
//! loss-augmented inference for a single update, which makes it far slower than the
//! block-coordinate solver.

use eyre::Result;
use ndarray::Array1;

use crate::algorithms::{Context, Status};
use crate::model::StructuredModel;
use crate::routines::duality_gap::{dual_objective, DualityGap};
use crate::routines::line_search::step_size;
use crate::routines::observer::Iteration;

pub(crate) struct Batch {
    w: Array1<f64>,
    /// Average loss of the current dual iterate
    l: f64,
    steps: usize,
}

impl Batch {
    pub fn new(w: Array1<f64>, l: f64) -> Self {
        Self { w, l, steps: 0 }
    }

    pub fn into_parts(self) -> (Array1<f64>, f64, usize) {
        (self.w, self.l, self.steps)
    }

    pub fn run<M: StructuredModel>(&mut self, ctx: &mut Context<'_, M>) -> Result<Status> {
        let solver = ctx.solver;
        let n_samples = ctx.x.len();
        let cn = solver.c * n_samples as f64;
        let psi_gt = ctx.model.batch_joint_feature(ctx.x, ctx.y)?;

        for k in 0..solver.max_iter {
            if ctx.stop.requested() {
                tracing::info!("Stop requested after {} iterations", k);
                return Ok(Status::ManualStop);
            }

            let y_hat = ctx
                .model
                .batch_loss_augmented_inference(ctx.x, ctx.y, self.w.view(), true)?;
            let ws = (&psi_gt - &ctx.model.batch_joint_feature(ctx.x, &y_hat)?) * solver.c;
            let ls = ctx.model.batch_loss(ctx.y, &y_hat)?.iter().sum::<f64>() / n_samples as f64;

            // Gap in units of average loss; the stopping rule uses this scale
            let w_diff = &self.w - &ws;
            let dual_gap = w_diff.dot(&self.w) / cn - self.l + ls;

            let gamma = if solver.line_search {
                step_size(dual_gap, w_diff.dot(&w_diff) / cn)
            } else {
                2.0 / (k as f64 + 2.0)
            };

            let dual = dual_objective(self.w.view(), self.l, n_samples, solver.c);
            let gap = dual_gap * cn;
            let elapsed = ctx.elapsed();
            ctx.history.push_objective(
                DualityGap {
                    dual,
                    gap,
                    primal: dual + gap,
                },
                elapsed,
            );
            tracing::info!(
                "k = {}, dual: {:.6}, dual_gap: {:.6}, primal: {:.6}, gamma: {:.6}",
                k,
                dual,
                gap,
                dual + gap,
                gamma
            );

            self.w *= 1.0 - gamma;
            self.w.scaled_add(gamma, &ws);
            self.l = (1.0 - gamma) * self.l + gamma * ls;
            self.steps += 1;

            ctx.observe(self.w.view(), self.steps, Iteration::Pass(k));

            if dual_gap < solver.tol {
                return Ok(Status::Converged);
            }
        }
        Ok(Status::MaxIterations)
    }
}
