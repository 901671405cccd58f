//! Block-coordinate Frank-Wolfe (Algorithm 3 of Lacoste-Julien et al., 2013)
//!
//! Each step picks one sample, solves its loss-augmented inference problem and moves
//! only that sample's block of the dual variables towards the resulting vertex.
//! Steps read and write the shared iterate, so they run strictly one after another.

use eyre::Result;
use ndarray::{Array1, ArrayView1};
use rand::Rng;

use crate::algorithms::{Context, Status};
use crate::model::StructuredModel;
use crate::routines::averaging::Averager;
use crate::routines::duality_gap::duality_gap;
use crate::routines::line_search::block_step_size;
use crate::routines::observer::Iteration;
use crate::routines::sampling::SampleMethod;
use crate::routines::scoring::score;
use crate::routines::settings::Solver;
use crate::structs::blocks::BlockWeights;

/// State of the block-coordinate solver
pub(crate) struct BlockCoordinate {
    blocks: BlockWeights,
    averager: Option<Averager>,
    /// Global step counter, one increment per sample visit over all passes
    k: usize,
}

impl BlockCoordinate {
    pub fn new(blocks: BlockWeights, averager: Option<Averager>) -> Self {
        Self {
            blocks,
            averager,
            k: 0,
        }
    }

    /// The weights exposed to callers: the averaged iterate if averaging is on
    pub fn exported(&self) -> ArrayView1<f64> {
        match &self.averager {
            Some(averager) => averager.w(),
            None => self.blocks.w(),
        }
    }

    /// The scalar accumulator matching [BlockCoordinate::exported]
    pub fn exported_l(&self) -> f64 {
        match &self.averager {
            Some(averager) => averager.l(),
            None => self.blocks.l(),
        }
    }

    pub fn into_parts(self) -> (Array1<f64>, BlockWeights, usize) {
        let w = match self.averager {
            Some(averager) => averager.into_w(),
            None => self.blocks.w().to_owned(),
        };
        (w, self.blocks, self.k)
    }

    pub fn run<M: StructuredModel, R: Rng>(
        &mut self,
        ctx: &mut Context<'_, M>,
        sample_method: SampleMethod,
        rng: &mut R,
    ) -> Result<Status> {
        let solver = ctx.solver;
        let n_samples = ctx.x.len();

        for p in 0..solver.max_iter {
            let span = tracing::info_span!("", "{}", format!("Pass {}", p));
            let _enter = span.enter();

            for i in sample_method.order(n_samples, rng) {
                if ctx.stop.requested() {
                    tracing::info!("Stop requested after {} steps", self.k);
                    return Ok(Status::ManualStop);
                }
                block_step(
                    ctx.model,
                    &ctx.x[i],
                    &ctx.y[i],
                    i,
                    &mut self.blocks,
                    self.averager.as_mut(),
                    solver,
                    self.k,
                )?;
                self.k += 1;
            }

            ctx.observe(self.exported(), self.k, Iteration::Pass(p));

            if solver.show_loss_every != 0 && p % solver.show_loss_every == 0 {
                let loss = 1.0 - score(ctx.model, self.exported(), ctx.x, ctx.y)?;
                tracing::info!("Training loss: {:.6}", loss);
                ctx.history.push_loss(loss);
            }

            if solver.check_dual_every != 0 && p % solver.check_dual_every == 0 {
                let objective = duality_gap(
                    ctx.model,
                    ctx.x,
                    ctx.y,
                    self.exported(),
                    self.exported_l(),
                    solver.c,
                )?;
                let elapsed = ctx.elapsed();
                ctx.history.push_objective(objective, elapsed);
                let (train_score, test_score) = ctx.scores(self.exported())?;
                ctx.history.push_scores(train_score, test_score);
                tracing::info!(
                    "dual: {:.6}, dual_gap: {:.6}, primal: {:.6}",
                    objective.dual,
                    objective.gap,
                    objective.primal
                );
                if objective.gap < solver.tol {
                    return Ok(Status::Converged);
                }
            }
        }
        Ok(Status::MaxIterations)
    }
}

/// One block update on sample `i` at global step `k`, returning the step size
///
/// Removes the sample's old contribution from `w` and `l`, blends it with the new
/// vertex and adds it back, then folds the iterate into the average with
/// `rho = 2 / (k + 2)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn block_step<M: StructuredModel>(
    model: &M,
    x: &M::Input,
    y: &M::Label,
    i: usize,
    blocks: &mut BlockWeights,
    averager: Option<&mut Averager>,
    solver: &Solver,
    k: usize,
) -> Result<f64> {
    let n_samples = blocks.n_samples() as f64;
    let constraint = model.find_constraint(x, y, blocks.w())?;
    let ws = constraint.delta_psi * solver.c;
    let ls = constraint.loss / n_samples;

    let gamma = if solver.line_search {
        block_step_size(
            blocks.w(),
            blocks.w_block(i),
            ws.view(),
            blocks.l_block(i),
            ls,
            solver.c * n_samples,
        )
    } else {
        2.0 * n_samples / (k as f64 + 2.0 * n_samples)
    };
    tracing::trace!("k = {}, sample = {}, gamma = {:.6}", k, i, gamma);

    blocks.update(i, ws.view(), ls, gamma);
    if let Some(averager) = averager {
        averager.update(blocks.w(), blocks.l(), k);
    }
    Ok(gamma)
}
