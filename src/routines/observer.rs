//! Hook called by the solvers after every pass and once when they finish
//!
//! This is where checkpointing, progress bars or custom logging plug in. The
//! default [NoopObserver] does nothing, and any `FnMut(&Snapshot, Iteration)`
//! closure is an [Observer].

use ndarray::ArrayView1;
use std::fmt;

use crate::algorithms::Status;
use crate::routines::output::History;

/// Which point of the run a [Snapshot] was taken at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// After pass (block-coordinate) or iteration (batch) `p`, counting from zero
    Pass(usize),
    /// After the final objective has been recorded
    Final,
}

impl fmt::Display for Iteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Iteration::Pass(p) => write!(f, "{}", p),
            Iteration::Final => write!(f, "final"),
        }
    }
}

/// Read-only view of the solver state handed to an [Observer]
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// The exported weights (the averaged ones when averaging is on)
    pub w: ArrayView1<'a, f64>,
    pub status: &'a Status,
    pub history: &'a History,
    /// Number of block (or batch) updates performed so far
    pub steps: usize,
}

pub trait Observer {
    fn observe(&mut self, snapshot: &Snapshot<'_>, iteration: Iteration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&mut self, _snapshot: &Snapshot<'_>, _iteration: Iteration) {}
}

impl<F> Observer for F
where
    F: FnMut(&Snapshot<'_>, Iteration),
{
    fn observe(&mut self, snapshot: &Snapshot<'_>, iteration: Iteration) {
        self(snapshot, iteration)
    }
}
