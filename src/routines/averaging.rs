//! Iterate averaging for the block-coordinate solver
//!
//! Keeps a running convex combination of the iterate `(w, l)` with mixing weight
//! `rho = 2 / (k + 2)`, where `k` is the global step counter across all passes.
//! The first step (`k = 0`) therefore replaces the snapshot entirely.

use ndarray::{Array1, ArrayView1};

#[derive(Debug, Clone)]
pub struct Averager {
    w: Array1<f64>,
    l: f64,
}

impl Averager {
    /// Start from the snapshot `(w, l)`, which the first update replaces
    pub fn new(w: Array1<f64>, l: f64) -> Self {
        Self { w, l }
    }

    pub fn mixing_weight(k: usize) -> f64 {
        2.0 / (k as f64 + 2.0)
    }

    /// Blend the current iterate into the snapshot at global step `k`
    pub fn update(&mut self, w: ArrayView1<f64>, l: f64, k: usize) {
        let rho = Self::mixing_weight(k);
        self.w *= 1.0 - rho;
        self.w.scaled_add(rho, &w);
        self.l = (1.0 - rho) * self.l + rho * l;
    }

    pub fn w(&self) -> ArrayView1<f64> {
        self.w.view()
    }

    pub fn l(&self) -> f64 {
        self.l
    }

    pub fn into_w(self) -> Array1<f64> {
        self.w
    }
}
