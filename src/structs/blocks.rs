use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

/// Per-sample decomposition of the block-coordinate iterate
///
/// Row `i` of `w_mat` and entry `i` of `l_mat` hold the contribution of sample `i`
/// to the weight vector `w` and the scalar dual accumulator `l`. Every update goes
/// through [BlockWeights::update], which keeps `w == sum_i w_mat[i]` and
/// `l == sum_i l_mat[i]`.
///
/// Memory grows as `n_samples * n_features`.
#[derive(Debug, Clone, Serialize)]
pub struct BlockWeights {
    w: Array1<f64>,
    l: f64,
    w_mat: Array2<f64>,
    l_mat: Array1<f64>,
}

impl BlockWeights {
    pub fn zeros(n_samples: usize, n_features: usize) -> Self {
        Self {
            w: Array1::zeros(n_features),
            l: 0.0,
            w_mat: Array2::zeros((n_samples, n_features)),
            l_mat: Array1::zeros(n_samples),
        }
    }

    /// Spread `w` and `l` evenly over `n_samples` blocks
    pub fn spread(w: ArrayView1<f64>, l: f64, n_samples: usize) -> Self {
        let mut blocks = Self::zeros(n_samples, w.len());
        if n_samples == 0 {
            return blocks;
        }
        let share = &w / n_samples as f64;
        for mut row in blocks.w_mat.axis_iter_mut(Axis(0)) {
            row.assign(&share);
        }
        blocks.w = blocks.w_mat.sum_axis(Axis(0));
        blocks.l_mat.fill(l / n_samples as f64);
        blocks.l = blocks.l_mat.sum();
        blocks
    }

    pub fn n_samples(&self) -> usize {
        self.w_mat.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.w_mat.ncols()
    }

    pub fn w(&self) -> ArrayView1<f64> {
        self.w.view()
    }

    pub fn l(&self) -> f64 {
        self.l
    }

    pub fn w_mat(&self) -> ArrayView2<f64> {
        self.w_mat.view()
    }

    pub fn l_mat(&self) -> ArrayView1<f64> {
        self.l_mat.view()
    }

    pub fn w_block(&self, i: usize) -> ArrayView1<f64> {
        self.w_mat.row(i)
    }

    pub fn l_block(&self, i: usize) -> f64 {
        self.l_mat[i]
    }

    /// Move block `i` a fraction `gamma` of the way towards `(ws, ls)`
    pub fn update(&mut self, i: usize, ws: ArrayView1<f64>, ls: f64, gamma: f64) {
        let mut block = self.w_mat.row_mut(i);
        self.w -= &block;
        block *= 1.0 - gamma;
        block.scaled_add(gamma, &ws);
        self.w += &block;

        self.l -= self.l_mat[i];
        self.l_mat[i] = (1.0 - gamma) * self.l_mat[i] + gamma * ls;
        self.l += self.l_mat[i];
    }

    /// Largest relative deviation between the accumulators and the sum of their blocks
    pub fn decomposition_error(&self) -> f64 {
        let w_sum = self.w_mat.sum_axis(Axis(0));
        let w_scale = self.w.dot(&self.w).sqrt().max(1.0);
        let w_err = (&w_sum - &self.w)
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
            / w_scale;
        let l_err = (self.l_mat.sum() - self.l).abs() / self.l.abs().max(1.0);
        w_err.max(l_err)
    }
}
