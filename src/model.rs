//! The structured model consumed by the solvers
//!
//! The solvers never look inside inputs or labels. Everything they need is obtained
//! through [StructuredModel]: joint feature maps, the structured loss and the two
//! flavours of inference. Batch methods come with default implementations that map
//! the single-sample versions over the data; models with a cheaper batched path can
//! override them.

use eyre::Result;
use ndarray::{Array1, ArrayView1};

/// A label carrying per-instance weights
///
/// Scores are normalized by the total weight of the true label, so that a label made
/// of many parts does not dominate one made of a few.
pub trait WeightedLabel {
    /// Must be positive and finite; scoring rejects any other value
    fn total_weight(&self) -> f64;
}

/// The most violated constraint for a single sample, as returned by
/// [StructuredModel::find_constraint]
#[derive(Debug, Clone)]
pub struct Constraint<L> {
    /// The loss-augmented prediction
    pub y_hat: L,
    /// `psi(x, y) - psi(x, y_hat)`
    pub delta_psi: Array1<f64>,
    /// `max(loss - w^T delta_psi, 0)`
    pub slack: f64,
    pub loss: f64,
}

pub trait StructuredModel {
    type Input;
    type Label: WeightedLabel + Clone;

    /// Prepare the model for the given data, e.g. infer the number of states
    fn initialize(&mut self, x: &[Self::Input], y: &[Self::Label]) -> Result<()>;

    /// Length of the joint feature vector, and therefore of the weight vector
    fn size_joint_feature(&self) -> usize;

    fn joint_feature(&self, x: &Self::Input, y: &Self::Label) -> Result<Array1<f64>>;

    /// Sum of the joint features over a batch
    fn batch_joint_feature(&self, x: &[Self::Input], y: &[Self::Label]) -> Result<Array1<f64>> {
        let mut psi = Array1::zeros(self.size_joint_feature());
        for (xi, yi) in x.iter().zip(y) {
            psi += &self.joint_feature(xi, yi)?;
        }
        Ok(psi)
    }

    fn loss(&self, y: &Self::Label, y_hat: &Self::Label) -> Result<f64>;

    fn batch_loss(&self, y: &[Self::Label], y_hat: &[Self::Label]) -> Result<Vec<f64>> {
        y.iter()
            .zip(y_hat)
            .map(|(yi, yi_hat)| self.loss(yi, yi_hat))
            .collect()
    }

    /// Find the label maximizing `w^T psi(x, y_hat) + loss(y, y_hat)`
    ///
    /// With `relaxed` set the model may return a fractional labelling, which keeps
    /// the duality gap a valid bound when the exact problem is only solved
    /// approximately.
    fn loss_augmented_inference(
        &self,
        x: &Self::Input,
        y: &Self::Label,
        w: ArrayView1<f64>,
        relaxed: bool,
    ) -> Result<Self::Label>;

    fn batch_loss_augmented_inference(
        &self,
        x: &[Self::Input],
        y: &[Self::Label],
        w: ArrayView1<f64>,
        relaxed: bool,
    ) -> Result<Vec<Self::Label>> {
        x.iter()
            .zip(y)
            .map(|(xi, yi)| self.loss_augmented_inference(xi, yi, w, relaxed))
            .collect()
    }

    /// Find the label maximizing `w^T psi(x, y)`
    fn inference(&self, x: &Self::Input, w: ArrayView1<f64>) -> Result<Self::Label>;

    fn batch_inference(&self, x: &[Self::Input], w: ArrayView1<f64>) -> Result<Vec<Self::Label>> {
        x.iter().map(|xi| self.inference(xi, w)).collect()
    }

    /// Loss-augmented inference on a single sample, together with the feature
    /// difference, slack and loss of the resulting constraint
    fn find_constraint(
        &self,
        x: &Self::Input,
        y: &Self::Label,
        w: ArrayView1<f64>,
    ) -> Result<Constraint<Self::Label>> {
        let y_hat = self.loss_augmented_inference(x, y, w, true)?;
        let delta_psi = self.joint_feature(x, y)? - self.joint_feature(x, &y_hat)?;
        let loss = self.loss(y, &y_hat)?;
        let slack = (loss - w.dot(&delta_psi)).max(0.0);
        Ok(Constraint {
            y_hat,
            delta_psi,
            slack,
            loss,
        })
    }
}
