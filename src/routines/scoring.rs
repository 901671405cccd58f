use eyre::Result;
use ndarray::ArrayView1;

use crate::error::Error;
use crate::model::{StructuredModel, WeightedLabel};

/// Accuracy-like score: `1 - mean(loss(y, y_pred) / y.total_weight())`
///
/// Predictions come from plain inference with `w`. The score is at most 1 and has
/// no lower bound. A label whose total weight is not positive is an error.
pub fn score<M: StructuredModel>(
    model: &M,
    w: ArrayView1<f64>,
    x: &[M::Input],
    y: &[M::Label],
) -> Result<f64> {
    if x.len() != y.len() {
        return Err(Error::LengthMismatch {
            inputs: x.len(),
            labels: y.len(),
        }
        .into());
    }
    if x.is_empty() {
        return Ok(1.0);
    }
    let y_pred = model.batch_inference(x, w)?;
    let mut total = 0.0;
    for (index, (yi, yi_pred)) in y.iter().zip(&y_pred).enumerate() {
        let weight = yi.total_weight();
        if !(weight > 0.0 && weight.is_finite()) {
            return Err(Error::LabelWeight { index, weight }.into());
        }
        total += model.loss(yi, yi_pred)? / weight;
    }
    Ok(1.0 - total / x.len() as f64)
}
