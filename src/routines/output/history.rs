use csv::WriterBuilder;
use eyre::Result;
use serde::Serialize;

use crate::routines::duality_gap::DualityGap;
use crate::routines::output::OutputFile;

/// Objective curves and scores recorded during a fit
///
/// Every sequence is append-only. One objective entry is recorded per duality gap
/// check (per iteration for the batch solver), plus a final entry once the solver
/// stops, so `dual`, `gap`, `primal` and `timestamps` always have the same length.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct History {
    dual: Vec<f64>,
    gap: Vec<f64>,
    primal: Vec<f64>,
    /// Seconds since the start of the fit
    timestamps: Vec<f64>,
    train_score: Vec<f64>,
    test_score: Vec<f64>,
    loss_curve: Vec<f64>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_objective(&mut self, objective: DualityGap, elapsed: f64) {
        self.dual.push(objective.dual);
        self.gap.push(objective.gap);
        self.primal.push(objective.primal);
        self.timestamps.push(elapsed);
    }

    /// Close the curves with the final primal objective, repeating the last dual value
    ///
    /// `fallback_dual` is only used when no check has run during the fit.
    pub fn push_final(&mut self, primal: f64, fallback_dual: f64, elapsed: f64) {
        let dual = self.dual.last().copied().unwrap_or(fallback_dual);
        self.push_objective(
            DualityGap {
                dual,
                gap: primal - dual,
                primal,
            },
            elapsed,
        );
    }

    pub fn push_scores(&mut self, train_score: f64, test_score: Option<f64>) {
        self.train_score.push(train_score);
        if let Some(test_score) = test_score {
            self.test_score.push(test_score);
        }
    }

    pub fn push_loss(&mut self, loss: f64) {
        self.loss_curve.push(loss);
    }

    pub fn dual(&self) -> &[f64] {
        &self.dual
    }

    pub fn gap(&self) -> &[f64] {
        &self.gap
    }

    pub fn primal(&self) -> &[f64] {
        &self.primal
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn train_score(&self) -> &[f64] {
        &self.train_score
    }

    pub fn test_score(&self) -> &[f64] {
        &self.test_score
    }

    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    pub fn len(&self) -> usize {
        self.dual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dual.is_empty()
    }

    /// Last gap measured by the solver, ignoring the final bookkeeping entry
    pub fn last_checked_gap(&self) -> Option<f64> {
        self.gap.iter().rev().nth(1).copied()
    }

    /// Write the objective curves to `history.csv` in `folder`
    pub fn write(&self, folder: &str) -> Result<()> {
        tracing::debug!("Writing history...");
        let outputfile = OutputFile::new(folder, "history.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(outputfile.file());

        writer.write_record(["entry", "time", "dual", "gap", "primal", "train_score", "test_score"])?;
        for i in 0..self.len() {
            let optional = |values: &[f64]| values.get(i).map(|v| v.to_string()).unwrap_or_default();
            writer.write_record([
                i.to_string(),
                format!("{:.3}", self.timestamps[i]),
                self.dual[i].to_string(),
                self.gap[i].to_string(),
                self.primal[i].to_string(),
                optional(&self.train_score),
                optional(&self.test_score),
            ])?;
        }
        writer.flush()?;
        tracing::debug!("History written to {:?}", outputfile.relative_path());
        Ok(())
    }
}
