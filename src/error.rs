//! Error types raised by the solver itself
//!
//! Errors coming from a [crate::model::StructuredModel] are not wrapped here; they
//! travel through [eyre::Report] untouched.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("sample_method can only be perm, rnd, or seq, got {0:?}")]
    UnknownSampleMethod(String),
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("inputs and labels differ in length ({inputs} vs {labels})")]
    LengthMismatch { inputs: usize, labels: usize },
    #[error("cannot fit on an empty training set")]
    EmptyDataset,
    #[error("label {index} has total weight {weight}, expected a positive value")]
    LabelWeight { index: usize, weight: f64 },
}
