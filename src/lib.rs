//! Structured SVM training with (block-coordinate) Frank-Wolfe
//!
//! The solver is model-agnostic: inputs, labels, joint feature maps, losses and
//! inference all come from a [model::StructuredModel] implementation. The crate
//! provides the optimization itself: per-sample dual state, closed-form line
//! search, duality gap monitoring and iterate averaging.
//!
//! ```ignore
//! use fwssvm::prelude::*;
//!
//! let mut settings = Settings::default();
//! settings.set_max_iter(50);
//! let mut svm = FrankWolfeSsvm::new(model, settings)?;
//! svm.fit(&x, &y, true)?;
//! println!("score: {}", svm.score(&x_test, &y_test)?);
//! ```

pub mod algorithms;
pub mod error;
pub mod model;
pub mod routines;
pub mod structs;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::algorithms::{Algorithm, FrankWolfeSsvm, Status};
    pub use crate::error::Error;
    pub use crate::model::{Constraint, StructuredModel, WeightedLabel};
    pub use crate::routines::duality_gap::DualityGap;
    pub use crate::routines::logger::setup_log;
    pub use crate::routines::observer::{Iteration, NoopObserver, Observer, Snapshot};
    pub use crate::routines::output::History;
    pub use crate::routines::sampling::SampleMethod;
    pub use crate::routines::settings::Settings;
    pub use crate::routines::stop::StopHandle;
    pub use crate::structs::blocks::BlockWeights;
}
