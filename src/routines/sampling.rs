use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Order in which the block-coordinate solver visits the samples of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleMethod {
    /// A fresh uniform permutation every pass
    Permutation,
    /// `n` independent uniform draws, with replacement
    Random,
    /// `0..n`, every pass
    Sequential,
}

impl SampleMethod {
    /// Visiting order for one pass over `n_samples` samples
    pub fn order<R: Rng>(&self, n_samples: usize, rng: &mut R) -> Vec<usize> {
        match self {
            SampleMethod::Permutation => {
                let mut order: Vec<usize> = (0..n_samples).collect();
                order.shuffle(rng);
                order
            }
            SampleMethod::Random if n_samples > 0 => (0..n_samples)
                .map(|_| rng.gen_range(0..n_samples))
                .collect(),
            SampleMethod::Random => Vec::new(),
            SampleMethod::Sequential => (0..n_samples).collect(),
        }
    }
}

impl FromStr for SampleMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perm" => Ok(SampleMethod::Permutation),
            "rnd" => Ok(SampleMethod::Random),
            "seq" => Ok(SampleMethod::Sequential),
            other => Err(Error::UnknownSampleMethod(other.to_string())),
        }
    }
}

impl fmt::Display for SampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleMethod::Permutation => write!(f, "perm"),
            SampleMethod::Random => write!(f, "rnd"),
            SampleMethod::Sequential => write!(f, "seq"),
        }
    }
}
