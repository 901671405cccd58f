use config::Config as eConfig;
use eyre::{Result, WrapErr};
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;
use crate::routines::output::OutputFile;
use crate::routines::sampling::SampleMethod;

/// Settings for a Frank-Wolfe structured SVM run
///
/// Can be read from a TOML file with [Settings::from_file], or built in code from
/// [Settings::default] and the setters.
#[derive(Debug, Deserialize, Clone, Serialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub solver: Solver,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub output: Output,
    /// The run stops gracefully once this file exists
    #[serde(default)]
    pub stop_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Solver {
    /// Regularization parameter, `1 / (lambda * n_samples)`
    #[serde(default = "default_c")]
    pub c: f64,
    /// Maximum number of passes over the data set
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Convergence tolerance on the duality gap
    #[serde(default = "default_tol")]
    pub tol: f64,
    /// Use the batch algorithm instead of the block-coordinate one
    #[serde(default)]
    pub batch_mode: bool,
    #[serde(default = "default_true")]
    pub line_search: bool,
    /// Passes between two duality gap checks, 0 disables the checks
    #[serde(default = "default_check_dual_every")]
    pub check_dual_every: usize,
    /// Only used by the block-coordinate algorithm
    #[serde(default = "default_true")]
    pub do_averaging: bool,
    /// One of `perm`, `rnd` or `seq`
    #[serde(default = "default_sample_method")]
    pub sample_method: String,
    /// Seed for the sampling order, drawn from entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Only 1 is supported, other values are ignored with a warning
    #[serde(default = "default_n_jobs")]
    pub n_jobs: usize,
    /// Passes between two training loss evaluations, 0 disables them
    #[serde(default)]
    pub show_loss_every: usize,
    /// Start from the weights of the previous fit
    #[serde(default)]
    pub warm_start: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            c: default_c(),
            max_iter: default_max_iter(),
            tol: default_tol(),
            batch_mode: false,
            line_search: true,
            check_dual_every: default_check_dual_every(),
            do_averaging: true,
            sample_method: default_sample_method(),
            seed: None,
            n_jobs: default_n_jobs(),
            show_loss_every: 0,
            warm_start: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file name, relative to [Output::path]
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Output {
    #[serde(default)]
    pub write: bool,
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            write: false,
            path: default_output_path(),
        }
    }
}

impl Settings {
    /// Read settings from a TOML file, with `FWSSVM_`-prefixed environment variables
    /// taking precedence (e.g. `FWSSVM_SOLVER__MAX_ITER=50`)
    pub fn from_file(path: &str) -> Result<Self> {
        let parsed = eConfig::builder()
            .add_source(config::File::with_name(path).format(config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix("FWSSVM").separator("__"))
            .build()
            .wrap_err_with(|| format!("Failed to read settings from {}", path))?;

        let settings: Settings = parsed
            .try_deserialize()
            .wrap_err("Failed to parse settings")?;
        Ok(settings)
    }

    /// Check the settings, returning the parsed sampling method
    pub fn validate(&self) -> std::result::Result<SampleMethod, Error> {
        let sample_method: SampleMethod = self.solver.sample_method.parse()?;
        if !(self.solver.c > 0.0) {
            return Err(Error::Parameters(format!(
                "C must be positive, got {}",
                self.solver.c
            )));
        }
        if !(self.solver.tol >= 0.0) {
            return Err(Error::Parameters(format!(
                "tol must be non-negative, got {}",
                self.solver.tol
            )));
        }
        Ok(sample_method)
    }

    /// Write the settings as JSON to `settings.json` in the output folder
    pub fn write(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        let outputfile = OutputFile::new(&self.output.path, "settings.json")?;
        std::io::Write::write_all(&mut outputfile.file_owned(), serialized.as_bytes())?;
        Ok(())
    }

    pub fn set_c(&mut self, c: f64) {
        self.solver.c = c;
    }

    pub fn set_max_iter(&mut self, max_iter: usize) {
        self.solver.max_iter = max_iter;
    }

    pub fn set_tol(&mut self, tol: f64) {
        self.solver.tol = tol;
    }

    pub fn set_batch_mode(&mut self, batch_mode: bool) {
        self.solver.batch_mode = batch_mode;
    }

    pub fn set_line_search(&mut self, line_search: bool) {
        self.solver.line_search = line_search;
    }

    pub fn set_check_dual_every(&mut self, check_dual_every: usize) {
        self.solver.check_dual_every = check_dual_every;
    }

    pub fn set_averaging(&mut self, do_averaging: bool) {
        self.solver.do_averaging = do_averaging;
    }

    pub fn set_sample_method(&mut self, sample_method: &str) {
        self.solver.sample_method = sample_method.to_string();
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.solver.seed = Some(seed);
    }

    pub fn set_n_jobs(&mut self, n_jobs: usize) {
        self.solver.n_jobs = n_jobs;
    }

    pub fn set_show_loss_every(&mut self, show_loss_every: usize) {
        self.solver.show_loss_every = show_loss_every;
    }

    pub fn set_warm_start(&mut self, warm_start: bool) {
        self.solver.warm_start = warm_start;
    }

    pub fn set_output_path(&mut self, path: &str) {
        self.output.path = path.to_string();
    }

    pub fn set_write(&mut self, write: bool) {
        self.output.write = write;
    }

    pub fn set_stop_file(&mut self, path: impl Into<PathBuf>) {
        self.stop_file = Some(path.into());
    }
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_c() -> f64 {
    1.0
}

fn default_max_iter() -> usize {
    1000
}

fn default_tol() -> f64 {
    1e-3
}

fn default_check_dual_every() -> usize {
    10
}

fn default_sample_method() -> String {
    "perm".to_string()
}

fn default_n_jobs() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_path() -> String {
    "outputs/".to_string()
}
