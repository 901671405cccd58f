use std::fmt;
use std::time::Instant;

use eyre::Result;
use ndarray::{Array1, ArrayView1};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::StructuredModel;
use crate::routines::averaging::Averager;
use crate::routines::duality_gap::{dual_objective, primal_objective};
use crate::routines::observer::{Iteration, NoopObserver, Observer, Snapshot};
use crate::routines::output::History;
use crate::routines::sampling::SampleMethod;
use crate::routines::scoring::score;
use crate::routines::settings::{Settings, Solver};
use crate::routines::stop::{StopHandle, StopSignal};
use crate::structs::blocks::BlockWeights;
use batch::Batch;
use bcfw::BlockCoordinate;

pub mod batch;
pub mod bcfw;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Algorithm {
    /// Block-coordinate Frank-Wolfe, one update per sample visit
    BlockCoordinate,
    /// Batch Frank-Wolfe, one update per pass over the data
    Batch,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::BlockCoordinate => write!(f, "block-coordinate Frank-Wolfe"),
            Algorithm::Batch => write!(f, "batch Frank-Wolfe"),
        }
    }
}

/// Represents the status of the solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// No fit has run yet
    Starting,
    /// A fit is running
    InProgress,
    /// The duality gap dropped below the tolerance
    Converged,
    /// The solver used up `max_iter` passes
    MaxIterations,
    /// A stop was requested through a [StopHandle] or the stop file
    ManualStop,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Starting => write!(f, "Starting"),
            Status::InProgress => write!(f, "In progress"),
            Status::Converged => write!(f, "Converged"),
            Status::MaxIterations => write!(f, "Maximum iterations reached"),
            Status::ManualStop => write!(f, "Manual stop requested"),
        }
    }
}

/// Held-out data scored at every duality gap check
struct Evaluation<M: StructuredModel> {
    test_x: Vec<M::Input>,
    test_y: Vec<M::Label>,
    train_y: Vec<M::Label>,
}

/// Everything a solver loop needs besides its own iterate
pub(crate) struct Context<'a, M: StructuredModel> {
    pub model: &'a M,
    pub x: &'a [M::Input],
    pub y: &'a [M::Label],
    pub solver: &'a Solver,
    pub history: &'a mut History,
    pub stop: &'a StopSignal,
    evaluation: Option<&'a Evaluation<M>>,
    observer: &'a mut dyn Observer,
    start: Instant,
}

impl<'a, M: StructuredModel> Context<'a, M> {
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Training score, and the held-out score when evaluation data is registered
    pub fn scores(&self, w: ArrayView1<f64>) -> Result<(f64, Option<f64>)> {
        let train_y = self.evaluation.map_or(self.y, |eval| eval.train_y.as_slice());
        let train = score(self.model, w, self.x, train_y)?;
        let test = match self.evaluation {
            Some(eval) => Some(score(self.model, w, &eval.test_x, &eval.test_y)?),
            None => None,
        };
        Ok((train, test))
    }

    pub fn observe(&mut self, w: ArrayView1<f64>, steps: usize, iteration: Iteration) {
        let status = Status::InProgress;
        let snapshot = Snapshot {
            w: w.view(),
            status: &status,
            history: &*self.history,
            steps,
        };
        self.observer.observe(&snapshot, iteration);
    }
}

/// Structured SVM trained with (block-coordinate) Frank-Wolfe
///
/// Implements Algorithms 2 (batch) and 3 (block-coordinate) of Lacoste-Julien,
/// Jaggi, Schmidt and Pletscher, "Block-Coordinate Frank-Wolfe Optimization for
/// Structural SVMs" (ICML 2013). No learning rate is needed and the duality gap
/// gives a certificate of convergence.
///
/// The block-coordinate variant keeps one contribution per sample, i.e. a matrix of
/// `n_samples x n_features` values.
pub struct FrankWolfeSsvm<M: StructuredModel> {
    model: M,
    settings: Settings,
    sample_method: SampleMethod,
    w: Array1<f64>,
    /// Dual accumulator matching `w`
    l: f64,
    blocks: Option<BlockWeights>,
    history: History,
    status: Status,
    steps: usize,
    evaluation: Option<Evaluation<M>>,
    observer: Box<dyn Observer>,
    stop: StopSignal,
}

impl<M: StructuredModel> FrankWolfeSsvm<M> {
    /// Create a solver, rejecting invalid settings before any data is seen
    pub fn new(model: M, settings: Settings) -> Result<Self> {
        let sample_method = settings.validate()?;
        if settings.solver.n_jobs != 1 {
            tracing::warn!(
                "FrankWolfeSsvm does not support parallel execution. Ignoring n_jobs = {}",
                settings.solver.n_jobs
            );
        }
        let stop = StopSignal::new(settings.stop_file.clone());
        Ok(Self {
            model,
            settings,
            sample_method,
            w: Array1::zeros(0),
            l: 0.0,
            blocks: None,
            history: History::new(),
            status: Status::Starting,
            steps: 0,
            evaluation: None,
            observer: Box::new(NoopObserver),
            stop,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        if self.settings.solver.batch_mode {
            Algorithm::Batch
        } else {
            Algorithm::BlockCoordinate
        }
    }

    /// Learn the weights on `x` and `y`
    ///
    /// Unless `initialize` is false the model is first initialized on the data. A
    /// stop request ends the run early but still counts as a successful fit. If the
    /// model returns an error, that error is returned and the state of the previous
    /// fit is kept.
    pub fn fit(&mut self, x: &[M::Input], y: &[M::Label], initialize: bool) -> Result<&Self> {
        if x.len() != y.len() {
            return Err(Error::LengthMismatch {
                inputs: x.len(),
                labels: y.len(),
            }
            .into());
        }
        if x.is_empty() {
            return Err(Error::EmptyDataset.into());
        }
        if initialize {
            self.model.initialize(x, y)?;
        }
        self.stop.clear()?;

        let n_samples = x.len();
        let n_features = self.model.size_joint_feature();
        let solver = &self.settings.solver;
        let warm_start = solver.warm_start && self.w.len() == n_features;
        let (w_init, l_init) = if warm_start {
            (self.w.clone(), self.l)
        } else {
            (Array1::zeros(n_features), 0.0)
        };
        let mut rng = match solver.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        tracing::info!(
            "Fitting {} samples with {} features using {}",
            n_samples,
            n_features,
            self.algorithm()
        );

        let mut history = History::new();
        let mut ctx = Context {
            model: &self.model,
            x,
            y,
            solver,
            history: &mut history,
            stop: &self.stop,
            evaluation: self.evaluation.as_ref(),
            observer: self.observer.as_mut(),
            start: Instant::now(),
        };

        let (w, l, blocks, steps, status) = if solver.batch_mode {
            let mut batch = Batch::new(w_init, l_init);
            let status = batch.run(&mut ctx)?;
            let (w, l, steps) = batch.into_parts();
            (w, l, None, steps, status)
        } else {
            let blocks = match &self.blocks {
                Some(previous)
                    if warm_start
                        && previous.n_samples() == n_samples
                        && previous.n_features() == n_features =>
                {
                    previous.clone()
                }
                _ if warm_start => BlockWeights::spread(w_init.view(), l_init, n_samples),
                _ => BlockWeights::zeros(n_samples, n_features),
            };
            // The average restarts from the weights exported by the previous fit
            let averager = solver
                .do_averaging
                .then(|| Averager::new(w_init, l_init));
            let mut bcfw = BlockCoordinate::new(blocks, averager);
            let status = bcfw.run(&mut ctx, self.sample_method, &mut rng)?;
            let l = bcfw.exported_l();
            let (w, blocks, steps) = bcfw.into_parts();
            (w, l, Some(blocks), steps, status)
        };

        tracing::info!("{}", status);
        tracing::debug!("Calculating final objective");
        let primal = primal_objective(&self.model, x, y, w.view(), solver.c)?;
        let elapsed = ctx.elapsed();
        ctx.history
            .push_final(primal, dual_objective(w.view(), l, n_samples, solver.c), elapsed);
        let snapshot = Snapshot {
            w: w.view(),
            status: &status,
            history: &*ctx.history,
            steps,
        };
        ctx.observer.observe(&snapshot, Iteration::Final);

        self.w = w;
        self.l = l;
        self.blocks = blocks;
        self.history = history;
        self.status = status;
        self.steps = steps;
        Ok(self)
    }

    /// Register held-out data scored at every duality gap check
    ///
    /// `train_y` replaces the training labels when scoring the training set.
    pub fn set_evaluation(
        &mut self,
        test_x: Vec<M::Input>,
        test_y: Vec<M::Label>,
        train_y: Vec<M::Label>,
    ) {
        self.evaluation = Some(Evaluation {
            test_x,
            test_y,
            train_y,
        });
    }

    /// Replace the settings used by the next fit
    ///
    /// The learned weights are kept, so a following fit with `warm_start` continues
    /// from them. Handles returned by [FrankWolfeSsvm::stop_handle] stay valid.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        self.sample_method = settings.validate()?;
        self.stop.set_file(settings.stop_file.clone());
        self.settings = settings;
        Ok(())
    }

    pub fn set_observer(&mut self, observer: impl Observer + 'static) {
        self.observer = Box::new(observer);
    }

    /// Handle to stop a running fit between two steps
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.handle()
    }

    /// `1 - mean(loss / total_weight)` of the predictions on `x`
    pub fn score(&self, x: &[M::Input], y: &[M::Label]) -> Result<f64> {
        score(&self.model, self.w.view(), x, y)
    }

    pub fn predict(&self, x: &[M::Input]) -> Result<Vec<M::Label>> {
        self.model.batch_inference(x, self.w.view())
    }

    /// Write the settings and the objective history to the output folder, if enabled
    pub fn write_outputs(&self) -> Result<()> {
        if self.settings.output.write {
            tracing::debug!("Writing outputs to {:?}", self.settings.output.path);
            self.settings.write()?;
            self.history.write(&self.settings.output.path)?;
        }
        Ok(())
    }

    /// The learned weights (the averaged iterate when averaging is on)
    pub fn w(&self) -> ArrayView1<f64> {
        self.w.view()
    }

    /// Per-sample state of the last block-coordinate fit
    pub fn blocks(&self) -> Option<&BlockWeights> {
        self.blocks.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn converged(&self) -> bool {
        self.status == Status::Converged
    }

    /// Number of updates performed by the last fit
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
