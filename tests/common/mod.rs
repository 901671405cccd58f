#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::sync::{Arc, Mutex};

use eyre::{eyre, Result};
use fwssvm::prelude::*;
use ndarray::{array, s, Array1, ArrayView1};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub class: usize,
    pub weight: f64,
}

impl WeightedLabel for Class {
    fn total_weight(&self) -> f64 {
        self.weight
    }
}

/// Linear multiclass SVM: `psi(x, y)` copies `x` into the block of class `y`
///
/// Ties in inference go to the lowest class.
#[derive(Debug, Clone, Default)]
pub struct Multiclass {
    pub n_features: usize,
    pub n_classes: usize,
}

impl Multiclass {
    fn scores(&self, x: &Array1<f64>, w: ArrayView1<f64>) -> Vec<f64> {
        (0..self.n_classes)
            .map(|c| {
                w.slice(s![c * self.n_features..(c + 1) * self.n_features])
                    .dot(x)
            })
            .collect()
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl StructuredModel for Multiclass {
    type Input = Array1<f64>;
    type Label = Class;

    fn initialize(&mut self, x: &[Array1<f64>], y: &[Class]) -> Result<()> {
        self.n_features = x.first().map_or(0, |xi| xi.len());
        self.n_classes = y.iter().map(|yi| yi.class).max().unwrap_or(0) + 1;
        Ok(())
    }

    fn size_joint_feature(&self) -> usize {
        self.n_features * self.n_classes
    }

    fn joint_feature(&self, x: &Array1<f64>, y: &Class) -> Result<Array1<f64>> {
        let mut psi = Array1::zeros(self.size_joint_feature());
        psi.slice_mut(s![y.class * self.n_features..(y.class + 1) * self.n_features])
            .assign(x);
        Ok(psi)
    }

    fn loss(&self, y: &Class, y_hat: &Class) -> Result<f64> {
        Ok(if y.class == y_hat.class { 0.0 } else { y.weight })
    }

    fn loss_augmented_inference(
        &self,
        x: &Array1<f64>,
        y: &Class,
        w: ArrayView1<f64>,
        _relaxed: bool,
    ) -> Result<Class> {
        let mut scores = self.scores(x, w);
        for (c, score) in scores.iter_mut().enumerate() {
            if c != y.class {
                *score += y.weight;
            }
        }
        Ok(Class {
            class: argmax(&scores),
            weight: y.weight,
        })
    }

    fn inference(&self, x: &Array1<f64>, w: ArrayView1<f64>) -> Result<Class> {
        Ok(Class {
            class: argmax(&self.scores(x, w)),
            weight: 1.0,
        })
    }
}

/// [Multiclass] that pulls a [StopHandle] once it has answered a given number of
/// per-sample constraint queries
#[derive(Default)]
pub struct Stopping {
    pub inner: Multiclass,
    pub handle: RefCell<Option<StopHandle>>,
    pub after: usize,
    pub calls: Cell<usize>,
}

impl Stopping {
    pub fn new(after: usize) -> Self {
        Self {
            after,
            ..Self::default()
        }
    }

    pub fn arm(&self, handle: StopHandle) {
        *self.handle.borrow_mut() = Some(handle);
    }
}

impl StructuredModel for Stopping {
    type Input = Array1<f64>;
    type Label = Class;

    fn initialize(&mut self, x: &[Array1<f64>], y: &[Class]) -> Result<()> {
        self.inner.initialize(x, y)
    }

    fn size_joint_feature(&self) -> usize {
        self.inner.size_joint_feature()
    }

    fn joint_feature(&self, x: &Array1<f64>, y: &Class) -> Result<Array1<f64>> {
        self.inner.joint_feature(x, y)
    }

    fn loss(&self, y: &Class, y_hat: &Class) -> Result<f64> {
        self.inner.loss(y, y_hat)
    }

    fn loss_augmented_inference(
        &self,
        x: &Array1<f64>,
        y: &Class,
        w: ArrayView1<f64>,
        relaxed: bool,
    ) -> Result<Class> {
        self.inner.loss_augmented_inference(x, y, w, relaxed)
    }

    fn inference(&self, x: &Array1<f64>, w: ArrayView1<f64>) -> Result<Class> {
        self.inner.inference(x, w)
    }

    fn find_constraint(
        &self,
        x: &Array1<f64>,
        y: &Class,
        w: ArrayView1<f64>,
    ) -> Result<Constraint<Class>> {
        let calls = self.calls.get() + 1;
        self.calls.set(calls);
        if calls == self.after {
            if let Some(handle) = self.handle.borrow().as_ref() {
                handle.stop();
            }
        }
        self.inner.find_constraint(x, y, w)
    }
}

/// [Multiclass] whose loss-augmented inference fails while `fail` is set
#[derive(Default)]
pub struct Failing {
    pub inner: Multiclass,
    pub fail: Cell<bool>,
}

impl StructuredModel for Failing {
    type Input = Array1<f64>;
    type Label = Class;

    fn initialize(&mut self, x: &[Array1<f64>], y: &[Class]) -> Result<()> {
        self.inner.initialize(x, y)
    }

    fn size_joint_feature(&self) -> usize {
        self.inner.size_joint_feature()
    }

    fn joint_feature(&self, x: &Array1<f64>, y: &Class) -> Result<Array1<f64>> {
        self.inner.joint_feature(x, y)
    }

    fn loss(&self, y: &Class, y_hat: &Class) -> Result<f64> {
        self.inner.loss(y, y_hat)
    }

    fn loss_augmented_inference(
        &self,
        x: &Array1<f64>,
        y: &Class,
        w: ArrayView1<f64>,
        relaxed: bool,
    ) -> Result<Class> {
        if self.fail.get() {
            return Err(eyre!("inference solver failed"));
        }
        self.inner.loss_augmented_inference(x, y, w, relaxed)
    }

    fn inference(&self, x: &Array1<f64>, w: ArrayView1<f64>) -> Result<Class> {
        self.inner.inference(x, w)
    }
}

/// Two linearly separable classes of four points each
pub fn toy_data() -> (Vec<Array1<f64>>, Vec<Class>) {
    let x = vec![
        array![2.0, 0.0],
        array![1.5, 0.5],
        array![2.5, -0.5],
        array![1.0, 1.0],
        array![-2.0, 0.0],
        array![-1.5, -0.5],
        array![-2.5, 0.5],
        array![-1.0, -1.0],
    ];
    let y = (0..x.len())
        .map(|i| Class {
            class: i / 4,
            weight: 1.0,
        })
        .collect();
    (x, y)
}

/// Settings with a fixed seed and frequent duality gap checks
pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.set_max_iter(50);
    settings.set_tol(1e-2);
    settings.set_check_dual_every(1);
    settings.set_seed(42);
    settings
}

/// Log sink for `tracing_subscriber::fmt`, keeping everything written to it
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer).to_string()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
