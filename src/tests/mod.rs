use approx::assert_abs_diff_eq;
use eyre::Result;
use ndarray::{array, s, Array1, ArrayView1};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::algorithms::bcfw::block_step;
use crate::error::Error;
use crate::model::{StructuredModel, WeightedLabel};
use crate::routines::averaging::Averager;
use crate::routines::duality_gap::{duality_gap, primal_objective};
use crate::routines::sampling::SampleMethod;
use crate::routines::scoring::score;
use crate::routines::settings::Solver;
use crate::structs::blocks::BlockWeights;

#[derive(Debug, Clone)]
struct Class {
    class: usize,
    weight: f64,
}

impl WeightedLabel for Class {
    fn total_weight(&self) -> f64 {
        self.weight
    }
}

/// Two classes over 2-d inputs: `psi(x, y)` places `x` in the block of class `y`.
/// Ties go to class 0.
struct TwoClass;

const N_FEATURES: usize = 2;

impl TwoClass {
    fn scores(x: &Array1<f64>, w: ArrayView1<f64>) -> [f64; 2] {
        [
            w.slice(s![..N_FEATURES]).dot(x),
            w.slice(s![N_FEATURES..]).dot(x),
        ]
    }
}

impl StructuredModel for TwoClass {
    type Input = Array1<f64>;
    type Label = Class;

    fn initialize(&mut self, _x: &[Array1<f64>], _y: &[Class]) -> Result<()> {
        Ok(())
    }

    fn size_joint_feature(&self) -> usize {
        2 * N_FEATURES
    }

    fn joint_feature(&self, x: &Array1<f64>, y: &Class) -> Result<Array1<f64>> {
        let mut psi = Array1::zeros(2 * N_FEATURES);
        psi.slice_mut(s![y.class * N_FEATURES..(y.class + 1) * N_FEATURES])
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
        let mut scores = Self::scores(x, w);
        scores[1 - y.class] += y.weight;
        Ok(Class {
            class: usize::from(scores[1] > scores[0]),
            weight: y.weight,
        })
    }

    fn inference(&self, x: &Array1<f64>, w: ArrayView1<f64>) -> Result<Class> {
        let scores = Self::scores(x, w);
        Ok(Class {
            class: usize::from(scores[1] > scores[0]),
            weight: 1.0,
        })
    }
}

fn toy_data() -> (Vec<Array1<f64>>, Vec<Class>) {
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
    let y = (0..8)
        .map(|i| Class {
            class: i / 4,
            weight: 1.0,
        })
        .collect();
    (x, y)
}

#[test]
fn block_steps_keep_decomposition() -> Result<()> {
    let (x, y) = toy_data();
    let model = TwoClass;
    let solver = Solver::default();
    let mut blocks = BlockWeights::zeros(x.len(), model.size_joint_feature());
    let mut rng = SmallRng::seed_from_u64(3);
    let mut k = 0;
    for _ in 0..10 {
        for i in SampleMethod::Permutation.order(x.len(), &mut rng) {
            let gamma = block_step(&model, &x[i], &y[i], i, &mut blocks, None, &solver, k)?;
            assert!((0.0..=1.0).contains(&gamma));
            assert!(blocks.decomposition_error() < 1e-9);
            k += 1;
        }
    }
    Ok(())
}

#[test]
fn first_block_step_with_line_search() -> Result<()> {
    // At w = 0 every sample is violated with loss 1: gamma = C n (1/n) / ||ws||^2
    let (x, y) = toy_data();
    let model = TwoClass;
    let solver = Solver::default();
    let mut blocks = BlockWeights::zeros(x.len(), model.size_joint_feature());
    let gamma = block_step(&model, &x[0], &y[0], 0, &mut blocks, None, &solver, 0)?;
    // ws = [2, 0, -2, 0], ||ws||^2 = 8
    assert_abs_diff_eq!(gamma, 1.0 / 8.0, epsilon = 1e-12);
    assert_abs_diff_eq!(blocks.l(), 1.0 / 64.0, epsilon = 1e-12);
    assert_abs_diff_eq!(blocks.w()[0], 0.25, epsilon = 1e-12);
    Ok(())
}

#[test]
fn block_step_schedule_without_line_search() -> Result<()> {
    let (x, y) = toy_data();
    let model = TwoClass;
    let solver = Solver {
        line_search: false,
        ..Solver::default()
    };
    let mut blocks = BlockWeights::zeros(x.len(), model.size_joint_feature());
    // gamma = 2n / (k + 2n) with n = 8
    let gamma = block_step(&model, &x[3], &y[3], 3, &mut blocks, None, &solver, 16)?;
    assert_abs_diff_eq!(gamma, 0.5, epsilon = 1e-15);
    let gamma = block_step(&model, &x[4], &y[4], 4, &mut blocks, None, &solver, 0)?;
    assert_eq!(gamma, 1.0);
    Ok(())
}

#[test]
fn averaging_follows_global_step() -> Result<()> {
    let (x, y) = toy_data();
    let model = TwoClass;
    let solver = Solver::default();
    let mut blocks = BlockWeights::zeros(x.len(), model.size_joint_feature());
    let mut averager = Averager::new(Array1::zeros(model.size_joint_feature()), 0.0);
    let mut iterates = Vec::new();
    for k in 0..(2 * x.len()) {
        let i = k % x.len();
        block_step(
            &model,
            &x[i],
            &y[i],
            i,
            &mut blocks,
            Some(&mut averager),
            &solver,
            k,
        )?;
        iterates.push(blocks.w().to_owned());
    }
    // Iterate k carries weight k + 1 in the average
    let mut expected: Array1<f64> = Array1::zeros(model.size_joint_feature());
    let mut total = 0.0;
    for (k, w) in iterates.iter().enumerate() {
        expected.scaled_add(k as f64 + 1.0, w);
        total += k as f64 + 1.0;
    }
    expected /= total;
    for (a, b) in averager.w().iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn duality_gap_at_zero() -> Result<()> {
    let (x, y) = toy_data();
    let model = TwoClass;
    let w: Array1<f64> = Array1::zeros(model.size_joint_feature());
    let objective = duality_gap(&model, &x, &y, w.view(), 0.0, 1.0)?;
    assert_eq!(objective.dual, 0.0);
    assert_eq!(objective.gap, 8.0);
    assert_eq!(objective.primal, 8.0);
    assert_eq!(primal_objective(&model, &x, &y, w.view(), 1.0)?, 8.0);
    Ok(())
}

#[test]
fn duality_gap_is_non_negative_along_the_run() -> Result<()> {
    let (x, y) = toy_data();
    let model = TwoClass;
    let solver = Solver::default();
    let mut blocks = BlockWeights::zeros(x.len(), model.size_joint_feature());
    let mut rng = SmallRng::seed_from_u64(11);
    let mut k = 0;
    for _ in 0..20 {
        for i in SampleMethod::Permutation.order(x.len(), &mut rng) {
            block_step(&model, &x[i], &y[i], i, &mut blocks, None, &solver, k)?;
            k += 1;
        }
        let objective = duality_gap(&model, &x, &y, blocks.w(), blocks.l(), solver.c)?;
        assert!(objective.gap >= -1e-9, "gap {}", objective.gap);
        assert_abs_diff_eq!(objective.primal, objective.dual + objective.gap);
    }
    Ok(())
}

#[test]
fn score_counts_normalized_losses() -> Result<()> {
    let (x, y) = toy_data();
    let model = TwoClass;
    // Every score ties at zero, so class 0 is predicted everywhere
    let w: Array1<f64> = Array1::zeros(model.size_joint_feature());
    let mut y = y;
    for label in y.iter_mut().skip(4) {
        label.weight = 2.0;
    }
    // Half of the samples are wrong, each with normalized loss 2 / 2
    assert_abs_diff_eq!(score(&model, w.view(), &x, &y)?, 0.5, epsilon = 1e-12);
    assert_eq!(
        score(&model, w.view(), &x, &y)?,
        score(&model, w.view(), &x, &y)?
    );
    assert!(score(&model, w.view(), &x[..3], &y).is_err());
    Ok(())
}

#[test]
fn score_rejects_non_positive_weights() {
    let (x, mut y) = toy_data();
    let w: Array1<f64> = Array1::zeros(TwoClass.size_joint_feature());
    y[5].weight = 0.0;
    let err = score(&TwoClass, w.view(), &x, &y).err().unwrap();
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::LabelWeight {
            index: 5,
            weight: 0.0
        })
    );
    y[5].weight = f64::NAN;
    assert!(score(&TwoClass, w.view(), &x, &y).is_err());
}
