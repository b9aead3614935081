//! LUT model trainers.
//!
//! - [`Averager`] (`avg`): one constant LUT per output holding the
//!   cost-weighted mean target. A baseline, and a sanity check of the data.
//! - [`TaylorBooster`] (`gboost`): gradient boosting. Each round selects the
//!   LUTs maximizing the first-order loss decrease, finds the per-output step
//!   sizes with a [`LineSearch`], and commits the scaled LUTs.
//!
//! [`train_model`] drives a trainer over the coarse-to-fine feature pools of
//! a model.

use bon::Builder;

use super::callback::EarlyStopping;
use super::linesearch::{LineSearch, LineSearchConfig};
use super::logger::{TrainingLogger, Verbosity};
use super::loss::LossKind;
use super::lut_problem::{FeatureSharing, LutProblem, LutProblemEpt, OptimizationType, ProblemError};
use super::sampler::Sampler;
use crate::data::{DataSet, DataSetError};
use crate::model::{Lut, Model, ModelError};
use crate::registry::{Registry, RegistryError};

// =============================================================================
// Errors and reports
// =============================================================================

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Problem(#[from] ProblemError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    DataSet(#[from] DataSetError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no sub-window could be labelled")]
    NoSamples,

    #[error("model has {model} {what}, the dataset has {data}")]
    ShapeMismatch {
        what: &'static str,
        model: usize,
        data: usize,
    },

    #[error("outputs of the model have different numbers of LUTs")]
    RaggedLuts,
}

/// Summary of one training pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Number of LUT rounds kept in the model after this pass.
    pub rounds: usize,
    pub train_value: f64,
    pub train_error: f64,
    pub valid_value: Option<f64>,
    pub valid_error: Option<f64>,
}

// =============================================================================
// Problem setup
// =============================================================================

fn check_shapes(model: &Model, data: &DataSet) -> Result<(), TrainError> {
    let checks = [
        ("outputs", model.n_outputs(), data.n_outputs()),
        ("features", model.n_features(), data.n_features()),
        ("feature values", model.n_fvalues(), data.n_entries()),
    ];
    for (what, model, data) in checks {
        if model != data {
            return Err(TrainError::ShapeMismatch { what, model, data });
        }
    }
    Ok(())
}

fn make_problem<'a>(
    data: &'a DataSet,
    optimization: OptimizationType,
    loss: LossKind,
    sharing: FeatureSharing,
    threads: usize,
) -> Result<Box<dyn LutProblem + 'a>, ProblemError> {
    match optimization {
        OptimizationType::Expectation => Ok(Box::new(LutProblemEpt::new(data, loss, sharing, threads)?)),
    }
}

/// Replay the LUTs already in `model`, round by round.
fn replay<P: LutProblem + ?Sized>(problem: &mut P, model: &Model) -> Result<(), TrainError> {
    let luts = model.luts();
    let rounds = luts.first().map_or(0, Vec::len);
    if luts.iter().any(|l| l.len() != rounds) {
        return Err(TrainError::RaggedLuts);
    }
    for r in 0..rounds {
        let round: Vec<Lut> = luts.iter().map(|l| l[r].clone()).collect();
        problem.add_luts(&round);
    }
    problem.update_loss();
    Ok(())
}

// =============================================================================
// Averager
// =============================================================================

/// Constant model predicting the mean target.
#[derive(Debug, Clone, Copy, Default)]
pub struct Averager {
    pub loss: LossKind,
}

impl Averager {
    pub fn train(
        &self,
        train: &DataSet,
        valid: Option<&DataSet>,
        model: &mut Model,
        threads: usize,
    ) -> Result<TrainReport, TrainError> {
        check_shapes(model, train)?;

        let total_cost: f64 = train.costs().iter().sum();
        let luts: Vec<Lut> = (0..train.n_outputs())
            .map(|o| {
                let weighted: f64 = (0..train.n_samples())
                    .map(|s| train.cost(s) * train.target(s)[o])
                    .sum();
                let mean = if total_cost > 0.0 { weighted / total_cost } else { 0.0 };
                Lut::constant(0, train.n_entries(), mean)
            })
            .collect();

        let evaluate = |data: &DataSet| -> Result<(f64, f64), TrainError> {
            let mut problem = LutProblemEpt::new(data, self.loss, FeatureSharing::Shared, threads)?;
            problem.add_luts(&luts);
            problem.update_loss();
            Ok((problem.value(), problem.error()))
        };

        let (train_value, train_error) = evaluate(train)?;
        let valid = valid.map(evaluate).transpose()?;

        model.set_luts(luts.into_iter().map(|lut| vec![lut]).collect())?;
        Ok(TrainReport {
            rounds: 1,
            train_value,
            train_error,
            valid_value: valid.map(|v| v.0),
            valid_error: valid.map(|v| v.1),
        })
    }
}

// =============================================================================
// TaylorBooster
// =============================================================================

/// Gradient boosting of LUTs.
#[derive(Debug, Clone, Builder)]
pub struct TaylorBooster {
    /// Maximum number of rounds per training pass. Default: 1024.
    #[builder(default = 1024)]
    pub rounds: usize,

    #[builder(default)]
    pub loss: LossKind,

    #[builder(default)]
    pub sharing: FeatureSharing,

    #[builder(default)]
    pub optimization: OptimizationType,

    #[builder(default)]
    pub linesearch: LineSearchConfig,

    /// Rounds without validation improvement before stopping; the model is
    /// then cut back to its best round. `None` disables early stopping.
    pub patience: Option<usize>,

    #[builder(default)]
    pub verbosity: Verbosity,
}

impl Default for TaylorBooster {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TaylorBooster {
    /// Boost `model` on `train`, continuing from the LUTs it already holds.
    pub fn train(
        &self,
        train: &DataSet,
        valid: Option<&DataSet>,
        model: &mut Model,
        threads: usize,
    ) -> Result<TrainReport, TrainError> {
        check_shapes(model, train)?;
        if let Some(valid) = valid {
            check_shapes(model, valid)?;
        }

        let logger = TrainingLogger::new(self.verbosity);
        let search = LineSearch::new(self.linesearch.clone());

        let mut problem = make_problem(train, self.optimization, self.loss, self.sharing, threads)?;
        replay(&mut *problem, model)?;
        let mut valid_problem = valid
            .map(|data| make_problem(data, self.optimization, self.loss, self.sharing, threads))
            .transpose()?;
        if let Some(vp) = valid_problem.as_mut() {
            replay(&mut **vp, model)?;
        }

        let initial_rounds = problem.mluts().first().map_or(0, Vec::len);
        let mut early_stopping = self.patience.map(EarlyStopping::new);

        logger.start_training(self.rounds, train.n_samples(), train.n_features());

        let mut rounds = 0;
        for round in 0..self.rounds {
            problem.update_loss_deriv();
            problem.select();

            let n_outputs = problem.n_outputs();
            let step = search.minimize(n_outputs, |x, g| problem.linesearch(x, g));
            if !step.decreased() {
                logger.info(&format!("round {round}: line search found no decrease, stopping"));
                break;
            }

            problem.update_scores(&step.x)?;
            problem.update_loss();
            rounds += 1;

            let mut metrics = vec![
                ("train_loss".to_string(), problem.value()),
                ("train_error".to_string(), problem.error()),
            ];

            if let Some(vp) = valid_problem.as_mut() {
                let scaled: Vec<Lut> = problem
                    .luts()
                    .iter()
                    .zip(&step.x)
                    .map(|(lut, x)| lut.scaled(*x))
                    .collect();
                vp.add_luts(&scaled);
                vp.update_loss();
                let value = vp.value();
                metrics.push(("valid_loss".to_string(), value));
                metrics.push(("valid_error".to_string(), vp.error()));

                logger.log_round(round, &metrics);
                if let Some(stop) = early_stopping.as_mut() {
                    if stop.should_stop(value) {
                        logger.info(&format!(
                            "early stopping at round {round} (best: {} rounds)",
                            stop.best_rounds()
                        ));
                        break;
                    }
                }
            } else {
                logger.log_round(round, &metrics);
            }
        }

        // Cut back to the best validation round
        let keep = match (&early_stopping, &valid_problem) {
            (Some(stop), Some(_)) if stop.rounds() > 0 => initial_rounds + stop.best_rounds(),
            _ => initial_rounds + rounds,
        };
        let luts: Vec<Vec<Lut>> = problem
            .mluts()
            .iter()
            .map(|l| l[..keep.min(l.len())].to_vec())
            .collect();

        let report = if keep < initial_rounds + rounds {
            // Scores of the discarded rounds are still committed in the
            // problems, re-evaluate on the kept LUTs
            let mut kept = model.clone();
            kept.set_luts(luts.clone())?;
            let train_eval = evaluate_model(train, &kept, self, threads)?;
            let valid_eval = valid
                .map(|data| evaluate_model(data, &kept, self, threads))
                .transpose()?;
            TrainReport {
                rounds: keep,
                train_value: train_eval.0,
                train_error: train_eval.1,
                valid_value: valid_eval.map(|v| v.0),
                valid_error: valid_eval.map(|v| v.1),
            }
        } else {
            TrainReport {
                rounds: keep,
                train_value: problem.value(),
                train_error: problem.error(),
                valid_value: valid_problem.as_ref().map(|vp| vp.value()),
                valid_error: valid_problem.as_ref().map(|vp| vp.error()),
            }
        };

        model.set_luts(luts)?;
        logger.finish_training(rounds);
        Ok(report)
    }
}

fn evaluate_model(
    data: &DataSet,
    model: &Model,
    booster: &TaylorBooster,
    threads: usize,
) -> Result<(f64, f64), TrainError> {
    let mut problem = make_problem(data, booster.optimization, booster.loss, booster.sharing, threads)?;
    replay(&mut *problem, model)?;
    Ok((problem.value(), problem.error()))
}

// =============================================================================
// Trainer
// =============================================================================

/// Registered trainer names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainerKind {
    Averager,
    TaylorBooster,
}

impl TrainerKind {
    pub const ALL: [TrainerKind; 2] = [Self::Averager, Self::TaylorBooster];

    pub fn name(self) -> &'static str {
        match self {
            Self::Averager => "avg",
            Self::TaylorBooster => "gboost",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Averager => "constant model predicting the mean target",
            Self::TaylorBooster => "gradient boosting of look-up tables",
        }
    }
}

/// A configured trainer.
#[derive(Debug, Clone)]
pub enum Trainer {
    Averager(Averager),
    TaylorBooster(TaylorBooster),
}

impl Trainer {
    pub fn kind(&self) -> TrainerKind {
        match self {
            Self::Averager(_) => TrainerKind::Averager,
            Self::TaylorBooster(_) => TrainerKind::TaylorBooster,
        }
    }

    pub fn train(
        &self,
        train: &DataSet,
        valid: Option<&DataSet>,
        model: &mut Model,
        threads: usize,
    ) -> Result<TrainReport, TrainError> {
        match self {
            Self::Averager(t) => t.train(train, valid, model, threads),
            Self::TaylorBooster(t) => t.train(train, valid, model, threads),
        }
    }
}

/// Train `model` over all its feature pools.
///
/// Every pass re-samples the data for the current pool, trains, and moves the
/// model to the next finer pool; the last pass runs on the full-resolution
/// pool. Returns one report per pass.
pub fn train_model(
    model: &mut Model,
    registry: &Registry,
    threads: usize,
    sampler: &Sampler,
) -> Result<Vec<TrainReport>, TrainError> {
    let trainer = registry.make_trainer(model.param())?;
    let logger = TrainingLogger::new(model.param().verbosity);

    let mut reports = Vec::new();
    loop {
        let (train, valid) = sampler.sample(model, threads)?;
        logger.info(&format!(
            "training pass {}: step {}, {} features, {} samples",
            reports.len() + 1,
            model.step(),
            model.n_features(),
            train.n_samples()
        ));

        let report = trainer.train(&train, valid.as_ref(), model, threads)?;
        logger.info(&format!(
            "pass {} done: {} rounds, train loss {:.6}, train error {:.6}",
            reports.len() + 1,
            report.rounds,
            report.train_value,
            report.train_error
        ));
        reports.push(report);

        if !model.project() {
            break;
        }
    }
    Ok(reports)
}
