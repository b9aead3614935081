//! Training infrastructure for LUT boosting.
//!
//! - [`Loss`] / [`LossKind`]: per-sample losses and their gradients
//! - [`LutProblem`] / [`LutProblemEpt`]: feature selection and score bookkeeping
//! - [`LineSearch`]: per-output step sizes of a boosting round
//! - [`collect_samples`] / [`Sampler`]: datasets from labelled sub-windows
//! - [`Averager`] / [`TaylorBooster`]: the trainers, driven by [`train_model`]
//! - [`EarlyStopping`]: stops boosting when the validation loss plateaus
//! - [`TrainingLogger`]: verbosity-filtered progress output

mod callback;
mod linesearch;
mod logger;
mod loss;
mod lut_problem;
mod sampler;
mod trainer;

pub use callback::EarlyStopping;
pub use linesearch::{LineSearch, LineSearchConfig, LineSearchResult};
pub use logger::{TrainingLogger, Verbosity};
pub use loss::{
    classification_error, regression_error, DiagExp, DiagLog, DiagSymExp, DiagSymLog, Diagonal,
    Jesorsky, Loss, LossKind, ScalarLoss,
};
pub use lut_problem::{
    FeatureSharing, LutProblem, LutProblemEpt, LutProblemState, OptimizationType, ProblemError,
};
pub use sampler::{collect_samples, Sampler};
pub use trainer::{train_model, Averager, TaylorBooster, TrainError, TrainReport, Trainer, TrainerKind};
