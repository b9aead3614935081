//! Boosted LUT model.
//!
//! A [`Model`] owns the parameters it was trained with, a pool of candidate
//! features and, for every output, the list of [`Lut`] weak learners selected
//! by boosting. The score of output `o` on a sub-window is the sum of its LUTs
//! evaluated at their feature's code.
//!
//! Feature pools are laid on a grid: positions and cell sizes are multiples of
//! a step that starts at `2^projections` and is halved by [`Model::project`]
//! between training passes, so the first passes search a small coarse pool
//! and later passes refine the selected features.
//!
//! # Example
//!
//! ```
//! use visioner::config::Param;
//! use visioner::model::{FeatureFamily, Model};
//!
//! let param = Param::builder().rows(12).cols(12).projections(1).build().unwrap();
//! let mut model = Model::new(param, FeatureFamily::Lbp, 1);
//! assert_eq!(model.step(), 2);
//! assert_eq!(model.n_fvalues(), 256);
//!
//! let coarse = model.n_features();
//! assert!(model.project());
//! assert!(model.n_features() > coarse);
//! assert!(!model.project());
//! ```

mod features;
mod lut;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use features::{Feature, FeatureFamily, FeatureKind, FeaturePool};
pub use lut::Lut;

use crate::config::{ConfigError, Param};
use crate::cv::PyramidScale;
use crate::io::{self, PersistError};

// =============================================================================
// ModelError
// =============================================================================

/// Inconsistent parameters or weak learners.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Param(#[from] ConfigError),

    #[error("expected LUTs for {expected} outputs, got {got}")]
    OutputMismatch { expected: usize, got: usize },

    #[error("LUT uses feature {feature} but the pool holds {n_features} features")]
    FeatureOutOfRange { feature: usize, n_features: usize },

    #[error("LUT has {got} entries, the feature family has {expected}")]
    EntryMismatch { expected: usize, got: usize },
}

// =============================================================================
// Model
// =============================================================================

/// Boosted LUT model over a feature pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    param: Param,
    pool: FeaturePool,
    luts: Vec<Vec<Lut>>,
}

impl Model {
    /// Untrained model with `n_outputs` empty LUT lists.
    pub fn new(param: Param, family: FeatureFamily, n_outputs: usize) -> Self {
        let pool = FeaturePool::coarsest(family, param.rows, param.cols, 1 << param.projections);
        Self {
            param,
            pool,
            luts: vec![Vec::new(); n_outputs],
        }
    }

    pub(crate) fn from_parts(
        param: Param,
        family: FeatureFamily,
        step: usize,
        luts: Vec<Vec<Lut>>,
    ) -> Result<Self, ModelError> {
        param.validate()?;
        let pool = FeaturePool::new(family, param.rows, param.cols, step);
        let mut model = Self {
            param,
            pool,
            luts: vec![Vec::new(); luts.len()],
        };
        model.set_luts(luts)?;
        Ok(model)
    }

    #[inline]
    pub fn param(&self) -> &Param {
        &self.param
    }

    #[inline]
    pub fn family(&self) -> FeatureFamily {
        self.pool.family()
    }

    /// Grid step of the current feature pool.
    #[inline]
    pub fn step(&self) -> usize {
        self.pool.step()
    }

    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.luts.len()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.pool.len()
    }

    /// Number of distinct values of every feature.
    #[inline]
    pub fn n_fvalues(&self) -> usize {
        self.pool.family().n_entries()
    }

    pub fn pool(&self) -> &FeaturePool {
        &self.pool
    }

    pub fn luts(&self) -> &[Vec<Lut>] {
        &self.luts
    }

    /// Replace the weak learners.
    pub fn set_luts(&mut self, luts: Vec<Vec<Lut>>) -> Result<(), ModelError> {
        if luts.len() != self.n_outputs() {
            return Err(ModelError::OutputMismatch {
                expected: self.n_outputs(),
                got: luts.len(),
            });
        }
        for lut in luts.iter().flatten() {
            if lut.feature() >= self.n_features() {
                return Err(ModelError::FeatureOutOfRange {
                    feature: lut.feature(),
                    n_features: self.n_features(),
                });
            }
            if lut.n_entries() != self.n_fvalues() {
                return Err(ModelError::EntryMismatch {
                    expected: self.n_fvalues(),
                    got: lut.n_entries(),
                });
            }
        }
        self.luts = luts;
        Ok(())
    }

    /// Indices of the features used by at least one LUT, sorted.
    pub fn selected_features(&self) -> Vec<usize> {
        let mut features: Vec<usize> = self.luts.iter().flatten().map(Lut::feature).collect();
        features.sort_unstable();
        features.dedup();
        features
    }

    /// Bind the model to one pyramid level for scoring.
    pub fn preprocess<'a>(&'a self, scale: &'a PyramidScale) -> ModelScorer<'a> {
        ModelScorer { model: self, scale }
    }

    /// Move to the next finer feature pool.
    ///
    /// The step is halved and every LUT is remapped to the same feature in
    /// the finer pool. Returns `false` when the pool is already at full
    /// resolution.
    pub fn project(&mut self) -> bool {
        let step = self.pool.step();
        if step <= 1 {
            return false;
        }

        let finer = FeaturePool::new(self.family(), self.param.rows, self.param.cols, step / 2);
        let index = finer.index();

        let mut luts = self.luts.clone();
        for lut in luts.iter_mut().flatten() {
            let Some(f) = self
                .pool
                .get(lut.feature())
                .and_then(|feature| index.get(feature))
            else {
                return false;
            };
            lut.set_feature(*f);
        }

        log::debug!(
            "projected feature pool: step {} -> {}, {} -> {} features",
            step,
            finer.step(),
            self.pool.len(),
            finer.len()
        );
        self.pool = finer;
        self.luts = luts;
        true
    }

    /// Save to `path`, choosing the format from its extension.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        io::save_model(self, path)
    }

    /// Load from `path`, choosing the format from its extension.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        io::load_model(path)
    }
}

// =============================================================================
// ModelScorer
// =============================================================================

/// A model bound to one pyramid level.
///
/// Coordinates are the top-left corner of the model window at that level and
/// must keep the window inside the level.
#[derive(Debug, Clone, Copy)]
pub struct ModelScorer<'a> {
    model: &'a Model,
    scale: &'a PyramidScale,
}

impl ModelScorer<'_> {
    pub fn model(&self) -> &Model {
        self.model
    }

    /// Code of feature `f` on the window at `(x, y)`.
    #[inline]
    pub fn fvalue(&self, f: usize, x: usize, y: usize) -> u16 {
        self.model.pool.features()[f].eval(&self.scale.integral, x, y)
    }

    /// Score of output `o` on the window at `(x, y)`.
    pub fn score(&self, o: usize, x: usize, y: usize) -> f64 {
        self.model.luts[o]
            .iter()
            .map(|lut| lut.eval(self.fvalue(lut.feature(), x, y)))
            .sum()
    }

    /// Scores of every output on the window at `(x, y)`.
    pub fn scores(&self, x: usize, y: usize, out: &mut [f64]) {
        for (o, score) in out.iter_mut().enumerate().take(self.model.n_outputs()) {
            *score = self.score(o, x, y);
        }
    }
}
