//! LUT boosting problem: feature selection and line-search objective.
//!
//! A boosting round on a [`LutProblem`] goes through:
//!
//! 1. `update_loss_deriv`: loss value and gradient of every sample at the
//!    current scores, scaled by the sample cost
//! 2. `select`: score every feature by the loss decrease its gradient
//!    histogram promises, pick the best one (per output or shared), and set up
//!    the round's LUTs with the sign of the histogram
//! 3. `linesearch(x, g)`: objective value and directional derivative for
//!    per-output step sizes `x`, consumed by a step optimizer
//! 4. `update_scores(x)`: commit the scaled LUTs and their scores
//!
//! # Parallelism
//!
//! Every pass over samples or features goes through a [`ThreadLoop`]: each
//! worker owns a contiguous block of rows of the buffer it writes (values and
//! gradients per sample, loss deltas per feature), and every reduction over
//! samples runs sequentially in index order. The selected features and LUT
//! entries are therefore identical whatever the thread count.
//!
//! # Layout
//!
//! Scores and gradients are `n_samples × n_outputs`, row-major, so the
//! gradient of one sample is a contiguous slice handed to the loss.

use serde::{Deserialize, Serialize};

use crate::data::{DataSet, Matrix};
use crate::model::Lut;
use crate::training::loss::{Jesorsky, Loss, LossKind};
use crate::utils::ThreadLoop;

// =============================================================================
// Types
// =============================================================================

/// Whether outputs select their features independently or share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureSharing {
    /// Every output picks its own best feature.
    Independent,
    /// One feature, minimizing the summed loss decrease, for all outputs.
    #[default]
    Shared,
}

impl FeatureSharing {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Independent => "indep",
            Self::Shared => "shared",
        }
    }
}

/// How the LUT problem scores candidate features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OptimizationType {
    /// Expected loss decrease from the first-order gradient histogram.
    #[default]
    Expectation,
}

impl OptimizationType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Expectation => "ept",
        }
    }
}

/// Errors raised when a LUT problem cannot be built from its inputs.
#[derive(Debug, thiserror::Error)]
pub enum ProblemError {
    #[error("dataset has no samples")]
    NoSamples,

    #[error("dataset has no features")]
    NoFeatures,

    #[error("loss {loss} cannot be evaluated on {n_outputs} outputs")]
    IncompatibleLoss { loss: &'static str, n_outputs: usize },

    #[error("sample {sample} has coincident eye keypoints")]
    DegenerateEyes { sample: usize },

    #[error("expected {expected} step sizes, got {got}")]
    StepLenMismatch { expected: usize, got: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

// =============================================================================
// Shared state
// =============================================================================

/// State common to every LUT problem variant.
///
/// - `sscores`: committed scores of the model trained so far
/// - `wscores`: scores of the round's (unscaled) LUTs
/// - `cscores`: `sscores + x · wscores` for the step `x` under evaluation
#[derive(Debug)]
pub struct LutProblemState<'a> {
    data: &'a DataSet,
    loss: LossKind,
    sharing: FeatureSharing,
    threads: ThreadLoop,

    sscores: Matrix<f64>,
    cscores: Matrix<f64>,
    wscores: Matrix<f64>,

    luts: Vec<Lut>,
    mluts: Vec<Vec<Lut>>,

    umasks: Matrix<f64>,
}

impl<'a> LutProblemState<'a> {
    /// Build the state and validate the inputs.
    pub fn new(
        data: &'a DataSet,
        loss: LossKind,
        sharing: FeatureSharing,
        threads: usize,
    ) -> Result<Self, ProblemError> {
        let n_samples = data.n_samples();
        let n_outputs = data.n_outputs();
        let n_features = data.n_features();
        let n_entries = data.n_entries();

        if n_samples == 0 {
            return Err(ProblemError::NoSamples);
        }
        if n_features == 0 {
            return Err(ProblemError::NoFeatures);
        }
        if loss == LossKind::Jesorsky && (n_outputs < 4 || n_outputs % 2 != 0) {
            return Err(ProblemError::IncompatibleLoss {
                loss: loss.name(),
                n_outputs,
            });
        }
        if loss == LossKind::Jesorsky {
            if let Some(sample) = (0..n_samples).find(|&s| Jesorsky::eye_dist(data.target(s)) <= 0.0) {
                return Err(ProblemError::DegenerateEyes { sample });
            }
        }

        let threads = ThreadLoop::new(threads)?;

        // Feature values never taken by a training sample get a zero response
        let mut umasks = Matrix::new(n_features, n_entries);
        threads.for_rows_mut(umasks.as_mut_slice(), n_entries, |range, rows| {
            for (f, mask) in range.zip(rows.chunks_exact_mut(n_entries)) {
                for &u in data.fvalues(f) {
                    mask[u as usize] = 1.0;
                }
            }
        });

        Ok(Self {
            data,
            loss,
            sharing,
            threads,
            sscores: Matrix::new(n_samples, n_outputs),
            cscores: Matrix::new(n_samples, n_outputs),
            wscores: Matrix::new(n_samples, n_outputs),
            luts: (0..n_outputs).map(|_| Lut::new(0, n_entries)).collect(),
            mluts: vec![Vec::new(); n_outputs],
            umasks,
        })
    }

    #[inline]
    pub fn data(&self) -> &'a DataSet {
        self.data
    }

    #[inline]
    pub fn loss(&self) -> LossKind {
        self.loss
    }

    #[inline]
    pub fn sharing(&self) -> FeatureSharing {
        self.sharing
    }

    #[inline]
    pub fn threads(&self) -> &ThreadLoop {
        &self.threads
    }

    /// LUTs set up by the last selection, one per output.
    #[inline]
    pub fn luts(&self) -> &[Lut] {
        &self.luts
    }

    /// Committed LUTs per output.
    #[inline]
    pub fn mluts(&self) -> &[Vec<Lut>] {
        &self.mluts
    }

    #[inline]
    pub fn sscores(&self) -> &Matrix<f64> {
        &self.sscores
    }

    #[inline]
    pub fn wscores(&self) -> &Matrix<f64> {
        &self.wscores
    }

    #[inline]
    pub fn cscores(&self) -> &Matrix<f64> {
        &self.cscores
    }

    /// `1` if some training sample takes value `u` on feature `f`, else `0`.
    #[inline]
    pub fn umask(&self, f: usize, u: usize) -> f64 {
        self.umasks[(f, u)]
    }

    fn check_steps(&self, x: &[f64]) -> Result<(), ProblemError> {
        if x.len() != self.data.n_outputs() {
            return Err(ProblemError::StepLenMismatch {
                expected: self.data.n_outputs(),
                got: x.len(),
            });
        }
        Ok(())
    }

    /// Scores of the current LUTs on every sample.
    pub fn update_wscores(&mut self) {
        let Self {
            data,
            threads,
            wscores,
            luts,
            ..
        } = self;
        let data = *data;
        let n_outputs = data.n_outputs();
        let luts: &[Lut] = luts;

        threads.for_rows_mut(wscores.as_mut_slice(), n_outputs, |range, rows| {
            for (s, row) in range.zip(rows.chunks_exact_mut(n_outputs)) {
                for (o, w) in row.iter_mut().enumerate() {
                    let lut = &luts[o];
                    *w = lut.eval(data.fvalue(lut.feature(), s));
                }
            }
        });
    }

    /// `cscores = sscores + x · wscores`, per output.
    pub fn update_cscores(&mut self, x: &[f64]) {
        debug_assert_eq!(x.len(), self.data.n_outputs());
        let Self {
            data,
            threads,
            sscores,
            cscores,
            wscores,
            ..
        } = self;
        let data = *data;
        let n_outputs = data.n_outputs();
        let sscores: &Matrix<f64> = sscores;
        let wscores: &Matrix<f64> = wscores;

        threads.for_rows_mut(cscores.as_mut_slice(), n_outputs, |range, rows| {
            for (s, row) in range.zip(rows.chunks_exact_mut(n_outputs)) {
                let ss = sscores.row(s);
                let ws = wscores.row(s);
                for o in 0..n_outputs {
                    row[o] = ss[o] + x[o] * ws[o];
                }
            }
        });
    }

    /// Commit the current LUTs scaled by the step sizes `x`.
    pub fn update_scores(&mut self, x: &[f64]) -> Result<(), ProblemError> {
        self.check_steps(x)?;

        for (o, lut) in self.luts.iter().enumerate() {
            self.mluts[o].push(lut.scaled(x[o]));
        }

        let Self {
            data,
            threads,
            sscores,
            wscores,
            ..
        } = self;
        let data = *data;
        let n_outputs = data.n_outputs();
        let wscores: &Matrix<f64> = wscores;

        threads.for_rows_mut(sscores.as_mut_slice(), n_outputs, |range, rows| {
            for (s, row) in range.zip(rows.chunks_exact_mut(n_outputs)) {
                let ws = wscores.row(s);
                for o in 0..n_outputs {
                    row[o] += x[o] * ws[o];
                }
            }
        });
        Ok(())
    }

    /// Commit externally trained LUTs (one per output), already scaled.
    ///
    /// Used to replay a training model on a validation problem.
    pub fn add_luts(&mut self, luts: &[Lut]) {
        debug_assert_eq!(luts.len(), self.data.n_outputs());
        for (o, lut) in luts.iter().enumerate() {
            self.mluts[o].push(lut.clone());
        }

        let Self {
            data,
            threads,
            sscores,
            ..
        } = self;
        let data = *data;
        let n_outputs = data.n_outputs();

        threads.for_rows_mut(sscores.as_mut_slice(), n_outputs, |range, rows| {
            for (s, row) in range.zip(rows.chunks_exact_mut(n_outputs)) {
                for (o, lut) in luts.iter().enumerate() {
                    row[o] += lut.eval(data.fvalue(lut.feature(), s));
                }
            }
        });
    }
}

// =============================================================================
// LutProblem Trait
// =============================================================================

/// A boosting problem over discrete-valued features.
///
/// Implementations differ in how they score candidate features; the score
/// bookkeeping is shared through [`LutProblemState`].
pub trait LutProblem {
    fn state(&self) -> &LutProblemState<'_>;

    /// Loss values and gradients at the committed scores.
    fn update_loss_deriv(&mut self);

    /// Loss values at the committed scores.
    fn update_loss(&mut self);

    /// Select the round's feature(s) and set up the LUTs.
    fn select(&mut self);

    /// Objective value at step sizes `x`; fills `g` with its derivative
    /// w.r.t. each step size.
    fn linesearch(&mut self, x: &[f64], g: &mut [f64]) -> f64;

    /// Mean cost-weighted loss over samples and outputs.
    fn value(&self) -> f64;

    /// Mean cost-weighted error over samples and outputs.
    fn error(&self) -> f64;

    /// Commit the current LUTs scaled by the step sizes `x`.
    fn update_scores(&mut self, x: &[f64]) -> Result<(), ProblemError>;

    /// Commit already-scaled LUTs, one per output.
    fn add_luts(&mut self, luts: &[Lut]);

    // =========================================================================
    // Provided
    // =========================================================================

    #[inline]
    fn n_samples(&self) -> usize {
        self.state().data().n_samples()
    }

    #[inline]
    fn n_outputs(&self) -> usize {
        self.state().data().n_outputs()
    }

    #[inline]
    fn n_features(&self) -> usize {
        self.state().data().n_features()
    }

    #[inline]
    fn n_entries(&self) -> usize {
        self.state().data().n_entries()
    }

    /// LUTs set up by the last selection.
    fn luts(&self) -> &[Lut] {
        self.state().luts()
    }

    /// Committed LUTs per output.
    fn mluts(&self) -> &[Vec<Lut>] {
        self.state().mluts()
    }
}

// =============================================================================
// LutProblemEpt
// =============================================================================

/// LUT problem scoring features by the expected first-order loss decrease.
///
/// For a feature `f`, the gradient histogram `h(u, o)` sums the gradient of
/// output `o` over the samples with `fvalue(f, s) == u`. Setting every LUT
/// entry to `-sign(h(u, o))` decreases the loss to first order by
/// `Σ_u |h(u, o)|`, which is the feature score.
///
/// # Example
///
/// ```
/// use visioner::data::{DataSet, Matrix};
/// use visioner::training::{FeatureSharing, LossKind, LutProblem, LutProblemEpt};
///
/// let targets = Matrix::from_vec(vec![1.0, 1.0, -1.0, -1.0], 4, 1);
/// let fvalues = Matrix::from_vec(vec![0u16, 1, 0, 1, 0, 0, 1, 1], 2, 4);
/// let data = DataSet::with_unit_costs(targets, fvalues, 2).unwrap();
///
/// let mut problem = LutProblemEpt::new(&data, LossKind::DiagExp, FeatureSharing::Shared, 0).unwrap();
/// problem.update_loss_deriv();
/// problem.select();
/// assert_eq!(problem.luts()[0].feature(), 1);
/// ```
#[derive(Debug)]
pub struct LutProblemEpt<'a> {
    state: LutProblemState<'a>,
    values: Vec<f64>,
    grad: Matrix<f64>,
    fldeltas: Matrix<f64>,
}

impl<'a> LutProblemEpt<'a> {
    pub fn new(
        data: &'a DataSet,
        loss: LossKind,
        sharing: FeatureSharing,
        threads: usize,
    ) -> Result<Self, ProblemError> {
        let state = LutProblemState::new(data, loss, sharing, threads)?;
        Ok(Self {
            state,
            values: vec![0.0; data.n_samples()],
            grad: Matrix::new(data.n_samples(), data.n_outputs()),
            fldeltas: Matrix::new(data.n_features(), data.n_outputs()),
        })
    }

    /// Cost-weighted loss value of every sample.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Cost-weighted loss gradient, `n_samples × n_outputs`.
    #[inline]
    pub fn grad(&self) -> &Matrix<f64> {
        &self.grad
    }

    /// Loss decrease estimate per feature and output from the last selection.
    #[inline]
    pub fn fldeltas(&self) -> &Matrix<f64> {
        &self.fldeltas
    }

    /// Gradient histogram of feature `f` into `histo` (`n_entries × n_outputs`).
    pub fn histo(&self, f: usize, histo: &mut Matrix<f64>) {
        gradient_histogram(self.state.data, &self.grad, f, histo);
    }

    /// Gradient histogram of feature `f`.
    pub fn histogram(&self, f: usize) -> Matrix<f64> {
        let mut histo = Matrix::new(self.n_entries(), self.n_outputs());
        self.histo(f, &mut histo);
        histo
    }

    /// Set up the LUT of output `o` on feature `f`.
    pub fn setup(&mut self, f: usize, o: usize) {
        assert!(f < self.n_features(), "feature {f} out of range");
        let histo = self.histogram(f);

        let n_entries = self.n_entries();
        let state = &mut self.state;
        let mut entries = Vec::with_capacity(n_entries);
        for u in 0..n_entries {
            let sign = if histo[(u, o)] > 0.0 { -1.0 } else { 1.0 };
            entries.push(sign * state.umasks[(f, u)]);
        }

        let lut = &mut state.luts[o];
        lut.set_feature(f);
        lut.entries_mut().copy_from_slice(&entries);
    }

    /// Loss values and gradients at the committed (`sscores`) or candidate
    /// (`cscores`) scores.
    fn eval_loss_deriv(&mut self, committed: bool) {
        let Self {
            state, values, grad, ..
        } = self;
        let data = state.data;
        let loss = state.loss;
        let n_outputs = data.n_outputs();
        let scores = if committed {
            &state.sscores
        } else {
            &state.cscores
        };

        state.threads.for_rows_mut_zip(
            values.as_mut_slice(),
            1,
            grad.as_mut_slice(),
            n_outputs,
            |range, vals, grads| {
                for ((s, v), g) in range
                    .zip(vals.iter_mut())
                    .zip(grads.chunks_exact_mut(n_outputs))
                {
                    let cost = data.cost(s);
                    *v = loss.value_grad(data.target(s), scores.row(s), g) * cost;
                    g.iter_mut().for_each(|gv| *gv *= cost);
                }
            },
        );
    }
}

/// Sum the gradient of every sample into the bin of its value on feature `f`.
fn gradient_histogram(data: &DataSet, grad: &Matrix<f64>, f: usize, histo: &mut Matrix<f64>) {
    debug_assert_eq!(histo.rows(), data.n_entries());
    debug_assert_eq!(histo.cols(), data.n_outputs());

    histo.fill(0.0);
    for (s, &u) in data.fvalues(f).iter().enumerate() {
        let bin = histo.row_mut(u as usize);
        for (h, g) in bin.iter_mut().zip(grad.row(s)) {
            *h += g;
        }
    }
}

/// Index of the first strictly smallest negative value, or `0`.
///
/// Starts from `(0, 0.0)`: when no value is negative the first index wins.
fn argmin_negative(values: impl Iterator<Item = f64>) -> usize {
    let mut bestf = 0;
    let mut besthv = 0.0;
    for (f, hv) in values.enumerate() {
        if hv < besthv {
            bestf = f;
            besthv = hv;
        }
    }
    bestf
}

impl LutProblem for LutProblemEpt<'_> {
    fn state(&self) -> &LutProblemState<'_> {
        &self.state
    }

    fn update_loss_deriv(&mut self) {
        self.eval_loss_deriv(true);
    }

    fn update_loss(&mut self) {
        let Self { state, values, .. } = self;
        let data = state.data;
        let loss = state.loss;
        let sscores = &state.sscores;

        state.threads.for_rows_mut(values.as_mut_slice(), 1, |range, vals| {
            for (s, v) in range.zip(vals.iter_mut()) {
                *v = loss.value(data.target(s), sscores.row(s)) * data.cost(s);
            }
        });
    }

    fn select(&mut self) {
        let n_features = self.n_features();
        let n_outputs = self.n_outputs();
        let n_entries = self.n_entries();

        self.fldeltas.resize(n_features, n_outputs);
        self.fldeltas.fill(0.0);

        {
            let Self {
                state,
                grad,
                fldeltas,
                ..
            } = self;
            let data = state.data;
            let grad: &Matrix<f64> = grad;

            state
                .threads
                .for_rows_mut(fldeltas.as_mut_slice(), n_outputs, |range, rows| {
                    let mut histo = Matrix::new(n_entries, n_outputs);
                    for (f, deltas) in range.zip(rows.chunks_exact_mut(n_outputs)) {
                        gradient_histogram(data, grad, f, &mut histo);
                        for bin in histo.iter_rows() {
                            for (d, h) in deltas.iter_mut().zip(bin) {
                                *d -= h.abs();
                            }
                        }
                    }
                });
        }

        match self.state.sharing {
            FeatureSharing::Independent => {
                for o in 0..n_outputs {
                    let bestf =
                        argmin_negative((0..n_features).map(|f| self.fldeltas[(f, o)]));
                    self.setup(bestf, o);
                }
            }
            FeatureSharing::Shared => {
                let bestf = argmin_negative(
                    self.fldeltas.iter_rows().map(|deltas| deltas.iter().sum::<f64>()),
                );
                for o in 0..n_outputs {
                    self.setup(bestf, o);
                }
            }
        }

        self.state.update_wscores();
    }

    fn linesearch(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
        debug_assert_eq!(g.len(), self.n_outputs());

        self.state.update_cscores(x);
        self.eval_loss_deriv(false);

        let fx = self.values.iter().sum();

        g.fill(0.0);
        for (grad, wscores) in self.grad.iter_rows().zip(self.state.wscores.iter_rows()) {
            for ((go, gs), ws) in g.iter_mut().zip(grad).zip(wscores) {
                *go += gs * ws;
            }
        }

        fx
    }

    fn value(&self) -> f64 {
        let norm = 1.0 / (self.n_samples() as f64 * self.n_outputs() as f64);
        self.values.iter().sum::<f64>() * norm
    }

    fn error(&self) -> f64 {
        let data = self.state.data;
        let loss = self.state.loss;
        let norm = 1.0 / (self.n_samples() as f64 * self.n_outputs() as f64);

        let sum: f64 = (0..data.n_samples())
            .map(|s| loss.error(data.target(s), self.state.sscores.row(s)) * data.cost(s))
            .sum();
        sum * norm
    }

    fn update_scores(&mut self, x: &[f64]) -> Result<(), ProblemError> {
        self.state.update_scores(x)
    }

    fn add_luts(&mut self, luts: &[Lut]) {
        self.state.add_luts(luts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assert_approx_eq;

    /// 4 samples, 2 features, 2 entries; feature 1 separates the targets.
    fn toy_data() -> DataSet {
        let targets = Matrix::from_vec(vec![1.0, 1.0, -1.0, -1.0], 4, 1);
        let fvalues = Matrix::from_vec(vec![0u16, 1, 0, 1, 0, 0, 1, 1], 2, 4);
        DataSet::with_unit_costs(targets, fvalues, 2).unwrap()
    }

    #[test]
    fn gradient_at_zero_scores() {
        let data = toy_data();
        let mut problem =
            LutProblemEpt::new(&data, LossKind::DiagExp, FeatureSharing::Shared, 0).unwrap();
        problem.update_loss_deriv();

        // exp(-t·0) = 1, d/ds = -t
        assert_eq!(problem.values(), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(problem.grad().as_slice(), &[-1.0, -1.0, 1.0, 1.0]);
        assert_approx_eq!(problem.value(), 1.0);
    }

    #[test]
    fn histogram_and_selection() {
        let data = toy_data();
        let mut problem =
            LutProblemEpt::new(&data, LossKind::DiagExp, FeatureSharing::Independent, 0).unwrap();
        problem.update_loss_deriv();

        // feature 0: bin 0 = {s0, s2}, bin 1 = {s1, s3}
        assert_eq!(problem.histogram(0).as_slice(), &[0.0, 0.0]);
        // feature 1: bin 0 = {s0, s1}, bin 1 = {s2, s3}
        assert_eq!(problem.histogram(1).as_slice(), &[-2.0, 2.0]);

        problem.select();
        assert_eq!(problem.fldeltas().as_slice(), &[0.0, -4.0]);

        let lut = &problem.luts()[0];
        assert_eq!(lut.feature(), 1);
        assert_eq!(lut.entries(), &[1.0, -1.0]);
        assert_eq!(problem.state().wscores().as_slice(), &[1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn unused_entries_are_masked() {
        let targets = Matrix::from_vec(vec![1.0, -1.0], 2, 1);
        let fvalues = Matrix::from_vec(vec![0u16, 2], 1, 2);
        let data = DataSet::with_unit_costs(targets, fvalues, 4).unwrap();
        let mut problem =
            LutProblemEpt::new(&data, LossKind::DiagLog, FeatureSharing::Shared, 0).unwrap();
        problem.update_loss_deriv();
        problem.select();

        assert_eq!(problem.luts()[0].entries(), &[1.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn linesearch_gradient_is_directional_derivative() {
        let data = toy_data();
        let mut problem =
            LutProblemEpt::new(&data, LossKind::DiagLog, FeatureSharing::Shared, 0).unwrap();
        problem.update_loss_deriv();
        problem.select();

        let mut g = [0.0];
        let x = [0.3];
        let fx = problem.linesearch(&x, &mut g);

        let h = 1e-6;
        let mut tmp = [0.0];
        let up = problem.linesearch(&[x[0] + h], &mut tmp);
        let down = problem.linesearch(&[x[0] - h], &mut tmp);
        assert_approx_eq!(g[0], (up - down) / (2.0 * h), 1e-6);
        // 4 samples, all correctly scored by 0.3
        assert_approx_eq!(fx, 4.0 * (-0.3f64).exp().ln_1p());
    }

    #[test]
    fn update_scores_commits_scaled_luts() {
        let data = toy_data();
        let mut problem =
            LutProblemEpt::new(&data, LossKind::DiagExp, FeatureSharing::Shared, 0).unwrap();
        problem.update_loss_deriv();
        problem.select();
        problem.update_scores(&[0.5]).unwrap();

        assert_eq!(problem.mluts()[0].len(), 1);
        assert_eq!(problem.mluts()[0][0].entries(), &[0.5, -0.5]);
        assert_eq!(problem.state().sscores().as_slice(), &[0.5, 0.5, -0.5, -0.5]);

        problem.update_loss();
        assert_approx_eq!(problem.value(), (-0.5f64).exp());
        assert_eq!(problem.error(), 0.0);

        let err = problem.update_scores(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, ProblemError::StepLenMismatch { expected: 1, got: 2 }));
    }

    #[test]
    fn jesorsky_needs_keypoint_outputs() {
        let targets = Matrix::from_vec(vec![0.0, 0.0], 1, 2);
        let fvalues = Matrix::from_vec(vec![0u16], 1, 1);
        let data = DataSet::with_unit_costs(targets, fvalues, 1).unwrap();
        let err =
            LutProblemEpt::new(&data, LossKind::Jesorsky, FeatureSharing::Shared, 0).unwrap_err();
        assert!(matches!(err, ProblemError::IncompatibleLoss { n_outputs: 2, .. }));
    }

    #[test]
    fn jesorsky_rejects_coincident_eyes() {
        // sample 1 has both eyes at (0.5, 0.5)
        let targets = Matrix::from_vec(
            vec![
                0.3, 0.4, 0.7, 0.4, 0.5, 0.7, //
                0.5, 0.5, 0.5, 0.5, 0.5, 0.8,
            ],
            2,
            6,
        );
        let fvalues = Matrix::from_vec(vec![0u16, 1], 1, 2);
        let data = DataSet::with_unit_costs(targets, fvalues, 2).unwrap();
        let err =
            LutProblemEpt::new(&data, LossKind::Jesorsky, FeatureSharing::Shared, 0).unwrap_err();
        assert!(matches!(err, ProblemError::DegenerateEyes { sample: 1 }));
    }

    #[test]
    fn argmin_keeps_first_and_defaults_to_zero() {
        assert_eq!(argmin_negative([-1.0, -3.0, -3.0, -2.0].into_iter()), 1);
        assert_eq!(argmin_negative([0.0, 1.0, 2.0].into_iter()), 0);
        assert_eq!(argmin_negative([1.0, -0.5].into_iter()), 1);
    }
}
