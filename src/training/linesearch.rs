//! Step-size optimization for boosting rounds.
//!
//! After a round's LUTs are selected, the boosting step sizes (one per
//! output) are found by minimizing `φ(x) = loss(sscores + x · wscores)`.
//! [`LineSearch`] runs `argmin`'s L-BFGS on `φ`, each iteration safeguarded
//! by a More–Thuente line search.
//!
//! The objective is supplied as an oracle `FnMut(x, g) -> φ(x)` that fills
//! `g` with `∇φ(x)`, which is exactly what
//! [`LutProblem::linesearch`](crate::training::LutProblem::linesearch) does.
//!
//! # Example
//!
//! ```
//! use visioner::training::{LineSearch, LineSearchConfig};
//!
//! // φ(x) = (x0 - 1)² + 4 (x1 + 2)²
//! let oracle = |x: &[f64], g: &mut [f64]| {
//!     g[0] = 2.0 * (x[0] - 1.0);
//!     g[1] = 8.0 * (x[1] + 2.0);
//!     (x[0] - 1.0).powi(2) + 4.0 * (x[1] + 2.0).powi(2)
//! };
//!
//! let config = LineSearchConfig::builder().max_iters(200).tolerance_cost(1e-14).build();
//! let search = LineSearch::new(config);
//! let result = search.minimize(2, oracle);
//! assert!((result.x[0] - 1.0).abs() < 1e-3);
//! assert!((result.x[1] + 2.0).abs() < 1e-3);
//! ```

use std::cell::RefCell;

use argmin::core::{CostFunction, Error, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use bon::Builder;

/// Line search settings.
#[derive(Debug, Clone, Builder)]
pub struct LineSearchConfig {
    /// Number of correction pairs kept by L-BFGS. Default: 7.
    #[builder(default = 7)]
    pub history: usize,

    /// Sufficient-decrease constant. Default: 1e-4.
    #[builder(default = 1e-4)]
    pub c1: f64,

    /// Curvature constant. Default: 0.9.
    #[builder(default = 0.9)]
    pub c2: f64,

    /// Maximum number of L-BFGS iterations. Default: 32.
    #[builder(default = 32)]
    pub max_iters: u64,

    /// Gradient norm below which the search stops. Default: 1e-8.
    #[builder(default = 1e-8)]
    pub tolerance_grad: f64,

    /// Change of the objective below which the search stops. Default: 1e-10.
    #[builder(default = 1e-10)]
    pub tolerance_cost: f64,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Outcome of a line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchResult {
    /// Step sizes, one per output.
    pub x: Vec<f64>,
    /// Objective at `x`.
    pub value: f64,
    /// Objective at the origin (no step).
    pub initial_value: f64,
    /// Number of L-BFGS iterations performed.
    pub iterations: u64,
}

impl LineSearchResult {
    /// Whether the steps strictly decrease the objective.
    pub fn decreased(&self) -> bool {
        self.value < self.initial_value
    }
}

// =============================================================================
// argmin adapter
// =============================================================================

struct Evaluation {
    x: Vec<f64>,
    value: f64,
    grad: Vec<f64>,
}

/// Exposes an oracle as an argmin problem.
///
/// argmin asks for the cost and the gradient separately; the oracle computes
/// both, so the last evaluation is cached.
struct StepObjective<'a, F> {
    oracle: RefCell<&'a mut F>,
    last: RefCell<Option<Evaluation>>,
}

impl<'a, F> StepObjective<'a, F>
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    fn new(oracle: &'a mut F) -> Self {
        Self {
            oracle: RefCell::new(oracle),
            last: RefCell::new(None),
        }
    }

    fn evaluate(&self, x: &[f64]) -> (f64, Vec<f64>) {
        if let Some(last) = self.last.borrow().as_ref() {
            if last.x == x {
                return (last.value, last.grad.clone());
            }
        }

        let mut grad = vec![0.0; x.len()];
        let value = (self.oracle.borrow_mut())(x, &mut grad);
        *self.last.borrow_mut() = Some(Evaluation {
            x: x.to_vec(),
            value,
            grad: grad.clone(),
        });
        (value, grad)
    }
}

impl<F> CostFunction for StepObjective<'_, F>
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.evaluate(x).0)
    }
}

impl<F> Gradient for StepObjective<'_, F>
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.evaluate(x).1)
    }
}

// =============================================================================
// LineSearch
// =============================================================================

/// L-BFGS over the per-output step sizes.
#[derive(Debug, Clone, Default)]
pub struct LineSearch {
    config: LineSearchConfig,
}

impl LineSearch {
    pub fn new(config: LineSearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LineSearchConfig {
        &self.config
    }

    /// Minimize the oracle over `n` step sizes, starting from the origin.
    ///
    /// A solver failure, or a result worse than the origin, leaves the steps
    /// at the origin.
    pub fn minimize<F>(&self, n: usize, mut oracle: F) -> LineSearchResult
    where
        F: FnMut(&[f64], &mut [f64]) -> f64,
    {
        let origin = vec![0.0; n];
        let mut g = vec![0.0; n];
        let initial_value = oracle(&origin, &mut g);

        let gmax = g.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if gmax <= 0.0 || !gmax.is_finite() || !initial_value.is_finite() {
            return LineSearchResult {
                x: origin,
                value: initial_value,
                initial_value,
                iterations: 0,
            };
        }

        let (mut x, iterations) = match self.run(origin.clone(), &mut oracle) {
            Ok(found) => found,
            Err(err) => {
                log::warn!("step size search failed: {err}");
                (origin, 0)
            }
        };

        // Leave the oracle evaluated at the returned step, not at a rejected trial
        let mut value = oracle(&x, &mut g);
        if value.is_nan() || value > initial_value {
            x = vec![0.0; n];
            value = oracle(&x, &mut g);
        }

        LineSearchResult {
            x,
            value,
            initial_value,
            iterations,
        }
    }

    fn run<F>(&self, x0: Vec<f64>, oracle: &mut F) -> Result<(Vec<f64>, u64), Error>
    where
        F: FnMut(&[f64], &mut [f64]) -> f64,
    {
        let cfg = &self.config;
        let linesearch = MoreThuenteLineSearch::new().with_c(cfg.c1, cfg.c2)?;
        let solver = LBFGS::new(linesearch, cfg.history)
            .with_tolerance_grad(cfg.tolerance_grad)?
            .with_tolerance_cost(cfg.tolerance_cost)?;

        let result = Executor::new(StepObjective::new(oracle), solver)
            .configure(|state| state.param(x0).max_iters(cfg.max_iters))
            .run()?;

        let state = result.state();
        let x = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| Error::msg("solver returned no parameters"))?;
        Ok((x, state.get_iter()))
    }
}
