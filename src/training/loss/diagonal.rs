//! Diagonal losses: the sum over outputs of a scalar loss.

use super::Loss;

/// Misclassification indicator: `0` when target and score agree in sign.
#[inline]
pub fn classification_error(target: f64, score: f64) -> f64 {
    if target * score > 0.0 {
        0.0
    } else {
        1.0
    }
}

/// Absolute regression error.
#[inline]
pub fn regression_error(target: f64, score: f64) -> f64 {
    (target - score).abs()
}

// =============================================================================
// ScalarLoss
// =============================================================================

/// A univariate loss `l(target, score)`.
///
/// The three evaluation levels must agree on the value: `value_deriv1` and
/// `value_deriv2` return the same value as `value` plus the first (and
/// second) derivative w.r.t. the score.
pub trait ScalarLoss: Send + Sync {
    /// Reporting error.
    fn error(&self, target: f64, score: f64) -> f64;

    /// Loss value.
    fn value(&self, target: f64, score: f64) -> f64;

    /// `(value, deriv1)`.
    fn value_deriv1(&self, target: f64, score: f64) -> (f64, f64);

    /// `(value, deriv1, deriv2)`.
    fn value_deriv2(&self, target: f64, score: f64) -> (f64, f64, f64);
}

/// Exponential loss `exp(-t·s)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagExp;

impl ScalarLoss for DiagExp {
    fn error(&self, target: f64, score: f64) -> f64 {
        classification_error(target, score)
    }

    fn value(&self, target: f64, score: f64) -> f64 {
        (-target * score).exp()
    }

    fn value_deriv1(&self, target: f64, score: f64) -> (f64, f64) {
        let v = (-target * score).exp();
        (v, -target * v)
    }

    fn value_deriv2(&self, target: f64, score: f64) -> (f64, f64, f64) {
        let v = (-target * score).exp();
        (v, -target * v, target * target * v)
    }
}

/// Logistic loss `log(1 + exp(-t·s))`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagLog;

impl ScalarLoss for DiagLog {
    fn error(&self, target: f64, score: f64) -> f64 {
        classification_error(target, score)
    }

    fn value(&self, target: f64, score: f64) -> f64 {
        (-target * score).exp().ln_1p()
    }

    fn value_deriv1(&self, target: f64, score: f64) -> (f64, f64) {
        let e = (-target * score).exp();
        let norm = 1.0 / (1.0 + e);
        (e.ln_1p(), -target * e * norm)
    }

    fn value_deriv2(&self, target: f64, score: f64) -> (f64, f64, f64) {
        let e = (-target * score).exp();
        let norm = 1.0 / (1.0 + e);
        (
            e.ln_1p(),
            -target * e * norm,
            target * target * e * norm * norm,
        )
    }
}

/// Symmetric exponential loss `exp(s-t) + exp(t-s) - 2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagSymExp;

impl ScalarLoss for DiagSymExp {
    fn error(&self, target: f64, score: f64) -> f64 {
        regression_error(target, score)
    }

    fn value(&self, target: f64, score: f64) -> f64 {
        let e = (score - target).exp();
        e + 1.0 / e - 2.0
    }

    fn value_deriv1(&self, target: f64, score: f64) -> (f64, f64) {
        let e = (score - target).exp();
        let ie = 1.0 / e;
        (e + ie - 2.0, e - ie)
    }

    fn value_deriv2(&self, target: f64, score: f64) -> (f64, f64, f64) {
        let e = (score - target).exp();
        let ie = 1.0 / e;
        (e + ie - 2.0, e - ie, e + ie)
    }
}

/// Symmetric logistic loss `log(2 + e + 1/e) - log 4` with `e = exp(s-t)`.
///
/// Calibrated to be exactly zero when `score == target`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagSymLog;

impl DiagSymLog {
    #[inline]
    fn base(e: f64) -> f64 {
        (2.0 + e + 1.0 / e).ln() - 4.0f64.ln()
    }
}

impl ScalarLoss for DiagSymLog {
    fn error(&self, target: f64, score: f64) -> f64 {
        regression_error(target, score)
    }

    fn value(&self, target: f64, score: f64) -> f64 {
        Self::base((score - target).exp())
    }

    fn value_deriv1(&self, target: f64, score: f64) -> (f64, f64) {
        let e = (score - target).exp();
        let norm = 1.0 / (1.0 + e);
        (Self::base(e), (e - 1.0) * norm)
    }

    fn value_deriv2(&self, target: f64, score: f64) -> (f64, f64, f64) {
        let e = (score - target).exp();
        let norm = 1.0 / (1.0 + e);
        (Self::base(e), (e - 1.0) * norm, 2.0 * e * norm * norm)
    }
}

// =============================================================================
// Diagonal
// =============================================================================

/// Sum over outputs of a [`ScalarLoss`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagonal<L>(pub L);

impl<L: ScalarLoss> Loss for Diagonal<L> {
    fn error(&self, targets: &[f64], scores: &[f64]) -> f64 {
        debug_assert_eq!(targets.len(), scores.len());
        targets
            .iter()
            .zip(scores)
            .map(|(&t, &s)| self.0.error(t, s))
            .sum()
    }

    fn value(&self, targets: &[f64], scores: &[f64]) -> f64 {
        debug_assert_eq!(targets.len(), scores.len());
        targets
            .iter()
            .zip(scores)
            .map(|(&t, &s)| self.0.value(t, s))
            .sum()
    }

    fn value_grad(&self, targets: &[f64], scores: &[f64], grad: &mut [f64]) -> f64 {
        debug_assert_eq!(targets.len(), scores.len());
        debug_assert_eq!(grad.len(), scores.len());
        let mut value = 0.0;
        for ((&t, &s), g) in targets.iter().zip(scores).zip(grad.iter_mut()) {
            let (v, d1) = self.0.value_deriv1(t, s);
            value += v;
            *g = d1;
        }
        value
    }

    fn name(&self) -> &'static str {
        "diagonal"
    }
}
