//! Loss functions for LUT boosting.
//!
//! Every loss is evaluated per sample on a target vector and a score vector of
//! the same length (`n_outputs`). It exposes:
//!
//! - an **error** used for reporting (0/1 misclassification, absolute or
//!   normalized keypoint distance), independent of the loss smoothness
//! - a differentiable **value** and its **gradient** w.r.t. the scores, used
//!   to score candidate LUTs and drive the line search
//!
//! # Available Losses
//!
//! ## Diagonal (sum over outputs of a scalar loss)
//! - [`DiagExp`]: exponential loss `exp(-t·s)`
//! - [`DiagLog`]: logistic loss `log(1 + exp(-t·s))`
//! - [`DiagSymExp`]: symmetric exponential `exp(s-t) + exp(t-s) - 2`
//! - [`DiagSymLog`]: symmetric logistic `log(2 + e + 1/e) - log 4`, `e = exp(s-t)`
//!
//! ## Keypoint regression
//! - [`Jesorsky`]: keypoint distance normalized by the inter-eye distance
//!
//! # Sign Convention
//!
//! Derivatives are taken w.r.t. the score. A Newton-like step on one output
//! moves the score by `-deriv1 / deriv2`.

mod diagonal;
mod jesorsky;

pub use diagonal::{
    classification_error, regression_error, DiagExp, DiagLog, DiagSymExp, DiagSymLog, Diagonal,
    ScalarLoss,
};
pub use jesorsky::Jesorsky;

// =============================================================================
// Loss Trait
// =============================================================================

/// A multivariate loss over `n_outputs` scores of one sample.
///
/// Implementations are pure functions of their inputs and hold no mutable
/// state, so a single instance can be shared by every worker thread.
pub trait Loss: Send + Sync {
    /// Reporting error for one sample.
    fn error(&self, targets: &[f64], scores: &[f64]) -> f64;

    /// Loss value for one sample.
    fn value(&self, targets: &[f64], scores: &[f64]) -> f64;

    /// Loss value for one sample; writes the gradient w.r.t. each score into
    /// `grad` (same length as `scores`).
    fn value_grad(&self, targets: &[f64], scores: &[f64], grad: &mut [f64]) -> f64;

    /// Registered name of the loss.
    fn name(&self) -> &'static str;
}

// =============================================================================
// LossKind Enum
// =============================================================================

/// Loss selected by name in the training parameters.
///
/// Wraps every available loss and implements [`Loss`] by delegating to the
/// concrete type.
///
/// # Example
///
/// ```
/// use visioner::training::{Loss, LossKind};
///
/// let loss = LossKind::DiagSymLog;
/// assert_eq!(loss.value(&[1.0], &[1.0]), 0.0);
/// assert_eq!(loss.name(), "diag_symlog");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum LossKind {
    /// Exponential loss for classification.
    DiagExp,
    /// Logistic loss for classification.
    #[default]
    DiagLog,
    /// Symmetric exponential loss for regression.
    DiagSymExp,
    /// Symmetric logistic loss for regression.
    DiagSymLog,
    /// Normalized keypoint distance for facial feature localization.
    Jesorsky,
}

impl LossKind {
    /// Every loss, in registration order.
    pub const ALL: [LossKind; 5] = [
        Self::DiagExp,
        Self::DiagLog,
        Self::DiagSymLog,
        Self::DiagSymExp,
        Self::Jesorsky,
    ];

    /// Whether the error reports misclassification (as opposed to a distance).
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::DiagExp | Self::DiagLog)
    }

    /// One-line description for listings.
    pub fn description(&self) -> &'static str {
        match self {
            Self::DiagExp => "diagonal exponential loss (classification)",
            Self::DiagLog => "diagonal logistic loss (classification)",
            Self::DiagSymLog => "diagonal symmetric logistic loss (regression)",
            Self::DiagSymExp => "diagonal symmetric exponential loss (regression)",
            Self::Jesorsky => "keypoint distance normalized by the eye distance (localization)",
        }
    }
}

impl Loss for LossKind {
    fn error(&self, targets: &[f64], scores: &[f64]) -> f64 {
        match self {
            Self::DiagExp => Diagonal(DiagExp).error(targets, scores),
            Self::DiagLog => Diagonal(DiagLog).error(targets, scores),
            Self::DiagSymExp => Diagonal(DiagSymExp).error(targets, scores),
            Self::DiagSymLog => Diagonal(DiagSymLog).error(targets, scores),
            Self::Jesorsky => Jesorsky.error(targets, scores),
        }
    }

    fn value(&self, targets: &[f64], scores: &[f64]) -> f64 {
        match self {
            Self::DiagExp => Diagonal(DiagExp).value(targets, scores),
            Self::DiagLog => Diagonal(DiagLog).value(targets, scores),
            Self::DiagSymExp => Diagonal(DiagSymExp).value(targets, scores),
            Self::DiagSymLog => Diagonal(DiagSymLog).value(targets, scores),
            Self::Jesorsky => Jesorsky.value(targets, scores),
        }
    }

    fn value_grad(&self, targets: &[f64], scores: &[f64], grad: &mut [f64]) -> f64 {
        match self {
            Self::DiagExp => Diagonal(DiagExp).value_grad(targets, scores, grad),
            Self::DiagLog => Diagonal(DiagLog).value_grad(targets, scores, grad),
            Self::DiagSymExp => Diagonal(DiagSymExp).value_grad(targets, scores, grad),
            Self::DiagSymLog => Diagonal(DiagSymLog).value_grad(targets, scores, grad),
            Self::Jesorsky => Jesorsky.value_grad(targets, scores, grad),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::DiagExp => "diag_exp",
            Self::DiagLog => "diag_log",
            Self::DiagSymExp => "diag_symexp",
            Self::DiagSymLog => "diag_symlog",
            Self::Jesorsky => "jesorsky",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LossKind::DiagExp)]
    #[case(LossKind::DiagLog)]
    #[case(LossKind::DiagSymExp)]
    #[case(LossKind::DiagSymLog)]
    fn value_grad_matches_value(#[case] loss: LossKind) {
        let targets = [1.0, -1.0, 1.0];
        let scores = [0.3, 0.4, -2.0];
        let mut grad = [0.0; 3];

        let v = loss.value(&targets, &scores);
        let vg = loss.value_grad(&targets, &scores, &mut grad);
        assert_eq!(v, vg);
    }

    #[rstest]
    #[case(LossKind::DiagExp)]
    #[case(LossKind::DiagLog)]
    #[case(LossKind::DiagSymExp)]
    #[case(LossKind::DiagSymLog)]
    #[case(LossKind::Jesorsky)]
    fn gradient_matches_finite_differences(#[case] loss: LossKind) {
        let targets = [0.2, 0.3, 0.6, 0.35, 0.4, 0.7];
        let scores = [0.25, 0.28, 0.55, 0.4, 0.42, 0.6];
        let mut grad = [0.0; 6];
        loss.value_grad(&targets, &scores, &mut grad);

        let h = 1e-6;
        for o in 0..scores.len() {
            let mut up = scores;
            let mut down = scores;
            up[o] += h;
            down[o] -= h;
            let numeric = (loss.value(&targets, &up) - loss.value(&targets, &down)) / (2.0 * h);
            assert!(
                (numeric - grad[o]).abs() < 1e-5,
                "{}: output {o}: numeric {numeric} vs analytic {}",
                loss.name(),
                grad[o]
            );
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = LossKind::ALL.iter().map(|l| l.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LossKind::ALL.len());
    }

    #[test]
    fn classification_error_counts_sign_mismatches() {
        let loss = LossKind::DiagLog;
        assert_eq!(loss.error(&[1.0, -1.0, 1.0], &[0.5, 0.5, -0.1]), 2.0);
        assert!(loss.is_classification());
        assert!(!LossKind::DiagSymLog.is_classification());
    }
}
