//! Testing utilities for visioner.
//!
//! Assertion helpers shared by unit tests, integration tests and benchmarks,
//! plus small synthetic fixtures.
//!
//! # Usage
//!
//! ```
//! use visioner::testing::{assert_approx_eq, DEFAULT_TOLERANCE};
//!
//! assert_approx_eq!(0.1 + 0.2, 0.3);
//! assert_approx_eq!(1.0, 1.0001, 1e-3);
//! ```

use crate::data::{DataSet, Matrix};

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for floating point comparisons of O(1) values.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Floating Point Assertions
// =============================================================================

/// Assert that two f64 values are approximately equal.
///
/// Uses absolute difference comparison with the given tolerance, or
/// [`DEFAULT_TOLERANCE`] when omitted.
///
/// # Panics
///
/// Panics if the absolute difference exceeds tolerance.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_approx_eq!($left, $right, $crate::testing::DEFAULT_TOLERANCE)
    };
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

pub use crate::assert_approx_eq;

/// Assert that two slices of f64 values are approximately equal element-wise.
///
/// # Panics
///
/// Panics if lengths differ or any element differs by more than tolerance.
pub fn assert_slice_approx_eq(actual: &[f64], expected: &[f64], tolerance: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch - got {}, expected {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (a - e).abs();
        assert!(
            diff <= tolerance,
            "{context}[{i}]: {a} ≠ {e} (diff={diff}, tolerance={tolerance})"
        );
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Deterministic pseudo-random dataset for property tests and benchmarks.
///
/// Targets are `±1` per output; feature values are drawn from a 64-bit LCG so
/// the same `seed` always yields the same data without a `rand` dependency in
/// library code.
pub fn synthetic_dataset(
    n_samples: usize,
    n_outputs: usize,
    n_features: usize,
    n_entries: usize,
    seed: u64,
) -> DataSet {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };

    let targets: Vec<f64> = (0..n_samples * n_outputs)
        .map(|_| if next() % 2 == 0 { 1.0 } else { -1.0 })
        .collect();
    let costs: Vec<f64> = (0..n_samples).map(|_| 0.5 + (next() % 4) as f64 * 0.25).collect();
    let fvalues: Vec<u16> = (0..n_features * n_samples)
        .map(|_| (next() % n_entries) as u16)
        .collect();

    DataSet::new(
        Matrix::from_vec(targets, n_samples, n_outputs),
        costs,
        Matrix::from_vec(fvalues, n_features, n_samples),
        n_entries,
    )
    .expect("synthetic dataset is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_macro() {
        assert_approx_eq!(1.0, 1.0001, 0.001);
        assert_approx_eq!(0.0, 0.0);
        assert_approx_eq!(-1.5, -1.5001, 0.001, "value {}", 3);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.0, 2.0, 0.1);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f64::NAN, 1.0);
    }

    #[test]
    fn synthetic_dataset_is_deterministic() {
        let a = synthetic_dataset(50, 2, 7, 16, 3);
        let b = synthetic_dataset(50, 2, 7, 16, 3);
        assert_eq!(a.n_samples(), 50);
        assert_eq!(a.n_features(), 7);
        for f in 0..7 {
            assert_eq!(a.fvalues(f), b.fvalues(f));
        }
        assert_eq!(a.targets(), b.targets());
    }
}
