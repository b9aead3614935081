//! Training samples for the LUT boosting engine.
//!
//! A [`DataSet`] holds, for each sample, its target vector, its cost (weight)
//! and one discretized value per feature. Feature values are stored
//! feature-major so that building the gradient histogram of one feature walks
//! a single contiguous row.

use ndarray::{ArrayView1, ArrayView2};

use super::Matrix;

/// Dataset construction/validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataSetError {
    #[error("number of costs ({costs}) does not match number of samples ({samples})")]
    CostLenMismatch { samples: usize, costs: usize },

    #[error("feature table has {got} samples, expected {expected}")]
    FeatureLenMismatch { expected: usize, got: usize },

    #[error("feature {feature} of sample {sample} has value {value}, outside [0, {n_entries})")]
    ValueOutOfRange {
        feature: usize,
        sample: usize,
        value: u16,
        n_entries: usize,
    },

    #[error("samples must have at least one output")]
    NoOutputs,

    #[error("number of feature values per feature must be positive")]
    NoEntries,

    #[error("cost of sample {sample} is not a finite non-negative number: {cost}")]
    InvalidCost { sample: usize, cost: f64 },
}

/// Discretized training samples.
///
/// # Invariants
///
/// - `targets` is `n_samples × n_outputs` with `n_outputs >= 1`
/// - `costs` has `n_samples` finite, non-negative entries
/// - `fvalues` is `n_features × n_samples` and every value is `< n_entries`
///
/// # Example
///
/// ```
/// use visioner::data::{DataSet, Matrix};
///
/// let targets = Matrix::from_vec(vec![1.0, -1.0], 2, 1);
/// let fvalues = Matrix::from_vec(vec![0u16, 1], 1, 2);
/// let data = DataSet::new(targets, vec![1.0, 1.0], fvalues, 2).unwrap();
///
/// assert_eq!(data.n_samples(), 2);
/// assert_eq!(data.fvalue(0, 1), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DataSet {
    targets: Matrix<f64>,
    costs: Vec<f64>,
    fvalues: Matrix<u16>,
    n_entries: usize,
}

impl DataSet {
    /// Create a dataset, validating every dimension and feature value.
    pub fn new(
        targets: Matrix<f64>,
        costs: Vec<f64>,
        fvalues: Matrix<u16>,
        n_entries: usize,
    ) -> Result<Self, DataSetError> {
        let n_samples = targets.rows();

        if targets.cols() == 0 {
            return Err(DataSetError::NoOutputs);
        }
        if n_entries == 0 {
            return Err(DataSetError::NoEntries);
        }
        if costs.len() != n_samples {
            return Err(DataSetError::CostLenMismatch {
                samples: n_samples,
                costs: costs.len(),
            });
        }
        if let Some((sample, &cost)) = costs
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_finite() || **c < 0.0)
        {
            return Err(DataSetError::InvalidCost { sample, cost });
        }
        if fvalues.rows() > 0 && fvalues.cols() != n_samples {
            return Err(DataSetError::FeatureLenMismatch {
                expected: n_samples,
                got: fvalues.cols(),
            });
        }
        for (feature, row) in fvalues.iter_rows().enumerate() {
            if let Some((sample, &value)) = row
                .iter()
                .enumerate()
                .find(|(_, v)| **v as usize >= n_entries)
            {
                return Err(DataSetError::ValueOutOfRange {
                    feature,
                    sample,
                    value,
                    n_entries,
                });
            }
        }

        Ok(Self {
            targets,
            costs,
            fvalues,
            n_entries,
        })
    }

    /// Create a dataset from ndarray views.
    ///
    /// `targets` is `n_samples × n_outputs`, `fvalues` is `n_features × n_samples`.
    pub fn from_arrays(
        targets: ArrayView2<'_, f64>,
        costs: ArrayView1<'_, f64>,
        fvalues: ArrayView2<'_, u16>,
        n_entries: usize,
    ) -> Result<Self, DataSetError> {
        Self::new(
            Matrix::from_array(targets),
            costs.to_vec(),
            Matrix::from_array(fvalues),
            n_entries,
        )
    }

    /// Create a dataset where every sample has unit cost.
    pub fn with_unit_costs(
        targets: Matrix<f64>,
        fvalues: Matrix<u16>,
        n_entries: usize,
    ) -> Result<Self, DataSetError> {
        let costs = vec![1.0; targets.rows()];
        Self::new(targets, costs, fvalues, n_entries)
    }

    /// Number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.targets.rows()
    }

    /// Number of outputs (target dimension).
    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.targets.cols()
    }

    /// Number of features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.fvalues.rows()
    }

    /// Number of distinct discretized values a feature can take.
    #[inline]
    pub fn n_entries(&self) -> usize {
        self.n_entries
    }

    /// Discretized value of `feature` for `sample`.
    #[inline]
    pub fn fvalue(&self, feature: usize, sample: usize) -> u16 {
        self.fvalues[(feature, sample)]
    }

    /// All sample values of one feature.
    #[inline]
    pub fn fvalues(&self, feature: usize) -> &[u16] {
        self.fvalues.row(feature)
    }

    /// Target vector of `sample`.
    #[inline]
    pub fn target(&self, sample: usize) -> &[f64] {
        self.targets.row(sample)
    }

    /// Cost (weight) of `sample`.
    #[inline]
    pub fn cost(&self, sample: usize) -> f64 {
        self.costs[sample]
    }

    /// All targets.
    #[inline]
    pub fn targets(&self) -> &Matrix<f64> {
        &self.targets
    }

    /// All costs.
    #[inline]
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }
}
