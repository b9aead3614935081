//! Data containers used by training and evaluation.
//!
//! - [`Matrix`]: row-major dense matrix for scores, gradients and feature tables
//! - [`Histogram`]: fixed-range histogram for error distributions
//! - [`DataSet`]: discretized training samples consumed by the LUT problem

mod dataset;
mod histogram;
mod matrix;

pub use dataset::{DataSet, DataSetError};
pub use histogram::Histogram;
pub use matrix::Matrix;
