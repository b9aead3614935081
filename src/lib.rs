//! visioner: boosted look-up-table models for face detection, classification
//! and keypoint localization.
//!
//! A model is a sum of look-up tables (LUTs), each indexed by the code of one
//! local binary feature (LBP, its extended variants, or MCT) computed on a
//! sub-window of an image pyramid. Training boosts LUTs on samples collected
//! by labelling every sub-window of the training images.
//!
//! - [`config`]: training and scanning parameters
//! - [`registry`]: name resolution of losses, taggers, feature families and trainers
//! - [`data`]: matrices, histograms and the training dataset
//! - [`model`]: features, LUTs and the boosted model
//! - [`training`]: losses, LUT problems, line search, sampling and trainers
//! - [`cv`]: pyramids, taggers, detection, classification and localization
//! - [`io`]: model persistence

pub use approx;

pub mod config;
pub mod cv;
pub mod data;
pub mod io;
pub mod model;
pub mod registry;
pub mod testing;
pub mod training;
pub mod utils;
