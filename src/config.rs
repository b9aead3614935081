//! Training and inference parameters.
//!
//! [`Param`] gathers everything a model needs to be trained and applied: the
//! model window, the label vocabulary, the names of the loss/tagger/feature
//! family/trainer, boosting settings and the scanning geometry. It is stored
//! inside every saved model, so a loaded model scans images the way it was
//! trained.
//!
//! Names are plain strings here and are resolved to typed variants through a
//! [`Registry`](crate::registry::Registry).
//!
//! # Example
//!
//! ```
//! use visioner::config::Param;
//!
//! // All defaults: 24x20 face/non-face classifier
//! let param = Param::builder().build().unwrap();
//! assert_eq!(param.labels, vec!["face".to_string()]);
//!
//! // Keypoint localization with an extended LBP pool
//! let param = Param::builder()
//!     .rows(40)
//!     .cols(40)
//!     .labels(vec!["leye".into(), "reye".into()])
//!     .loss("jesorsky")
//!     .tagger("keypoint")
//!     .feature("elbp")
//!     .rounds(256)
//!     .build()
//!     .unwrap();
//! assert_eq!(param.rounds, 256);
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::training::Verbosity;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during parameter validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("model window must be at least {min}x{min} pixels, got {rows}x{cols}")]
    WindowTooSmall { rows: usize, cols: usize, min: usize },

    #[error("at least one label is required")]
    NoLabels,

    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),

    #[error("rounds must be at least 1")]
    InvalidRounds,

    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("scanning strides must be positive, got cx={cx} cy={cy}")]
    InvalidStride { cx: usize, cy: usize },
}

/// Smallest model window: every feature needs a 3x3 grid of at least 1px cells.
pub const MIN_WINDOW: usize = 3;

// =============================================================================
// Param
// =============================================================================

/// Parameters shared by training, sampling and detection.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct Param {
    // === Model window ===
    /// Window height in pixels. Default: 24.
    #[builder(default = 24)]
    pub rows: usize,

    /// Window width in pixels. Default: 20.
    #[builder(default = 20)]
    pub cols: usize,

    // === Labels ===
    /// Class names (object taggers) or keypoint names (keypoint tagger).
    #[builder(default = vec!["face".to_string()])]
    pub labels: Vec<String>,

    // === Named components ===
    /// Loss name. Default: `diag_log`.
    #[builder(into, default = "diag_log".to_string())]
    pub loss: String,

    /// Optimization type of the LUT problem. Default: `ept`.
    #[builder(into, default = "ept".to_string())]
    pub optimization: String,

    /// Feature sharing between outputs. Default: `shared`.
    #[builder(into, default = "shared".to_string())]
    pub sharing: String,

    /// Feature family of the model. Default: `lbp`.
    #[builder(into, default = "lbp".to_string())]
    pub feature: String,

    /// Sub-window tagger. Default: `object_type`.
    #[builder(into, default = "object_type".to_string())]
    pub tagger: String,

    /// Trainer. Default: `gboost`.
    #[builder(into, default = "gboost".to_string())]
    pub trainer: String,

    // === Boosting ===
    /// Maximum number of boosting rounds per projection. Default: 1024.
    #[builder(default = 1024)]
    pub rounds: usize,

    /// Number of coarse-to-fine feature projections. Default: 0.
    #[builder(default = 0)]
    pub projections: usize,

    // === Sampling and scanning ===
    /// Minimum overlap with a ground truth object for a positive sub-window.
    /// Default: 0.8.
    #[builder(default = 0.8)]
    pub min_gt_overlap: f64,

    /// Ratio between the sizes of two consecutive pyramid levels. Default: 0.9.
    #[builder(default = 0.9)]
    pub scale_factor: f64,

    /// Horizontal scanning stride in pixels. Default: 2.
    #[builder(default = 2)]
    pub cx: usize,

    /// Vertical scanning stride in pixels. Default: 2.
    #[builder(default = 2)]
    pub cy: usize,

    // === Reproducibility ===
    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    // === Logging ===
    /// Verbosity level. Default: `Warning`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the parameters.
impl<S: param_builder::IsComplete> ParamBuilder<S> {
    /// Build and validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is invalid. Component names are
    /// not checked here; they are resolved by the registry.
    pub fn build(self) -> Result<Param, ConfigError> {
        let param = self.__build_internal();
        param.validate()?;
        Ok(param)
    }
}

impl Param {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < MIN_WINDOW || self.cols < MIN_WINDOW {
            return Err(ConfigError::WindowTooSmall {
                rows: self.rows,
                cols: self.cols,
                min: MIN_WINDOW,
            });
        }

        if self.labels.is_empty() {
            return Err(ConfigError::NoLabels);
        }
        for (i, label) in self.labels.iter().enumerate() {
            if self.labels[..i].contains(label) {
                return Err(ConfigError::DuplicateLabel(label.clone()));
            }
        }

        if self.rounds == 0 {
            return Err(ConfigError::InvalidRounds);
        }

        if !(self.min_gt_overlap > 0.0 && self.min_gt_overlap <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "min_gt_overlap",
                range: "(0, 1]",
                value: self.min_gt_overlap,
            });
        }

        if !(self.scale_factor > 0.0 && self.scale_factor < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "scale_factor",
                range: "(0, 1)",
                value: self.scale_factor,
            });
        }

        if self.cx == 0 || self.cy == 0 {
            return Err(ConfigError::InvalidStride {
                cx: self.cx,
                cy: self.cy,
            });
        }

        Ok(())
    }

    /// Index of a label in the vocabulary.
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

impl Default for Param {
    fn default() -> Self {
        Self::builder().build().expect("default param is valid")
    }
}
