//! Image-side pipeline: ground truth, pyramids, detection, classification
//! and keypoint localization.
//!
//! # Example
//!
//! ```
//! use image::{GrayImage, Luma};
//! use visioner::config::Param;
//! use visioner::cv::{CvDetector, Detector, DetectorConfig, Object, Rect};
//! use visioner::model::{FeatureFamily, Model};
//!
//! let param = Param::builder().rows(8).cols(8).build().unwrap();
//! let model = Model::new(param, FeatureFamily::Lbp, 1);
//! let mut detector = CvDetector::new(model, DetectorConfig::default());
//!
//! let face = Object::new("face", Rect::new(4.0, 4.0, 8.0, 8.0));
//! detector.load_image(&GrayImage::from_pixel(16, 16, Luma([128])), vec![face]);
//!
//! let sw = detector.map(&Rect::new(4.0, 4.0, 8.0, 8.0));
//! assert!(detector.check(&sw));
//! ```

mod classifier;
mod detector;
mod geom;
mod localizer;
mod object;
mod pyramid;
mod tagger;

use std::path::PathBuf;

pub use classifier::{argmax, Confusion, CvClassifier};
pub use detector::{non_max_suppression, sort_desc, CvDetector, Detection, Detector, DetectorConfig, NmsMode};
pub use geom::Rect;
pub use localizer::{CvLocalizer, LocalizationReport, ERROR_BINS, MAX_ERROR};
pub use object::{load_objects, save_objects, Keypoint, Object};
pub use pyramid::{ImagePyramid, IntegralImage, PyramidScale, SubWindow};
pub use tagger::{Tag, Tagger, TaggerKind};

use crate::io::PersistError;
use crate::registry::RegistryError;

/// Errors of the image-side pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CvError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: cannot decode image: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{path}: invalid ground truth: {source}")]
    GroundTruth {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Model(#[from] PersistError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("tagger {0:?} does not assign classes")]
    NotAClassifier(&'static str),

    #[error("tagger {0:?} does not locate keypoints")]
    NotALocalizer(&'static str),

    #[error("model has {got} outputs, the tagger expects {expected}")]
    OutputMismatch { expected: usize, got: usize },

    #[error("{images} images but {groundtruths} ground truth files")]
    LengthMismatch { images: usize, groundtruths: usize },
}
