//! Sliding-window detection.
//!
//! [`CvDetector`] scans the model window over every level of an
//! [`ImagePyramid`], keeps the sub-windows whose score for output 0 reaches
//! the threshold, and prunes overlapping candidates with greedy non-maximum
//! suppression.

use std::cmp::Ordering;
use std::path::Path;

use bon::Builder;
use image::GrayImage;
use rayon::prelude::*;

use super::{load_objects, CvError, ImagePyramid, Object, Rect, SubWindow};
use crate::config::{ConfigError, Param};
use crate::model::Model;

// =============================================================================
// Detection
// =============================================================================

/// A scored sub-window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub score: f64,
    /// Window in original image coordinates.
    pub region: Rect,
    pub sw: SubWindow,
}

/// Sort detections by descending score.
pub fn sort_desc(detections: &mut [Detection]) {
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Greedy non-maximum suppression over detections sorted by descending score.
pub fn non_max_suppression(detections: Vec<Detection>, threshold: f64) -> Vec<Detection> {
    let mut result: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        let suppressed = result
            .iter()
            .any(|kept| detection.region.overlap(&kept.region) > threshold);
        if !suppressed {
            result.push(detection);
        }
    }
    result
}

// =============================================================================
// Detector
// =============================================================================

/// What the classification and localization pipelines need from a detector.
pub trait Detector {
    /// Parameters of the scanned model.
    fn param(&self) -> &Param;

    /// Pyramid of the current image.
    fn ipyramid(&self) -> &ImagePyramid;

    /// Ground truth of the current image.
    fn objects(&self) -> &[Object];

    /// Load an image and its ground truth file.
    fn load(&mut self, image: &Path, groundtruth: &Path) -> Result<(), CvError>;

    /// Candidate detections in the current image, in no particular order.
    fn scan(&self) -> Vec<Detection>;

    /// Sub-window covering `region`.
    fn map(&self, region: &Rect) -> SubWindow {
        self.ipyramid().map(region, self.param())
    }

    /// Whether the model window at `sw` lies inside the pyramid.
    fn check(&self, sw: &SubWindow) -> bool {
        self.ipyramid().check(sw, self.param())
    }

    /// Ground truth object best overlapping the detection, if the overlap
    /// reaches `min_gt_overlap`.
    fn match_object(&self, detection: &Detection) -> Option<&Object> {
        let min_overlap = self.param().min_gt_overlap;
        let mut best: Option<(&Object, f64)> = None;
        for object in self.objects() {
            let overlap = detection.region.overlap(&object.bbx);
            if overlap >= min_overlap && best.map_or(true, |(_, o)| overlap > o) {
                best = Some((object, overlap));
            }
        }
        best.map(|(object, _)| object)
    }
}

// =============================================================================
// DetectorConfig
// =============================================================================

/// Candidate pruning after scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NmsMode {
    /// Keep every candidate above the threshold.
    None,
    /// Drop candidates overlapping a better one.
    #[default]
    Greedy,
}

/// Detection settings.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct DetectorConfig {
    /// Minimum score of a candidate. Default: 0.0.
    #[builder(default = 0.0)]
    pub threshold: f64,

    /// Overlap above which the lower-scored candidate is suppressed. Default: 0.3.
    #[builder(default = 0.3)]
    pub nms_threshold: f64,

    #[builder(default)]
    pub nms: NmsMode,

    /// Maximum number of detections kept after sorting, 0 for no limit. Default: 0.
    #[builder(default = 0)]
    pub top_k: usize,
}

impl<S: detector_config_builder::IsComplete> DetectorConfigBuilder<S> {
    /// Build and validate the settings.
    pub fn build(self) -> Result<DetectorConfig, ConfigError> {
        let config = self.__build_internal();
        if !(0.0..=1.0).contains(&config.nms_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "nms_threshold",
                range: "[0, 1]",
                value: config.nms_threshold,
            });
        }
        if !config.threshold.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "threshold",
                range: "finite",
                value: config.threshold,
            });
        }
        Ok(config)
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::builder().build().expect("default detector config is valid")
    }
}

// =============================================================================
// CvDetector
// =============================================================================

/// Sliding-window detector driven by a boosted LUT model.
#[derive(Debug, Clone)]
pub struct CvDetector {
    model: Model,
    config: DetectorConfig,
    pyramid: ImagePyramid,
    objects: Vec<Object>,
}

impl CvDetector {
    pub fn new(model: Model, config: DetectorConfig) -> Self {
        Self {
            model,
            config,
            pyramid: ImagePyramid::default(),
            objects: Vec::new(),
        }
    }

    /// Load the model from `path` and use default settings.
    pub fn from_model_file(path: &Path) -> Result<Self, CvError> {
        Ok(Self::new(Model::load(path)?, DetectorConfig::default()))
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Use an already decoded image.
    pub fn load_image(&mut self, image: &GrayImage, objects: Vec<Object>) {
        self.pyramid = ImagePyramid::build(image, &objects, self.model.param());
        self.objects = objects;
    }

    /// Score of output 0 at every in-bounds sub-window, unfiltered.
    pub fn scan_all(&self) -> Vec<Detection> {
        let param = self.model.param();
        self.pyramid
            .scales()
            .par_iter()
            .enumerate()
            .flat_map_iter(|(s, level)| {
                let scorer = self.model.preprocess(level);
                let max_y = level.height().saturating_sub(param.rows);
                let max_x = level.width().saturating_sub(param.cols);
                let fits = level.fits(0, 0, param.rows, param.cols);

                (0..=max_y)
                    .step_by(param.cy)
                    .flat_map(move |y| (0..=max_x).step_by(param.cx).map(move |x| (x, y)))
                    .filter(move |_| fits)
                    .map(move |(x, y)| {
                        let sw = SubWindow::new(s, x as i64, y as i64);
                        Detection {
                            score: scorer.score(0, x, y),
                            region: self.pyramid.to_region(&sw, param),
                            sw,
                        }
                    })
            })
            .collect()
    }
}

impl Detector for CvDetector {
    fn param(&self) -> &Param {
        self.model.param()
    }

    fn ipyramid(&self) -> &ImagePyramid {
        &self.pyramid
    }

    fn objects(&self) -> &[Object] {
        &self.objects
    }

    fn load(&mut self, image: &Path, groundtruth: &Path) -> Result<(), CvError> {
        let decoded = image::open(image)
            .map_err(|source| CvError::Image {
                path: image.to_path_buf(),
                source,
            })?
            .to_luma8();
        let objects = load_objects(groundtruth)?;
        self.load_image(&decoded, objects);
        Ok(())
    }

    fn scan(&self) -> Vec<Detection> {
        let mut detections: Vec<Detection> = self
            .scan_all()
            .into_iter()
            .filter(|d| d.score >= self.config.threshold)
            .collect();

        sort_desc(&mut detections);
        if self.config.top_k > 0 {
            detections.truncate(self.config.top_k);
        }
        if self.config.nms == NmsMode::Greedy && detections.len() > 1 {
            detections = non_max_suppression(detections, self.config.nms_threshold);
        }

        log::debug!("scan kept {} detections", detections.len());
        detections
    }
}
