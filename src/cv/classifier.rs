//! Sub-window classification with a multi-class LUT model.
//!
//! The model has one output per label; a sub-window is assigned the label
//! with the highest score. [`CvClassifier::evaluate`] runs a detector over a
//! list of annotated images and accumulates the confusion matrix of the
//! labels predicted for the detected objects.

use std::path::PathBuf;

use super::{CvError, Detector, Object, Rect, Tagger};
use crate::data::Matrix;
use crate::model::Model;
use crate::registry::Registry;

/// Index of the first maximum, `None` for an empty slice.
///
/// ```
/// use visioner::cv::argmax;
///
/// assert_eq!(argmax(&[0.3, 0.7, 0.7, 0.1]), Some(1));
/// assert_eq!(argmax(&[]), None);
/// ```
pub fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

// =============================================================================
// Confusion
// =============================================================================

/// Confusion matrix of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Confusion {
    /// `hits[(gt, predicted)]`.
    pub hits: Matrix<u64>,
    /// Number of evaluated objects per ground truth class.
    pub counts: Vec<u64>,
}

impl Confusion {
    pub fn new(n_classes: usize) -> Self {
        Self {
            hits: Matrix::new(n_classes, n_classes),
            counts: vec![0; n_classes],
        }
    }

    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Record one classified object.
    pub fn add(&mut self, gt: usize, predicted: usize) {
        self.hits[(gt, predicted)] += 1;
        self.counts[gt] += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Fraction of correctly classified objects, 0 when nothing was evaluated.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.n_classes()).map(|c| self.hits[(c, c)]).sum();
        correct as f64 / total as f64
    }

    /// Misclassification rate of class `c`, 0 when it was never evaluated.
    pub fn class_error(&self, c: usize) -> f64 {
        match self.counts[c] {
            0 => 0.0,
            n => 1.0 - self.hits[(c, c)] as f64 / n as f64,
        }
    }
}

// =============================================================================
// CvClassifier
// =============================================================================

/// Multi-class classifier over detected sub-windows.
#[derive(Debug, Clone)]
pub struct CvClassifier {
    model: Model,
    tagger: Tagger,
}

impl CvClassifier {
    /// Wrap a model whose tagger assigns classes.
    ///
    /// # Errors
    ///
    /// Fails if the tagger named in the model parameters is unknown, is not
    /// a classification tagger, or if the model does not have one output per
    /// label.
    pub fn new(model: Model, registry: &Registry) -> Result<Self, CvError> {
        let tagger = registry.make_tagger(model.param())?;
        if !tagger.kind().is_classification() {
            return Err(CvError::NotAClassifier(tagger.kind().name()));
        }
        if model.n_outputs() != tagger.n_outputs() {
            return Err(CvError::OutputMismatch {
                expected: tagger.n_outputs(),
                got: model.n_outputs(),
            });
        }
        Ok(Self { model, tagger })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn labels(&self) -> &[String] {
        self.tagger.labels()
    }

    pub fn n_classes(&self) -> usize {
        self.tagger.labels().len()
    }

    /// Label predicted for `region` of the detector's current image.
    ///
    /// `None` when the region maps to a sub-window outside the pyramid.
    pub fn classify<D: Detector + ?Sized>(&self, detector: &D, region: &Rect) -> Option<usize> {
        let sw = detector.map(region);
        if !detector.check(&sw) {
            return None;
        }

        let scorer = self.model.preprocess(&detector.ipyramid()[sw.s]);
        let mut scores = vec![0.0; self.n_classes()];
        scorer.scores(sw.x as usize, sw.y as usize, &mut scores);
        argmax(&scores)
    }

    /// Label of a ground truth object, `None` if it is not in the vocabulary.
    pub fn ground_truth(&self, object: &Object) -> Option<usize> {
        self.tagger.find(object)
    }

    /// Confusion matrix of the labels predicted for the objects matched by
    /// the detector in each image.
    ///
    /// Images that cannot be loaded are skipped with a warning.
    pub fn evaluate<D: Detector + ?Sized>(
        &self,
        images: &[PathBuf],
        groundtruths: &[PathBuf],
        detector: &mut D,
    ) -> Result<Confusion, CvError> {
        if images.len() != groundtruths.len() {
            return Err(CvError::LengthMismatch {
                images: images.len(),
                groundtruths: groundtruths.len(),
            });
        }

        let mut confusion = Confusion::new(self.n_classes());
        for (i, (image, gt_path)) in images.iter().zip(groundtruths).enumerate() {
            if let Err(err) = detector.load(image, gt_path) {
                log::warn!("skipping {}: {err}", image.display());
                continue;
            }

            let detections = detector.scan();
            for detection in &detections {
                let Some(object) = detector.match_object(detection) else {
                    continue;
                };
                let Some(gt) = self.ground_truth(object) else {
                    continue;
                };
                match self.classify(&*detector, &object.bbx) {
                    Some(predicted) => confusion.add(gt, predicted),
                    None => log::warn!(
                        "{}: cannot classify object at {:?}",
                        image.display(),
                        object.bbx
                    ),
                }
            }

            log::info!(
                "image {}/{}: {} detections, {} objects classified so far",
                i + 1,
                images.len(),
                detections.len(),
                confusion.total()
            );
        }

        Ok(confusion)
    }
}
