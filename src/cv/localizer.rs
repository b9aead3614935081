//! Keypoint localization with a regression LUT model.
//!
//! A keypoint model has two outputs per keypoint label: the keypoint
//! coordinates relative to the model window, normalized by the window size.
//! Localization errors are reported normalized by the ground truth
//! inter-eye distance, taking the first two labels as the eyes.

use std::path::PathBuf;

use super::{CvError, Detector, Keypoint, Object, Rect, TaggerKind};
use crate::data::Histogram;
use crate::model::Model;
use crate::registry::Registry;

/// Number of bins of the error histograms.
pub const ERROR_BINS: usize = 100;

/// Largest normalized error the histograms resolve; larger errors land in
/// the last bin.
pub const MAX_ERROR: f64 = 1.0;

/// Normalized localization errors of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizationReport {
    /// One histogram per keypoint label.
    pub per_keypoint: Vec<Histogram>,
    /// Mean error over the keypoints of each object.
    pub overall: Histogram,
}

impl LocalizationReport {
    fn new(n_keypoints: usize) -> Self {
        Self {
            per_keypoint: vec![Histogram::new(ERROR_BINS, 0.0, MAX_ERROR); n_keypoints],
            overall: Histogram::new(ERROR_BINS, 0.0, MAX_ERROR),
        }
    }
}

/// Keypoint localizer.
#[derive(Debug, Clone)]
pub struct CvLocalizer {
    model: Model,
}

impl CvLocalizer {
    /// Wrap a model trained with the keypoint tagger.
    pub fn new(model: Model, registry: &Registry) -> Result<Self, CvError> {
        let tagger = registry.make_tagger(model.param())?;
        if tagger.kind() != TaggerKind::Keypoint {
            return Err(CvError::NotALocalizer(tagger.kind().name()));
        }
        if model.n_outputs() != tagger.n_outputs() {
            return Err(CvError::OutputMismatch {
                expected: tagger.n_outputs(),
                got: model.n_outputs(),
            });
        }
        Ok(Self { model })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn labels(&self) -> &[String] {
        &self.model.param().labels
    }

    /// Predicted keypoints of `region`, in image coordinates.
    ///
    /// `None` when the region maps to a sub-window outside the pyramid.
    pub fn locate<D: Detector + ?Sized>(&self, detector: &D, region: &Rect) -> Option<Vec<Keypoint>> {
        let sw = detector.map(region);
        if !detector.check(&sw) {
            return None;
        }

        let pyramid = detector.ipyramid();
        let scorer = self.model.preprocess(&pyramid[sw.s]);
        let mut scores = vec![0.0; self.model.n_outputs()];
        scorer.scores(sw.x as usize, sw.y as usize, &mut scores);

        let window = pyramid.to_region(&sw, self.model.param());
        let keypoints = self
            .labels()
            .iter()
            .zip(scores.chunks_exact(2))
            .map(|(id, xy)| Keypoint {
                id: id.clone(),
                x: window.x + xy[0] * window.width,
                y: window.y + xy[1] * window.height,
            })
            .collect();
        Some(keypoints)
    }

    /// Distance used to normalize the errors on `object`: the inter-eye
    /// distance, or the box width when the eyes are not annotated.
    fn normalization(&self, object: &Object) -> f64 {
        let labels = self.labels();
        let eyes = match labels {
            [left, right, ..] => object.keypoint(left).zip(object.keypoint(right)),
            _ => None,
        };
        match eyes {
            Some((l, r)) if (l.x - r.x).hypot(l.y - r.y) > 0.0 => (l.x - r.x).hypot(l.y - r.y),
            _ => object.bbx.width,
        }
    }

    /// Histograms of the normalized keypoint errors on the objects matched
    /// by the detector in each image.
    ///
    /// Images that cannot be loaded are skipped with a warning, and so are
    /// objects missing one of the keypoints.
    pub fn evaluate<D: Detector + ?Sized>(
        &self,
        images: &[PathBuf],
        groundtruths: &[PathBuf],
        detector: &mut D,
    ) -> Result<LocalizationReport, CvError> {
        if images.len() != groundtruths.len() {
            return Err(CvError::LengthMismatch {
                images: images.len(),
                groundtruths: groundtruths.len(),
            });
        }

        let mut report = LocalizationReport::new(self.labels().len());
        for (i, (image, gt_path)) in images.iter().zip(groundtruths).enumerate() {
            if let Err(err) = detector.load(image, gt_path) {
                log::warn!("skipping {}: {err}", image.display());
                continue;
            }

            let mut located = 0;
            for detection in &detector.scan() {
                let Some(object) = detector.match_object(detection) else {
                    continue;
                };
                let Some(predicted) = self.locate(&*detector, &object.bbx) else {
                    log::warn!("{}: cannot localize object at {:?}", image.display(), object.bbx);
                    continue;
                };

                let norm = self.normalization(object);
                let errors: Option<Vec<f64>> = predicted
                    .iter()
                    .map(|p| {
                        object
                            .keypoint(&p.id)
                            .map(|gt| (p.x - gt.x).hypot(p.y - gt.y) / norm)
                    })
                    .collect();
                let Some(errors) = errors else {
                    continue;
                };

                for (histo, &err) in report.per_keypoint.iter_mut().zip(&errors) {
                    histo.add(err);
                }
                if !errors.is_empty() {
                    report.overall.add(errors.iter().sum::<f64>() / errors.len() as f64);
                }
                located += 1;
            }

            log::info!(
                "image {}/{}: {} objects localized",
                i + 1,
                images.len(),
                located
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Param;
    use crate::cv::{save_objects, CvDetector, DetectorConfig};
    use crate::model::{FeatureFamily, Lut};
    use image::{GrayImage, Luma};

    fn param(tagger: &str, labels: &[&str]) -> Param {
        Param::builder()
            .rows(6)
            .cols(6)
            .scale_factor(0.4)
            .labels(labels.iter().map(|l| l.to_string()).collect())
            .tagger(tagger)
            .build()
            .unwrap()
    }

    fn constant_model(param: Param, values: &[f64]) -> Model {
        let mut model = Model::new(param, FeatureFamily::Lbp, values.len());
        let luts = values
            .iter()
            .map(|&v| vec![Lut::constant(0, model.n_fvalues(), v)])
            .collect();
        model.set_luts(luts).unwrap();
        model
    }

    /// Predicts `leye` at (0.25, 0.5) and `reye` at (0.75, 0.5) of the window.
    fn localizer() -> CvLocalizer {
        let model = constant_model(param("keypoint", &["leye", "reye"]), &[0.25, 0.5, 0.75, 0.5]);
        CvLocalizer::new(model, &Registry::default()).unwrap()
    }

    fn detector() -> CvDetector {
        let model = constant_model(param("object_type", &["face"]), &[1.0]);
        CvDetector::new(model, DetectorConfig::default())
    }

    #[test]
    fn rejects_classification_models() {
        let model = constant_model(param("object_type", &["face"]), &[1.0]);
        let err = CvLocalizer::new(model, &Registry::default()).unwrap_err();
        assert!(matches!(err, CvError::NotALocalizer("object_type")));
    }

    #[test]
    fn locate_maps_to_image_coordinates() {
        let mut detector = detector();
        detector.load_image(&GrayImage::from_pixel(6, 6, Luma([90])), Vec::new());

        let keypoints = localizer()
            .locate(&detector, &Rect::new(0.0, 0.0, 6.0, 6.0))
            .unwrap();
        assert_eq!(keypoints.len(), 2);
        assert_eq!(keypoints[0].id, "leye");
        assert_eq!((keypoints[0].x, keypoints[0].y), (1.5, 3.0));
        assert_eq!((keypoints[1].x, keypoints[1].y), (4.5, 3.0));
    }

    #[test]
    fn evaluate_bins_normalized_errors() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("face.png");
        let gt = dir.path().join("face.json");
        GrayImage::from_pixel(6, 6, Luma([90])).save(&image).unwrap();
        let face = Object::new("face", Rect::new(0.0, 0.0, 6.0, 6.0))
            .with_keypoint("leye", 1.8, 3.0)
            .with_keypoint("reye", 4.5, 3.0);
        save_objects(&gt, &[face]).unwrap();

        let missing = dir.path().join("missing.png");
        let report = localizer()
            .evaluate(&[image, missing], &[gt.clone(), gt], &mut detector())
            .unwrap();

        // eye distance 2.7: left error 0.3 / 2.7, right error 0
        assert_eq!(report.per_keypoint[0].sum(), 1.0);
        assert_eq!(report.per_keypoint[0].bins()[11], 1.0);
        assert_eq!(report.per_keypoint[1].bins()[0], 1.0);
        assert_eq!(report.overall.bins()[5], 1.0);
    }

    #[test]
    fn evaluate_checks_lengths() {
        let err = localizer()
            .evaluate(&[PathBuf::from("a.png")], &[], &mut detector())
            .unwrap_err();
        assert!(matches!(
            err,
            CvError::LengthMismatch {
                images: 1,
                groundtruths: 0
            }
        ));
    }
}
