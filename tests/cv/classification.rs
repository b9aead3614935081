//! Classification evaluation over image files.

use visioner::cv::{CvClassifier, CvDetector, CvError, DetectorConfig};
use visioner::registry::Registry;

use crate::common::{constant_model, half_bright_square, object, small_param, Fixture};

/// Detector answering 1.0 on every window.
fn detector() -> CvDetector {
    CvDetector::new(
        constant_model(small_param("object_type", &["face"]), &[1.0]),
        DetectorConfig::default(),
    )
}

#[test]
fn confusion_accumulates_over_images() {
    // always predicts "car"
    let model = constant_model(small_param("object_type", &["face", "car"]), &[0.2, 0.9]);
    let classifier = CvClassifier::new(model, &Registry::default()).unwrap();

    let mut fixture = Fixture::new();
    fixture.add(&half_bright_square(24, 16, 0, 0), &[object("car", 0.0, 0.0)]);
    fixture.add(
        &half_bright_square(24, 16, 16, 8),
        &[object("car", 16.0, 8.0), object("truck", 0.0, 0.0)],
    );
    let mut images = fixture.images.clone();
    let mut groundtruths = fixture.groundtruths.clone();
    images.push(fixture.dir.path().join("missing.png"));
    groundtruths.push(fixture.groundtruths[0].clone());

    let confusion = classifier
        .evaluate(&images, &groundtruths, &mut detector())
        .unwrap();

    assert_eq!(confusion.hits[(1, 1)], 2);
    assert_eq!(confusion.hits[(1, 0)], 0);
    assert_eq!(confusion.counts, vec![0, 2]);
    assert_eq!(confusion.accuracy(), 1.0);
}

#[test]
fn keypoint_models_are_not_classifiers() {
    let model = constant_model(small_param("keypoint", &["leye", "reye"]), &[0.0; 4]);
    let err = CvClassifier::new(model, &Registry::default()).unwrap_err();
    assert!(matches!(err, CvError::NotAClassifier("keypoint")));
}

#[test]
fn output_count_must_match_labels() {
    let model = constant_model(small_param("object_type", &["face", "car"]), &[1.0]);
    let err = CvClassifier::new(model, &Registry::default()).unwrap_err();
    assert!(matches!(
        err,
        CvError::OutputMismatch {
            expected: 2,
            got: 1
        }
    ));
}
