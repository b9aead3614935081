//! End-to-end: images on disk, sampling, coarse-to-fine training, scanning.

use visioner::config::Param;
use visioner::cv::{CvDetector, Detector, DetectorConfig, Rect, SubWindow};
use visioner::registry::Registry;
use visioner::training::{train_model, Sampler};

use crate::common::{half_bright_square, object, Fixture};

fn param() -> Param {
    Param::builder()
        .rows(8)
        .cols(8)
        .cx(4)
        .cy(4)
        .scale_factor(0.4)
        .projections(1)
        .rounds(5)
        .build()
        .unwrap()
}

#[test]
fn trains_a_detector_from_image_files() {
    let registry = Registry::default();
    let param = param();

    let mut train = Fixture::new();
    for (x, y) in [(0, 0), (16, 8), (8, 0)] {
        train.add(
            &half_bright_square(24, 16, x, y),
            &[object("face", x as f64, y as f64)],
        );
    }
    let mut valid = Fixture::new();
    valid.add(&half_bright_square(24, 16, 4, 4), &[object("face", 4.0, 4.0)]);

    let mut model = registry.make_model(&param).unwrap();
    assert_eq!(model.step(), 2);
    let tagger = registry.make_tagger(&param).unwrap();
    let sampler = Sampler::from_files(tagger, &model, &train.pairs(), &valid.pairs()).unwrap();

    let reports = train_model(&mut model, &registry, 2, &sampler).unwrap();

    // one pass per feature pool: step 2, then full resolution
    assert_eq!(reports.len(), 2);
    assert_eq!(model.step(), 1);
    let last = reports.last().unwrap();
    assert_eq!(last.train_error, 0.0);
    assert_eq!(last.valid_error, Some(0.0));
    assert_eq!(last.rounds, model.luts()[0].len());

    // positive window scores above zero, background windows below
    let mut detector = CvDetector::new(model, DetectorConfig::default());
    detector
        .load(&valid.images[0], &valid.groundtruths[0])
        .unwrap();
    let face = Rect::new(4.0, 4.0, 8.0, 8.0);
    for detection in detector.scan_all() {
        if detection.sw == SubWindow::new(0, 4, 4) {
            assert!(detection.score > 0.0);
        } else if detection.region.overlap(&face) == 0.0 {
            assert!(detection.score < 0.0, "{detection:?}");
        }
    }
}

#[test]
fn sampler_reports_unreadable_files() {
    let param = param();
    let registry = Registry::default();
    let model = registry.make_model(&param).unwrap();
    let tagger = registry.make_tagger(&param).unwrap();

    let fixture = Fixture::new();
    let missing = fixture.dir.path().join("missing.png");
    let gt = fixture.dir.path().join("missing.json");
    let err = Sampler::from_files(tagger, &model, &[(missing, gt)], &[]).unwrap_err();
    assert!(err.to_string().contains("missing.png"));
}
