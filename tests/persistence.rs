//! Model persistence across every supported format.

mod common;

use rstest::rstest;

use visioner::cv::{CvDetector, Detector, DetectorConfig};
use visioner::io::{load_model, save_model, ModelFormat, PersistError};
use visioner::model::{Lut, Model};
use visioner::registry::Registry;

use common::{half_bright_square, small_param};

/// Keypoint model with a few LUTs on distinct features.
fn trained_model() -> Model {
    let param = small_param("keypoint", &["leye", "reye"]);
    let mut model = Registry::default().make_model(&param).unwrap();
    let n_entries = model.n_fvalues();
    let luts = (0..model.n_outputs())
        .map(|o| {
            (0..3)
                .map(|r| {
                    let mut lut = Lut::new((o + r) % model.n_features(), n_entries);
                    for (u, e) in lut.entries_mut().iter_mut().enumerate() {
                        *e = ((u * 7 + o + r) % 13) as f64 * 0.125 - 0.75;
                    }
                    lut
                })
                .collect()
        })
        .collect();
    model.set_luts(luts).unwrap();
    model
}

#[rstest]
#[case("model.vbin", ModelFormat::Binary)]
#[case("model.vbgz", ModelFormat::CompressedBinary)]
#[case("model.json.gz", ModelFormat::CompressedJson)]
#[case("model.json", ModelFormat::Json)]
fn saved_models_load_identically(#[case] name: &str, #[case] format: ModelFormat) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    assert_eq!(ModelFormat::from_path(&path), format);

    let model = trained_model();
    save_model(&model, &path).unwrap();
    let loaded = load_model(&path).unwrap();
    assert_eq!(loaded, model);
}

#[test]
fn loaded_detector_scores_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detector.vbgz");
    let model = trained_model();
    model.save(&path).unwrap();

    let image = half_bright_square(24, 16, 8, 4);
    let mut original = CvDetector::new(model, DetectorConfig::default());
    let mut loaded = CvDetector::from_model_file(&path).unwrap();
    original.load_image(&image, Vec::new());
    loaded.load_image(&image, Vec::new());

    assert_eq!(original.scan_all(), loaded.scan_all());
    assert_eq!(loaded.param(), original.param());
}

#[test]
fn binary_file_is_not_json() {
    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("model.vbin");
    trained_model().save(&binary).unwrap();

    // same bytes under a JSON name
    let renamed = dir.path().join("model.json");
    std::fs::copy(&binary, &renamed).unwrap();
    assert!(matches!(
        load_model(&renamed),
        Err(PersistError::Json { .. })
    ));
}
