//! Trainer integration tests.
//!
//! Focused on behavior (convergence, early stopping, shape checks) rather
//! than default parameters.

use visioner::config::Param;
use visioner::data::{DataSet, Matrix};
use visioner::model::{FeatureFamily, Model};
use visioner::training::{
    Averager, FeatureSharing, LossKind, TaylorBooster, TrainError, Verbosity,
};

/// Model with 4 LBP features on an 8x8 window (cells of 2 pixels).
fn model(n_outputs: usize) -> Model {
    let param = Param::builder().rows(8).cols(8).projections(1).build().unwrap();
    let model = Model::new(param, FeatureFamily::Lbp, n_outputs);
    assert_eq!((model.step(), model.n_features()), (2, 4));
    model
}

/// 8 samples on the model's features: feature 3 separates the targets of
/// output 0, feature 1 those of output 1, the others are noise.
fn dataset(n_features: usize) -> DataSet {
    let t0 = [1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
    let t1 = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
    let targets: Vec<f64> = t0.iter().zip(&t1).flat_map(|(a, b)| [*a, *b]).collect();

    let mut fvalues = Vec::new();
    for f in 0..n_features {
        let row: [u16; 8] = match f {
            3 => [7, 7, 7, 7, 9, 9, 9, 9],
            1 => [4, 5, 4, 5, 4, 5, 4, 5],
            _ => [0, 1, 1, 0, 0, 0, 1, 1],
        };
        fvalues.extend(row);
    }

    DataSet::with_unit_costs(
        Matrix::from_vec(targets, 8, 2),
        Matrix::from_vec(fvalues, n_features, 8),
        256,
    )
    .unwrap()
}

#[test]
fn independent_sharing_picks_one_feature_per_output() {
    let mut model = model(2);
    let data = dataset(model.n_features());
    let booster = TaylorBooster::builder()
        .rounds(4)
        .sharing(FeatureSharing::Independent)
        .verbosity(Verbosity::Silent)
        .build();

    let report = booster.train(&data, None, &mut model, 0).unwrap();
    assert_eq!(report.train_error, 0.0);
    assert_eq!(model.luts()[0][0].feature(), 3);
    assert_eq!(model.luts()[1][0].feature(), 1);
}

#[test]
fn loss_decreases_with_rounds() {
    let data = dataset(4);
    let mut values = Vec::new();
    for rounds in [1, 2, 4] {
        let mut model = model(2);
        let booster = TaylorBooster::builder()
            .rounds(rounds)
            .loss(LossKind::DiagExp)
            .verbosity(Verbosity::Silent)
            .build();
        values.push(booster.train(&data, None, &mut model, 2).unwrap().train_value);
    }
    assert!(values[0] < 1.0);
    assert!(values[1] <= values[0]);
    assert!(values[2] <= values[1]);
}

#[test]
fn early_stopping_keeps_the_best_round() {
    let mut model = model(2);
    let train = dataset(4);

    // Same samples with every target flipped: each round makes it worse
    let flipped: Vec<f64> = train.targets().as_slice().iter().map(|t| -t).collect();
    let fvalues: Vec<u16> = (0..4).flat_map(|f| train.fvalues(f).to_vec()).collect();
    let valid = DataSet::with_unit_costs(
        Matrix::from_vec(flipped, 8, 2),
        Matrix::from_vec(fvalues, 4, 8),
        256,
    )
    .unwrap();

    let booster = TaylorBooster::builder()
        .rounds(10)
        .sharing(FeatureSharing::Independent)
        .patience(0)
        .verbosity(Verbosity::Silent)
        .build();
    let report = booster.train(&train, Some(&valid), &mut model, 0).unwrap();

    assert_eq!(report.rounds, 1);
    assert_eq!(model.luts()[0].len(), 1);
    assert_eq!(report.train_error, 0.0);
    assert_eq!(report.valid_error, Some(1.0));
}

#[test]
fn averager_matches_the_mean_target() {
    let mut model = model(1);
    let targets = Matrix::from_vec(vec![0.5, 1.5, 1.0, 1.0], 4, 1);
    let fvalues = Matrix::from_vec(vec![0u16; 16], 4, 4);
    let data = DataSet::with_unit_costs(targets, fvalues, 256).unwrap();

    let averager = Averager {
        loss: LossKind::DiagSymLog,
    };
    let report = averager.train(&data, Some(&data), &mut model, 0).unwrap();
    assert_eq!(model.luts()[0][0].eval(0), 1.0);
    // regression error is the mean absolute deviation
    assert!((report.train_error - 0.25).abs() < 1e-12);
    assert_eq!(report.valid_error, Some(report.train_error));
}

#[test]
fn dataset_must_match_the_model() {
    let mut model = model(1);
    let err = TaylorBooster::default()
        .train(&dataset(4), None, &mut model, 0)
        .unwrap_err();
    assert!(matches!(
        err,
        TrainError::ShapeMismatch {
            what: "outputs",
            model: 1,
            data: 2
        }
    ));
}
