//! LUT problem integration tests: selection semantics and parallel determinism.

use proptest::prelude::*;

use visioner::data::{DataSet, Matrix};
use visioner::testing::synthetic_dataset;
use visioner::training::{FeatureSharing, LossKind, LutProblem, LutProblemEpt};

use crate::common::assert_slice_approx_eq;

/// Every sample of `data` twice.
fn duplicated(data: &DataSet) -> DataSet {
    let n = data.n_samples();
    let targets: Vec<f64> = (0..2 * n).flat_map(|s| data.target(s % n).to_vec()).collect();
    let costs: Vec<f64> = (0..2 * n).map(|s| data.cost(s % n)).collect();
    let fvalues: Vec<u16> = (0..data.n_features())
        .flat_map(|f| data.fvalues(f).iter().chain(data.fvalues(f)).copied().collect::<Vec<_>>())
        .collect();
    DataSet::new(
        Matrix::from_vec(targets, 2 * n, data.n_outputs()),
        costs,
        Matrix::from_vec(fvalues, data.n_features(), 2 * n),
        data.n_entries(),
    )
    .unwrap()
}

#[test]
fn histograms_conserve_the_gradient() {
    let data = synthetic_dataset(64, 3, 5, 16, 11);
    let mut problem = LutProblemEpt::new(&data, LossKind::DiagExp, FeatureSharing::Shared, 0).unwrap();
    problem.update_loss_deriv();

    for f in 0..data.n_features() {
        let histo = problem.histogram(f);
        for o in 0..data.n_outputs() {
            let binned: f64 = histo.iter_rows().map(|bin| bin[o]).sum();
            let total: f64 = problem.grad().iter_rows().map(|g| g[o]).sum();
            assert!((binned - total).abs() < 1e-9, "feature {f}, output {o}");
        }
    }
}

#[test]
fn identical_features_select_the_first() {
    // feature 0 is constant, features 1 and 2 both separate the targets
    let targets = Matrix::from_vec(vec![1.0, -1.0, 1.0, -1.0], 4, 1);
    let fvalues = Matrix::from_vec(vec![0u16, 0, 0, 0, 1, 0, 1, 0, 1, 0, 1, 0], 3, 4);
    let data = DataSet::with_unit_costs(targets, fvalues, 2).unwrap();

    for sharing in [FeatureSharing::Shared, FeatureSharing::Independent] {
        let mut problem = LutProblemEpt::new(&data, LossKind::DiagLog, sharing, 0).unwrap();
        problem.update_loss_deriv();
        problem.select();
        assert_eq!(problem.luts()[0].feature(), 1, "{sharing:?}");
    }
}

#[test]
fn shared_selection_without_decrease_keeps_feature_zero() {
    // symmetric losses have a zero gradient when scores match the targets
    let targets = Matrix::from_elem(6, 2, 0.0);
    let fvalues = Matrix::from_vec((0..18).map(|i| (i % 4) as u16).collect(), 3, 6);
    let data = DataSet::with_unit_costs(targets, fvalues, 4).unwrap();

    let mut problem = LutProblemEpt::new(&data, LossKind::DiagSymLog, FeatureSharing::Shared, 0).unwrap();
    problem.update_loss_deriv();
    problem.select();

    assert!(problem.fldeltas().as_slice().iter().all(|d| *d == 0.0));
    for lut in problem.luts() {
        assert_eq!(lut.feature(), 0);
    }
}

#[test]
fn loss_and_error_are_normalized_by_sample_count() {
    let data = synthetic_dataset(40, 2, 4, 8, 5);
    let twice = duplicated(&data);

    let mut a = LutProblemEpt::new(&data, LossKind::DiagLog, FeatureSharing::Shared, 0).unwrap();
    let mut b = LutProblemEpt::new(&twice, LossKind::DiagLog, FeatureSharing::Shared, 0).unwrap();
    for problem in [&mut a, &mut b] {
        problem.update_loss_deriv();
        problem.select();
        problem.update_scores(&[0.5, 0.25]).unwrap();
        problem.update_loss();
    }

    assert_eq!(a.luts()[0].feature(), b.luts()[0].feature());
    assert!((a.value() - b.value()).abs() < 1e-12);
    assert!((a.error() - b.error()).abs() < 1e-12);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn threads_do_not_change_results(
        seed in 0u64..1000,
        n_samples in 1usize..80,
        threads in 1usize..5,
        independent in any::<bool>(),
    ) {
        let data = synthetic_dataset(n_samples, 2, 6, 16, seed);
        let sharing = if independent { FeatureSharing::Independent } else { FeatureSharing::Shared };

        let mut sequential = LutProblemEpt::new(&data, LossKind::DiagExp, sharing, 0).unwrap();
        let mut parallel = LutProblemEpt::new(&data, LossKind::DiagExp, sharing, threads).unwrap();

        for problem in [&mut sequential, &mut parallel] {
            problem.update_loss_deriv();
            problem.select();
        }
        for (s, p) in sequential.luts().iter().zip(parallel.luts()) {
            prop_assert_eq!(s.feature(), p.feature());
            prop_assert_eq!(s.entries(), p.entries());
        }

        let x = [0.3, -0.2];
        let mut gs = [0.0; 2];
        let mut gp = [0.0; 2];
        let fs = sequential.linesearch(&x, &mut gs);
        let fp = parallel.linesearch(&x, &mut gp);
        prop_assert!((fs - fp).abs() < 1e-9);
        assert_slice_approx_eq(&gs, &gp, 1e-9, "linesearch gradient");
    }
}
