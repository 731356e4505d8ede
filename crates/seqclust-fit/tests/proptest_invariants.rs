// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use seqclust_core::{Euclidean, ExecutionContext, SegError, SequenceView, validate_boundaries};
use seqclust_fit::{
    BoundarySearch, Direction, EnergyModel, FitReport, InitMethod, OrderedClustering, Partition,
    equal_count_boundaries,
};

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn init_method() -> impl Strategy<Value = InitMethod> {
    prop_oneof![
        Just(InitMethod::Default),
        Just(InitMethod::TraceSegmentation),
        Just(InitMethod::EqualResample),
    ]
}

fn run_fit(
    values: &[f64],
    d: usize,
    num_segments: usize,
    threshold: f64,
    method: InitMethod,
) -> Result<(Vec<usize>, FitReport, Vec<Vec<f64>>, Vec<f64>), SegError> {
    let view = SequenceView::new(values, values.len() / d, d)?;
    let mut clustering =
        OrderedClustering::new(view, Euclidean::default(), num_segments, threshold)?;
    clustering.initialize(method)?;
    let report = clustering.fit(None, &ExecutionContext::new())?;
    Ok((
        clustering.boundaries().to_vec(),
        report,
        clustering.centroids().to_vec(),
        clustering.local_energies().to_vec(),
    ))
}

fn tolerance(scale: f64) -> f64 {
    1e-7 * (1.0 + scale.abs())
}

fn assert_tiling(boundaries: &[usize], n: usize, expected_segments: usize) {
    validate_boundaries(n, boundaries).expect("boundary contract must hold");
    assert_eq!(boundaries.len(), expected_segments);

    let mut covered = 0usize;
    for (j, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(j + 1).copied().unwrap_or(n);
        assert_eq!(start, covered, "segment {j} must start where the previous ended");
        assert!(end > start, "segment {j} must be non-empty");
        covered = end;
    }
    assert_eq!(covered, n, "segments must cover every sample");
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn fitted_segments_tile_the_sequence(
        values in prop::collection::vec(-50.0f64..50.0, 1..96),
        num_segments in 0usize..12,
        threshold in -0.5f64..1.5,
        method in init_method(),
    ) {
        let n = values.len();
        let (boundaries, _, centroids, local) =
            run_fit(&values, 1, num_segments, threshold, method).expect("fit should succeed");

        let expected = num_segments.clamp(1, n);
        assert_tiling(&boundaries, n, expected);
        prop_assert_eq!(centroids.len(), expected);
        prop_assert_eq!(local.len(), expected);
    }

    #[test]
    fn fit_never_increases_total_energy(
        d in 1usize..4,
        rows in prop::collection::vec(prop::collection::vec(-50.0f64..50.0, 3), 2..64),
        num_segments in 1usize..10,
        threshold in 0.0f64..=1.0,
        method in init_method(),
    ) {
        let values: Vec<f64> = rows.iter().flat_map(|row| row[..d].iter().copied()).collect();
        let (_, report, _, local) =
            run_fit(&values, d, num_segments, threshold, method).expect("fit should succeed");

        prop_assert!(
            report.total_energy <= report.initial_energy + tolerance(report.initial_energy),
            "energy rose from {} to {}",
            report.initial_energy,
            report.total_energy
        );
        prop_assert!(report.drift.abs() <= tolerance(report.initial_energy));
        let summed: f64 = local.iter().sum();
        prop_assert!((summed - report.total_energy).abs() <= tolerance(report.total_energy));
    }

    #[test]
    fn incremental_centroids_track_full_recompute(
        values in prop::collection::vec(-20.0f64..20.0, 6..48),
        num_segments in 2usize..6,
    ) {
        let n = values.len();
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let math = Euclidean::default();
        let boundaries = equal_count_boundaries(n, num_segments.min(n));
        let mut partition = Partition::from_boundaries(n, boundaries).expect("valid boundaries");
        let mut energy = EnergyModel::new();
        energy
            .recompute_all(&view, &partition, &math)
            .expect("recompute should succeed");

        let segments = partition.len();
        let mut search = BoundarySearch::new(&view, &math, &mut partition, &mut energy, 0.0);
        for _ in 0..4 {
            for j in 0..segments {
                for direction in [Direction::Left, Direction::Right] {
                    if (j == 0 && direction == Direction::Left)
                        || (j + 1 == segments && direction == Direction::Right)
                    {
                        continue;
                    }
                    if !search.try_move(j, direction).expect("evaluation should succeed") {
                        continue;
                    }
                    let mut fresh = EnergyModel::new();
                    fresh
                        .recompute_all(&view, search.partition(), &math)
                        .expect("recompute should succeed");
                    for (inc, exact) in search.energy().centroids().iter().zip(fresh.centroids()) {
                        prop_assert!((inc[0] - exact[0]).abs() <= 1e-9 * (1.0 + exact[0].abs()));
                    }
                    prop_assert!(
                        (search.energy().total() - fresh.total()).abs() <= tolerance(fresh.total())
                    );
                }
            }
        }
        validate_boundaries(n, search.partition().boundaries())
            .expect("boundaries must stay valid after moves");
    }

    #[test]
    fn fit_is_deterministic(
        values in prop::collection::vec(-50.0f64..50.0, 2..64),
        num_segments in 1usize..8,
        threshold in 0.0f64..=1.0,
        method in init_method(),
    ) {
        let first = run_fit(&values, 1, num_segments, threshold, method)
            .expect("first fit should succeed");
        let second = run_fit(&values, 1, num_segments, threshold, method)
            .expect("second fit should succeed");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn refitting_a_converged_instance_changes_nothing(
        values in prop::collection::vec(-50.0f64..50.0, 2..64),
        num_segments in 1usize..8,
        threshold in 0.0f64..=1.0,
    ) {
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let mut clustering = OrderedClustering::new(view, Euclidean::default(), num_segments, threshold)
            .expect("construction should succeed");
        let first = clustering
            .fit(None, &ExecutionContext::new())
            .expect("first fit should succeed");
        prop_assume!(first.stats.converged);
        let boundaries = clustering.boundaries().to_vec();

        let second = clustering
            .fit(None, &ExecutionContext::new())
            .expect("second fit should succeed");
        prop_assert_eq!(second.stats.accepted_moves, 0);
        prop_assert_eq!(clustering.boundaries(), boundaries.as_slice());
    }

    #[test]
    fn refitting_repeated_levels_changes_nothing(
        values in prop::collection::vec(prop::sample::select(vec![0.0f64, 1.0, 2.0]), 2..40),
        num_segments in 1usize..8,
        threshold in 0.0f64..=1.0,
    ) {
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let mut clustering = OrderedClustering::new(view, Euclidean::default(), num_segments, threshold)
            .expect("construction should succeed");
        let first = clustering
            .fit(None, &ExecutionContext::new())
            .expect("first fit should succeed");
        prop_assume!(first.stats.converged);
        let boundaries = clustering.boundaries().to_vec();

        let second = clustering
            .fit(None, &ExecutionContext::new())
            .expect("second fit should succeed");
        prop_assert_eq!(second.stats.accepted_moves, 0);
        prop_assert!(second.stats.converged);
        prop_assert_eq!(clustering.boundaries(), boundaries.as_slice());
    }

    #[test]
    fn explicit_partitions_are_adopted_or_rejected_by_index(
        lengths in prop::collection::vec(0usize..6, 1..8),
    ) {
        let n: usize = lengths.iter().sum();
        prop_assume!(n > 0);
        let values: Vec<f64> = (0..n).map(|idx| (idx as f64 * 1.3).sin()).collect();
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let mut clustering = OrderedClustering::new(view, Euclidean::default(), 2, 0.0)
            .expect("construction should succeed");

        let outcome = clustering.fit(Some(lengths.as_slice()), &ExecutionContext::new());
        match lengths.iter().position(|&len| len == 0) {
            Some(segment) => prop_assert_eq!(outcome, Err(SegError::EmptyCluster { segment })),
            None => {
                prop_assert!(outcome.is_ok());
                assert_tiling(clustering.boundaries(), n, lengths.len());
            }
        }
    }
}
