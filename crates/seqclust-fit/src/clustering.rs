// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::{ClusteringConfig, InitMethod, MAX_SWEEPS};
use crate::energy::EnergyModel;
use crate::init::initial_boundaries;
use crate::optimizer::BoundarySearch;
use crate::partition::Partition;
use seqclust_core::{
    Diagnostics, ExecutionContext, FitStats, SegError, SegmentSummary, SegmentationResult,
    SequenceView, VectorMath,
};
use std::borrow::Cow;
use std::ops::Range;
use std::time::Instant;
use tracing::debug;

const ALGORITHM: &str = "greedy_boundary_shift";

/// Outcome of one [`OrderedClustering::fit`] call.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitReport {
    pub stats: FitStats,
    /// Total energy of the starting partition.
    pub initial_energy: f64,
    /// Total energy after the final full recompute.
    pub total_energy: f64,
    /// Difference between the incrementally tracked total and the recompute.
    pub drift: f64,
}

/// Mutable state of one clustering instance.
#[derive(Clone, Debug)]
struct FitState {
    init_method: InitMethod,
    partition: Partition,
    energy: EnergyModel,
    stats: FitStats,
    diagnostics: Diagnostics,
}

/// Order-preserving segmentation of a sequence into contiguous clusters.
///
/// The sequence and configuration are fixed at construction; boundaries,
/// centroids and energies are rebuilt by [`initialize`](Self::initialize) and
/// refined in place by [`fit`](Self::fit).
#[derive(Clone, Debug)]
pub struct OrderedClustering<'a, M: VectorMath> {
    x: SequenceView<'a>,
    math: M,
    config: ClusteringConfig,
    state: FitState,
}

impl<'a, M: VectorMath> OrderedClustering<'a, M> {
    /// Builds an instance and runs the default initializer.
    ///
    /// `num_segments` is clamped to `[1, n]` and `threshold` to `[0, 1]`.
    pub fn new(
        x: SequenceView<'a>,
        math: M,
        num_segments: usize,
        threshold: f64,
    ) -> Result<Self, SegError> {
        Self::with_config(x, math, ClusteringConfig::new(num_segments, threshold))
    }

    /// Builds an instance and runs `config.init`.
    pub fn with_config(
        x: SequenceView<'a>,
        math: M,
        config: ClusteringConfig,
    ) -> Result<Self, SegError> {
        if x.is_empty() {
            return Err(SegError::invalid_input("sequence must contain at least one sample"));
        }
        let config = config.clamped(x.n());
        let boundaries = initial_boundaries(config.init, &x, config.num_segments, &math);
        let partition = Partition::from_boundaries(x.n(), boundaries)?;
        let state = FitState {
            init_method: config.init,
            partition,
            energy: EnergyModel::new(),
            stats: FitStats::default(),
            diagnostics: Diagnostics::default(),
        };
        Ok(Self {
            x,
            math,
            config,
            state,
        })
    }

    /// Resets all fit state and lays out fresh boundaries with `method`.
    pub fn initialize(&mut self, method: InitMethod) -> Result<(), SegError> {
        let boundaries =
            initial_boundaries(method, &self.x, self.config.num_segments, &self.math);
        self.state = FitState {
            init_method: method,
            partition: Partition::from_boundaries(self.x.n(), boundaries)?,
            energy: EnergyModel::new(),
            stats: FitStats::default(),
            diagnostics: Diagnostics::default(),
        };
        debug!(
            method = %method,
            segments = self.state.partition.len(),
            "initialized boundaries"
        );
        Ok(())
    }

    /// Fits the segmentation.
    ///
    /// With `explicit_partition` (ordered segment lengths) the boundaries are
    /// adopted directly; otherwise the current boundaries are re-derived. The
    /// greedy search then runs to convergence or the sweep cap, followed by a
    /// full energy recompute.
    pub fn fit(
        &mut self,
        explicit_partition: Option<&[usize]>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<FitReport, SegError> {
        let started_at = Instant::now();
        let mut notes = vec![];
        let mut warnings = vec![];

        match explicit_partition {
            Some(lengths) => {
                self.state.partition = Partition::from_lengths(self.x.n(), lengths)?;
                notes.push(format!(
                    "explicit partition adopted with {} segments",
                    lengths.len()
                ));
            }
            None => self.state.partition.derive()?,
        }

        let energy = &mut self.state.energy;
        energy.recompute_all(&self.x, &self.state.partition, &self.math)?;
        let initial_energy = energy.total();
        debug!(
            n = self.x.n(),
            d = self.x.d(),
            segments = self.state.partition.len(),
            threshold = self.config.threshold,
            initial_energy,
            "fit started"
        );

        let stats = BoundarySearch::new(
            &self.x,
            &self.math,
            &mut self.state.partition,
            energy,
            self.config.threshold,
        )
        .run(ctx)?;

        let incremental_total = energy.total();
        energy.recompute_all(&self.x, &self.state.partition, &self.math)?;
        let total_energy = energy.total();
        let drift = incremental_total - total_energy;

        if !stats.converged {
            warnings.push(format!(
                "sweep cap of {MAX_SWEEPS} reached before convergence"
            ));
        }
        notes.push(format!(
            "sweeps={}, accepted_moves={}, evaluations={}, initial_energy={initial_energy}, total_energy={total_energy}, drift={drift}",
            stats.sweeps, stats.accepted_moves, stats.evaluations
        ));

        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        ctx.record_scalar("fit.sweeps", stats.sweeps as f64);
        ctx.record_scalar("fit.accepted_moves", stats.accepted_moves as f64);
        ctx.record_scalar("fit.evaluations", stats.evaluations as f64);
        ctx.record_scalar("fit.total_energy", total_energy);
        ctx.record_scalar("fit.runtime_ms", runtime_ms as f64);
        ctx.report_progress(1.0);

        self.state.stats = stats;
        self.state.diagnostics = Diagnostics {
            n: self.x.n(),
            d: self.x.d(),
            runtime_ms: Some(runtime_ms),
            notes,
            warnings,
            algorithm: Cow::Borrowed(ALGORITHM),
            math_backend: Cow::Borrowed(self.math.name()),
            init_method: if explicit_partition.is_some() {
                Cow::Borrowed("explicit")
            } else {
                Cow::Borrowed(self.state.init_method.as_str())
            },
            num_segments: self.state.partition.len(),
            threshold: self.config.threshold,
            ..Diagnostics::default()
        };

        debug!(
            sweeps = stats.sweeps,
            accepted_moves = stats.accepted_moves,
            evaluations = stats.evaluations,
            total_energy,
            drift,
            converged = stats.converged,
            "fit finished"
        );

        Ok(FitReport {
            stats,
            initial_energy,
            total_energy,
            drift,
        })
    }

    pub fn sequence(&self) -> &SequenceView<'a> {
        &self.x
    }

    pub fn math(&self) -> &M {
        &self.math
    }

    /// Clamped configuration.
    pub fn config(&self) -> ClusteringConfig {
        self.config
    }

    pub fn init_method(&self) -> InitMethod {
        self.state.init_method
    }

    /// Current number of segments (changes when an explicit partition is adopted).
    pub fn num_segments(&self) -> usize {
        self.state.partition.len()
    }

    pub fn boundaries(&self) -> &[usize] {
        self.state.partition.boundaries()
    }

    pub fn segments(&self) -> &[Range<usize>] {
        self.state.partition.ranges()
    }

    pub fn segment_members(&self, segment: usize) -> Result<SequenceView<'a>, SegError> {
        self.state.partition.members(&self.x, segment)
    }

    /// Empty until the first fit.
    pub fn centroids(&self) -> &[Vec<f64>] {
        self.state.energy.centroids()
    }

    /// Empty until the first fit.
    pub fn local_energies(&self) -> &[f64] {
        self.state.energy.local_energies()
    }

    pub fn total_energy(&self) -> f64 {
        self.state.energy.total()
    }

    pub fn stats(&self) -> FitStats {
        self.state.stats
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.state.diagnostics
    }

    /// Owned snapshot of the fitted state.
    pub fn result(&self) -> Result<SegmentationResult, SegError> {
        let centroids = self.state.energy.centroids();
        let local = self.state.energy.local_energies();
        if centroids.len() != self.num_segments() {
            return Err(SegError::invalid_input(
                "result requested before fit; call fit() first",
            ));
        }

        let segments = self
            .segments()
            .iter()
            .zip(centroids)
            .zip(local)
            .map(|((range, centroid), &energy)| SegmentSummary {
                start: range.start,
                end: range.end,
                centroid: centroid.clone(),
                energy,
            })
            .collect();

        SegmentationResult::new(
            self.x.n(),
            self.boundaries().to_vec(),
            segments,
            self.total_energy(),
            self.state.stats,
            self.state.diagnostics.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::OrderedClustering;
    use crate::config::{ClusteringConfig, InitMethod};
    use seqclust_core::{Euclidean, ExecutionContext, SegError, SequenceView, TelemetrySink};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTelemetry {
        keys: Mutex<Vec<&'static str>>,
    }

    impl TelemetrySink for RecordingTelemetry {
        fn record_scalar(&self, key: &'static str, _value: f64) {
            self.keys
                .lock()
                .expect("telemetry mutex should lock")
                .push(key);
        }
    }

    #[test]
    fn construction_clamps_configuration() {
        let values = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");

        let low = OrderedClustering::new(view, Euclidean::default(), 0, -1.0)
            .expect("construction should succeed");
        assert_eq!(low.config(), ClusteringConfig::new(1, 0.0));
        assert_eq!(low.boundaries(), &[0]);

        let high = OrderedClustering::new(view, Euclidean::default(), 60, 5.0)
            .expect("construction should succeed");
        assert_eq!(high.config(), ClusteringConfig::new(6, 1.0));
        assert_eq!(high.boundaries(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn with_config_runs_configured_initializer() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let config = ClusteringConfig::new(2, 0.0).with_init(InitMethod::TraceSegmentation);

        let clustering = OrderedClustering::with_config(view, Euclidean::default(), config)
            .expect("construction should succeed");
        assert_eq!(clustering.init_method(), InitMethod::TraceSegmentation);
        assert_eq!(clustering.boundaries(), &[0, 5]);
    }

    #[test]
    fn result_before_fit_is_rejected() {
        let values = [0.0, 1.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let clustering = OrderedClustering::new(view, Euclidean::default(), 2, 0.0)
            .expect("construction should succeed");
        assert!(clustering.centroids().is_empty());
        assert!(matches!(clustering.result(), Err(SegError::InvalidInput(_))));
    }

    #[test]
    fn fit_populates_state_and_telemetry() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let telemetry = RecordingTelemetry::default();
        let ctx = ExecutionContext::new().with_telemetry_sink(&telemetry);

        let mut clustering = OrderedClustering::new(view, Euclidean::default(), 2, 0.0)
            .expect("construction should succeed");
        let report = clustering.fit(None, &ctx).expect("fit should succeed");

        assert_eq!(clustering.boundaries(), &[0, 5]);
        assert_eq!(clustering.segments(), &[0..5, 5..8]);
        assert_eq!(clustering.centroids(), &[vec![0.0], vec![10.0]]);
        assert_eq!(clustering.local_energies(), &[0.0, 0.0]);
        assert_eq!(report.initial_energy, 75.0);
        assert_eq!(report.total_energy, 0.0);
        assert_eq!(report.stats.accepted_moves, 1);
        assert!(report.drift.abs() < 1e-9);

        let diagnostics = clustering.diagnostics();
        assert_eq!(diagnostics.algorithm, "greedy_boundary_shift");
        assert_eq!(diagnostics.math_backend, "euclidean");
        assert_eq!(diagnostics.init_method, "default");
        assert_eq!(diagnostics.num_segments, 2);

        let keys = telemetry
            .keys
            .lock()
            .expect("telemetry mutex should lock")
            .clone();
        assert_eq!(
            keys,
            vec![
                "fit.sweeps",
                "fit.accepted_moves",
                "fit.evaluations",
                "fit.total_energy",
                "fit.runtime_ms"
            ]
        );
    }

    #[test]
    fn explicit_partition_replaces_segment_count() {
        let values = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 30.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let mut clustering = OrderedClustering::new(view, Euclidean::default(), 2, 0.0)
            .expect("construction should succeed");

        clustering
            .fit(Some(&[3, 3, 1]), &ExecutionContext::new())
            .expect("fit should succeed");
        assert_eq!(clustering.num_segments(), 3);
        assert_eq!(clustering.boundaries(), &[0, 3, 6]);
        assert_eq!(clustering.diagnostics().init_method, "explicit");
    }

    #[test]
    fn explicit_partition_with_empty_segment_fails_without_touching_state() {
        let values = [0.0, 1.0, 2.0, 3.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let mut clustering = OrderedClustering::new(view, Euclidean::default(), 2, 0.0)
            .expect("construction should succeed");

        let err = clustering
            .fit(Some(&[4, 0]), &ExecutionContext::new())
            .expect_err("empty segment must fail");
        assert_eq!(err, SegError::empty_cluster(1));
        assert_eq!(clustering.boundaries(), &[0, 2]);
    }

    #[test]
    fn initialize_switches_strategy_and_resets_state() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let mut clustering = OrderedClustering::new(view, Euclidean::default(), 2, 0.0)
            .expect("construction should succeed");
        clustering
            .fit(None, &ExecutionContext::new())
            .expect("fit should succeed");
        assert!(!clustering.centroids().is_empty());

        clustering
            .initialize(InitMethod::EqualResample)
            .expect("initialize should succeed");
        assert_eq!(clustering.boundaries(), &[0, 4]);
        assert!(clustering.centroids().is_empty());
        assert_eq!(clustering.stats().sweeps, 0);

        clustering
            .initialize(InitMethod::TraceSegmentation)
            .expect("initialize should succeed");
        assert_eq!(clustering.init_method(), InitMethod::TraceSegmentation);
        assert_eq!(clustering.boundaries(), &[0, 5]);
    }

    #[test]
    fn result_snapshot_matches_accessors() {
        let values = [0.0, 1.0, 9.0, 10.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let mut clustering = OrderedClustering::new(view, Euclidean::default(), 2, 0.0)
            .expect("construction should succeed");
        clustering
            .fit(None, &ExecutionContext::new())
            .expect("fit should succeed");

        let result = clustering.result().expect("result should build");
        assert_eq!(result.boundaries, vec![0, 2]);
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].centroid, vec![0.5]);
        assert_eq!(result.segments[1].centroid, vec![9.5]);
        assert_eq!(result.total_energy, 1.0);
        assert_eq!(
            clustering
                .segment_members(1)
                .expect("segment exists")
                .values(),
            &[9.0, 10.0]
        );
    }
}
