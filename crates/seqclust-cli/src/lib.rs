// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seqclust_core::{
    Euclidean, ExecutionContext, ProgressSink, ReproMode, SegError, SegmentationResult,
    SequenceView, TelemetrySink,
};
use seqclust_fit::{ClusteringConfig, FitReport, OrderedClustering};
use tracing::{debug, trace};

/// One fit as requested on the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct FitRequest {
    pub config: ClusteringConfig,
    pub repro_mode: ReproMode,
    /// Explicit segment lengths, adopted instead of the initializer's boundaries.
    pub partition: Option<Vec<usize>>,
}

impl Default for FitRequest {
    fn default() -> Self {
        Self {
            config: ClusteringConfig::default(),
            repro_mode: ReproMode::Balanced,
            partition: None,
        }
    }
}

/// Forwards fit telemetry and progress to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record_scalar(&self, key: &'static str, value: f64) {
        debug!(key, value, "telemetry");
    }
}

impl ProgressSink for TracingSink {
    fn on_progress(&self, fraction: f32) {
        trace!(fraction, "progress");
    }
}

/// Runs a full construct-initialize-fit cycle with Euclidean math.
pub fn run_fit(
    x: SequenceView<'_>,
    request: &FitRequest,
) -> Result<(SegmentationResult, FitReport), SegError> {
    let sink = TracingSink;
    let ctx = ExecutionContext::new()
        .with_progress_sink(&sink)
        .with_telemetry_sink(&sink);

    let mut clustering =
        OrderedClustering::with_config(x, Euclidean::new(request.repro_mode), request.config)?;
    let report = clustering.fit(request.partition.as_deref(), &ctx)?;
    Ok((clustering.result()?, report))
}
