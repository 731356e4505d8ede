// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Order-preserving segmentation clustering.
//!
//! A sequence of `n` samples is split into `M` contiguous, non-empty segments
//! whose total within-segment squared distance to the segment centroid is
//! reduced by greedily shifting boundary samples between neighbors.

pub mod clustering;
pub mod config;
pub mod energy;
pub mod init;
pub mod optimizer;
pub mod partition;

pub use clustering::{FitReport, OrderedClustering};
pub use config::{
    ClusteringConfig, DEFAULT_NUM_SEGMENTS, DEFAULT_THRESHOLD, InitMethod, MAX_SWEEPS,
    clamp_num_segments, clamp_threshold,
};
pub use energy::{EnergyModel, IMPROVEMENT_EPS, MoveCost};
pub use init::{equal_count_boundaries, initial_boundaries, trace_segmentation_boundaries};
pub use optimizer::{BoundarySearch, Direction, scan_bound};
pub use partition::Partition;
