// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for order-preserving segmentation clustering.

pub mod diagnostics;
pub mod error;
pub mod execution_context;
pub mod math;
pub mod observability;
pub mod repro;
pub mod results;
pub mod sequence;

pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
pub use error::SegError;
pub use execution_context::ExecutionContext;
pub use math::{Euclidean, PathLength, VectorMath};
pub use observability::{ProgressSink, TelemetrySink};
pub use repro::ReproMode;
pub use results::{FitStats, SegmentSummary, SegmentationResult, validate_boundaries};
pub use sequence::SequenceView;
