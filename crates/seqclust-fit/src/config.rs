// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seqclust_core::SegError;
use std::fmt;
use std::str::FromStr;

/// Hard cap on optimization sweeps per fit.
pub const MAX_SWEEPS: usize = 100;

pub const DEFAULT_NUM_SEGMENTS: usize = 2;
pub const DEFAULT_THRESHOLD: f64 = 0.0;

/// Boundary initialization strategy.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitMethod {
    /// Equal sample counts per segment.
    #[default]
    Default,
    /// Equal cumulative arc length per segment.
    TraceSegmentation,
    /// Equal sample counts per segment.
    EqualResample,
}

impl InitMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::TraceSegmentation => "trace_segmentation",
            Self::EqualResample => "equal_resample",
        }
    }
}

impl fmt::Display for InitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitMethod {
    type Err = SegError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "ts" | "trace" | "trace_segmentation" => Ok(Self::TraceSegmentation),
            "eq" | "resample" | "equal_resample" => Ok(Self::EqualResample),
            other => Err(SegError::invalid_input(format!(
                "unknown init method '{other}'; expected one of: default, ts, eq"
            ))),
        }
    }
}

/// Segment count, search depth and initializer for one clustering instance.
///
/// Out-of-range values are never rejected: [`ClusteringConfig::clamped`]
/// pulls `num_segments` into `[1, n]` and `threshold` into `[0, 1]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusteringConfig {
    pub num_segments: usize,
    pub threshold: f64,
    /// Initializer used at construction.
    pub init: InitMethod,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            num_segments: DEFAULT_NUM_SEGMENTS,
            threshold: DEFAULT_THRESHOLD,
            init: InitMethod::Default,
        }
    }
}

impl ClusteringConfig {
    pub fn new(num_segments: usize, threshold: f64) -> Self {
        Self {
            num_segments,
            threshold,
            init: InitMethod::Default,
        }
    }

    pub fn with_init(mut self, init: InitMethod) -> Self {
        self.init = init;
        self
    }

    /// Returns the configuration normalized for a sequence of `n >= 1` samples.
    pub fn clamped(self, n: usize) -> Self {
        Self {
            num_segments: clamp_num_segments(self.num_segments, n),
            threshold: clamp_threshold(self.threshold),
            init: self.init,
        }
    }
}

pub fn clamp_num_segments(num_segments: usize, n: usize) -> usize {
    num_segments.clamp(1, n.max(1))
}

/// NaN maps to 0 (deepest search).
pub fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_nan() {
        return 0.0;
    }
    threshold.clamp(0.0, 1.0)
}
