// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{Diagnostics, SegError};

/// Validates a boundary set against a sequence of length `n`.
///
/// Boundaries are segment start indices: non-empty, `boundaries[0] == 0`,
/// strictly increasing, and every entry `< n`. Any violation maps to the
/// segment that would be empty.
pub fn validate_boundaries(n: usize, boundaries: &[usize]) -> Result<(), SegError> {
    if n == 0 {
        return Err(SegError::invalid_input("n must be >= 1"));
    }
    let Some(&first) = boundaries.first() else {
        return Err(SegError::invalid_input(
            "boundaries must contain at least one entry",
        ));
    };
    if first != 0 {
        return Err(SegError::invalid_input(format!(
            "boundaries must start at 0; got {first}"
        )));
    }

    for (segment, pair) in boundaries.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(SegError::empty_cluster(segment));
        }
    }

    let last_segment = boundaries.len() - 1;
    if boundaries[last_segment] >= n {
        return Err(SegError::empty_cluster(last_segment));
    }
    Ok(())
}

/// Move counters for a single fit.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FitStats {
    pub sweeps: usize,
    pub accepted_moves: usize,
    pub evaluations: usize,
    /// False when the sweep cap stopped the loop.
    pub converged: bool,
}

/// One contiguous segment of a finished fit.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentSummary {
    pub start: usize,
    pub end: usize,
    pub centroid: Vec<f64>,
    pub energy: f64,
}

impl SegmentSummary {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Owned snapshot of a fitted segmentation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationResult {
    pub n: usize,
    pub boundaries: Vec<usize>,
    pub segments: Vec<SegmentSummary>,
    pub total_energy: f64,
    pub stats: FitStats,
    pub diagnostics: Diagnostics,
}

impl SegmentationResult {
    /// Builds a result, checking that `segments` tile `[0, n)` in boundary order.
    pub fn new(
        n: usize,
        boundaries: Vec<usize>,
        segments: Vec<SegmentSummary>,
        total_energy: f64,
        stats: FitStats,
        diagnostics: Diagnostics,
    ) -> Result<Self, SegError> {
        validate_boundaries(n, &boundaries)?;
        if segments.len() != boundaries.len() {
            return Err(SegError::invalid_input(format!(
                "segment count mismatch: {} segments for {} boundaries",
                segments.len(),
                boundaries.len()
            )));
        }

        let mut cursor = 0usize;
        for (idx, segment) in segments.iter().enumerate() {
            if segment.start != cursor || segment.start != boundaries[idx] {
                return Err(SegError::invalid_input(format!(
                    "segment {idx} starts at {} but expected {cursor}",
                    segment.start
                )));
            }
            if segment.is_empty() {
                return Err(SegError::empty_cluster(idx));
            }
            cursor = segment.end;
        }
        if cursor != n {
            return Err(SegError::invalid_input(format!(
                "segments cover [0, {cursor}) but n={n}"
            )));
        }

        Ok(Self {
            n,
            boundaries,
            segments,
            total_energy,
            stats,
            diagnostics,
        })
    }

    pub fn num_segments(&self) -> usize {
        self.boundaries.len()
    }
}
