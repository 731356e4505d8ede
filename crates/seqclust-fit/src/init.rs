// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::InitMethod;
use seqclust_core::{PathLength, SequenceView, VectorMath};

/// Initial boundaries for `num_segments` segments over `x`.
///
/// `num_segments` is expected to be clamped to `[1, n]` already; values
/// outside that range fall back to the single-segment and singleton layouts.
pub fn initial_boundaries<M: VectorMath>(
    method: InitMethod,
    x: &SequenceView<'_>,
    num_segments: usize,
    math: &M,
) -> Vec<usize> {
    let n = x.n();
    match method {
        InitMethod::Default | InitMethod::EqualResample => equal_count_boundaries(n, num_segments),
        InitMethod::TraceSegmentation => {
            if let Some(trivial) = trivial_boundaries(n, num_segments) {
                return trivial;
            }
            let path = math.cumulative_path_length(x);
            trace_segmentation_boundaries(&path, n, num_segments)
        }
    }
}

fn trivial_boundaries(n: usize, num_segments: usize) -> Option<Vec<usize>> {
    if num_segments <= 1 {
        return Some(vec![0]);
    }
    if num_segments >= n {
        return Some((0..n).collect());
    }
    None
}

/// Boundaries spaced evenly by sample count.
///
/// Sample `i` opens a new segment whenever `floor((i + 1) * m / (n + 1))`
/// exceeds the last recorded quotient.
pub fn equal_count_boundaries(n: usize, num_segments: usize) -> Vec<usize> {
    if let Some(trivial) = trivial_boundaries(n, num_segments) {
        return trivial;
    }

    let m = num_segments as u128;
    let denom = n as u128 + 1;
    let mut boundaries = Vec::with_capacity(num_segments);
    boundaries.push(0);

    let mut last_quotient = 0u128;
    for i in 0..n {
        let quotient = (i as u128 + 1) * m / denom;
        if quotient > last_quotient {
            boundaries.push(i);
            last_quotient = quotient;
        }
    }
    boundaries
}

/// Boundaries spaced evenly by cumulative arc length.
///
/// The j-th boundary (0-based) is the first unused index whose cumulative
/// length reaches `j * total / m`, capped at `n - m + j` so every later
/// boundary still has a distinct index.
pub fn trace_segmentation_boundaries(
    path: &PathLength,
    n: usize,
    num_segments: usize,
) -> Vec<usize> {
    if let Some(trivial) = trivial_boundaries(n, num_segments) {
        return trivial;
    }

    let m = num_segments;
    let mut boundaries = Vec::with_capacity(m);
    let mut cursor = 0usize;

    for j in 0..m {
        let target = j as f64 * path.total / m as f64;
        let cap = n - m + j;
        while cursor < cap && path.values.get(cursor).is_some_and(|&len| len < target) {
            cursor += 1;
        }
        boundaries.push(cursor);
        cursor += 1;
    }
    boundaries
}
