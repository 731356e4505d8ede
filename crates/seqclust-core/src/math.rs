// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{ReproMode, SegError, SequenceView};

/// Running arc length along an ordered sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct PathLength {
    /// One non-decreasing entry per sample; `values[0] == 0.0`.
    pub values: Vec<f64>,
    pub total: f64,
}

/// Vector arithmetic consumed by the segmentation engine.
///
/// The engine never performs distance or mean computations itself; it is
/// generic over this trait so alternative metrics or instrumented
/// implementations can be injected.
pub trait VectorMath {
    /// Short backend identifier used in diagnostics.
    fn name(&self) -> &'static str;

    /// Squared Euclidean distance between equal-length vectors.
    fn squared_distance(&self, u: &[f64], v: &[f64]) -> f64;

    /// Element-wise mean; fails for an empty sequence.
    fn mean(&self, points: &SequenceView<'_>) -> Result<Vec<f64>, SegError>;

    /// Running Euclidean arc length, one entry per sample.
    fn cumulative_path_length(&self, points: &SequenceView<'_>) -> PathLength;
}

impl<M: VectorMath + ?Sized> VectorMath for &M {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn squared_distance(&self, u: &[f64], v: &[f64]) -> f64 {
        (**self).squared_distance(u, v)
    }

    fn mean(&self, points: &SequenceView<'_>) -> Result<Vec<f64>, SegError> {
        (**self).mean(points)
    }

    fn cumulative_path_length(&self, points: &SequenceView<'_>) -> PathLength {
        (**self).cumulative_path_length(points)
    }
}

/// Default dense Euclidean math.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Euclidean {
    pub repro_mode: ReproMode,
}

impl Euclidean {
    pub const fn new(repro_mode: ReproMode) -> Self {
        Self { repro_mode }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }
}

impl VectorMath for Euclidean {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn squared_distance(&self, u: &[f64], v: &[f64]) -> f64 {
        debug_assert_eq!(u.len(), v.len(), "squared_distance requires equal lengths");
        u.iter()
            .zip(v)
            .map(|(a, b)| {
                let diff = a - b;
                diff * diff
            })
            .sum()
    }

    fn mean(&self, points: &SequenceView<'_>) -> Result<Vec<f64>, SegError> {
        if points.is_empty() {
            return Err(SegError::invalid_input(
                "mean requires at least one point; got an empty sequence",
            ));
        }

        let d = points.d();
        let count = points.n() as f64;
        if self.repro_mode.compensated() {
            let mut sums = vec![KahanSum::default(); d];
            for row in points.iter_rows() {
                for (acc, &value) in sums.iter_mut().zip(row) {
                    acc.add(value);
                }
            }
            return Ok(sums.into_iter().map(|acc| acc.sum / count).collect());
        }

        let mut sums = vec![0.0; d];
        for row in points.iter_rows() {
            for (acc, &value) in sums.iter_mut().zip(row) {
                *acc += value;
            }
        }
        Ok(sums.into_iter().map(|sum| sum / count).collect())
    }

    fn cumulative_path_length(&self, points: &SequenceView<'_>) -> PathLength {
        let mut values = Vec::with_capacity(points.n());
        let mut acc = KahanSum::default();
        let mut previous: Option<&[f64]> = None;

        for row in points.iter_rows() {
            if let Some(prev) = previous {
                let step = self.squared_distance(prev, row).sqrt();
                if self.repro_mode.compensated() {
                    acc.add(step);
                } else {
                    acc.sum += step;
                }
            }
            values.push(acc.sum);
            previous = Some(row);
        }

        PathLength {
            total: values.last().copied().unwrap_or(0.0),
            values,
        }
    }
}
