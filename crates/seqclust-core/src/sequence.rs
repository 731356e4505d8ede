// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SegError;
use std::ops::Range;

/// Zero-copy, order-preserving view over `n` samples of dimension `d`.
///
/// Values are stored row-major: sample `t` occupies `values[t * d..(t + 1) * d]`.
/// Views built with [`SequenceView::new`] are non-empty and finite; sub-views
/// produced by [`SequenceView::rows`] may be empty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequenceView<'a> {
    values: &'a [f64],
    n: usize,
    d: usize,
}

impl<'a> SequenceView<'a> {
    /// Constructs a validated view.
    pub fn new(values: &'a [f64], n: usize, d: usize) -> Result<Self, SegError> {
        if n == 0 {
            return Err(SegError::invalid_input("n must be >= 1"));
        }
        if d == 0 {
            return Err(SegError::invalid_input("d must be >= 1"));
        }

        let expected_len = n
            .checked_mul(d)
            .ok_or_else(|| SegError::invalid_input("n*d overflow while validating shape"))?;
        if values.len() != expected_len {
            return Err(SegError::invalid_input(format!(
                "value length mismatch: got {}, expected {expected_len} (n={n}, d={d})",
                values.len()
            )));
        }

        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(SegError::invalid_input(format!(
                "non-finite value at sample {}, dimension {}: {value}",
                idx / d,
                idx % d
            )));
        }

        Ok(Self { values, n, d })
    }

    /// Convenience constructor for univariate data.
    pub fn univariate(values: &'a [f64]) -> Result<Self, SegError> {
        Self::new(values, values.len(), 1)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Raw row-major values backing this view.
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Sample `t`.
    ///
    /// # Panics
    ///
    /// Panics when `t >= n`.
    pub fn row(&self, t: usize) -> &'a [f64] {
        let start = t * self.d;
        &self.values[start..start + self.d]
    }

    pub fn get_row(&self, t: usize) -> Option<&'a [f64]> {
        if t >= self.n {
            return None;
        }
        Some(self.row(t))
    }

    /// Samples in order.
    pub fn iter_rows(self) -> impl ExactSizeIterator<Item = &'a [f64]> {
        self.values.chunks_exact(self.d)
    }

    /// Contiguous sub-view over samples `range`; `None` when out of bounds.
    pub fn rows(&self, range: Range<usize>) -> Option<Self> {
        if range.start > range.end || range.end > self.n {
            return None;
        }
        let values = &self.values[range.start * self.d..range.end * self.d];
        Some(Self {
            values,
            n: range.len(),
            d: self.d,
        })
    }
}
