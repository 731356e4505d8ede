// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seqclust_core::{SegError, SequenceView, validate_boundaries};
use std::ops::Range;

/// Contiguous segmentation of `[0, n)` described by segment start indices.
///
/// Every public constructor and mutation re-derives the member ranges and
/// fails with [`SegError::EmptyCluster`] rather than leaving an empty segment
/// behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    n: usize,
    boundaries: Vec<usize>,
    ranges: Vec<Range<usize>>,
}

impl Partition {
    /// Adopts `boundaries` as segment starts and derives membership.
    pub fn from_boundaries(n: usize, boundaries: Vec<usize>) -> Result<Self, SegError> {
        let mut partition = Self {
            n,
            boundaries,
            ranges: Vec::new(),
        };
        partition.derive()?;
        Ok(partition)
    }

    /// Adopts an explicit partition given as ordered segment lengths.
    ///
    /// Boundaries are the cumulative start offsets `0, l0, l0 + l1, ...`.
    pub fn from_lengths(n: usize, lengths: &[usize]) -> Result<Self, SegError> {
        if lengths.is_empty() {
            return Err(SegError::invalid_input(
                "explicit partition must contain at least one segment",
            ));
        }
        if let Some(segment) = lengths.iter().position(|&len| len == 0) {
            return Err(SegError::empty_cluster(segment));
        }

        let mut boundaries = Vec::with_capacity(lengths.len());
        let mut offset = 0usize;
        for &len in lengths {
            boundaries.push(offset);
            offset = offset.checked_add(len).ok_or_else(|| {
                SegError::invalid_input("explicit partition length overflow")
            })?;
        }
        if offset != n {
            return Err(SegError::invalid_input(format!(
                "explicit partition covers {offset} samples but the sequence has n={n}"
            )));
        }

        Self::from_boundaries(n, boundaries)
    }

    /// Recomputes member ranges from the current boundaries.
    pub fn derive(&mut self) -> Result<(), SegError> {
        validate_boundaries(self.n, &self.boundaries)?;

        self.ranges.clear();
        for (j, &start) in self.boundaries.iter().enumerate() {
            let end = self.boundaries.get(j + 1).copied().unwrap_or(self.n);
            self.ranges.push(start..end);
        }
        Ok(())
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn range(&self, segment: usize) -> Option<Range<usize>> {
        self.ranges.get(segment).cloned()
    }

    pub fn segment_len(&self, segment: usize) -> usize {
        self.ranges.get(segment).map_or(0, |range| range.len())
    }

    /// Samples belonging to `segment`.
    pub fn members<'a>(
        &self,
        x: &SequenceView<'a>,
        segment: usize,
    ) -> Result<SequenceView<'a>, SegError> {
        let range = self.range(segment).ok_or_else(|| {
            SegError::invalid_input(format!(
                "segment index {segment} out of range for {} segments",
                self.len()
            ))
        })?;
        let members = x.rows(range.clone()).ok_or_else(|| {
            SegError::invalid_input(format!(
                "segment {segment} range [{}, {}) exceeds sequence length {}",
                range.start,
                range.end,
                x.n()
            ))
        })?;
        if members.is_empty() {
            return Err(SegError::empty_cluster(segment));
        }
        Ok(members)
    }

    /// Hands the first member of `segment` to `segment - 1`.
    pub fn move_first_to_previous(&mut self, segment: usize) -> Result<(), SegError> {
        if segment == 0 || segment >= self.len() {
            return Err(SegError::invalid_input(format!(
                "segment {segment} has no previous neighbor"
            )));
        }
        if self.segment_len(segment) < 2 {
            return Err(SegError::empty_cluster(segment));
        }
        self.boundaries[segment] += 1;
        self.derive()
    }

    /// Hands the last member of `segment` to `segment + 1`.
    pub fn move_last_to_next(&mut self, segment: usize) -> Result<(), SegError> {
        if segment + 1 >= self.len() {
            return Err(SegError::invalid_input(format!(
                "segment {segment} has no next neighbor"
            )));
        }
        if self.segment_len(segment) < 2 {
            return Err(SegError::empty_cluster(segment));
        }
        self.boundaries[segment + 1] -= 1;
        self.derive()
    }
}

#[cfg(test)]
mod tests {
    use super::Partition;
    use seqclust_core::{SegError, SequenceView};

    #[test]
    fn from_boundaries_derives_ranges() {
        let partition = Partition::from_boundaries(6, vec![0, 3]).expect("valid boundaries");
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.ranges(), &[0..3, 3..6]);
        assert_eq!(partition.segment_len(1), 3);
        assert_eq!(partition.segment_len(9), 0);
    }

    #[test]
    fn from_boundaries_rejects_empty_segments() {
        assert_eq!(
            Partition::from_boundaries(6, vec![0, 3, 3]),
            Err(SegError::empty_cluster(1))
        );
        assert_eq!(
            Partition::from_boundaries(4, vec![0, 4]),
            Err(SegError::empty_cluster(1))
        );
    }

    #[test]
    fn from_lengths_uses_cumulative_offsets() {
        let partition = Partition::from_lengths(10, &[2, 5, 3]).expect("valid lengths");
        assert_eq!(partition.boundaries(), &[0, 2, 7]);
        assert_eq!(partition.ranges(), &[0..2, 2..7, 7..10]);
    }

    #[test]
    fn from_lengths_rejects_zero_length_and_bad_totals() {
        assert_eq!(
            Partition::from_lengths(5, &[2, 0, 3]),
            Err(SegError::empty_cluster(1))
        );

        let err = Partition::from_lengths(5, &[2, 2]).expect_err("short cover must fail");
        assert!(err.to_string().contains("covers 4 samples"));

        let err = Partition::from_lengths(5, &[]).expect_err("empty partition must fail");
        assert!(matches!(err, SegError::InvalidInput(_)));
    }

    #[test]
    fn members_returns_segment_samples() {
        let values = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let view = SequenceView::univariate(&values).expect("view should be valid");
        let partition = Partition::from_boundaries(6, vec![0, 3]).expect("valid boundaries");

        let second = partition.members(&view, 1).expect("segment 1 exists");
        assert_eq!(second.values(), &[10.0, 11.0, 12.0]);
        assert!(partition.members(&view, 2).is_err());
    }

    #[test]
    fn boundary_shifts_move_one_sample() {
        let mut partition = Partition::from_boundaries(6, vec![0, 3]).expect("valid boundaries");

        partition.move_first_to_previous(1).expect("left move succeeds");
        assert_eq!(partition.boundaries(), &[0, 4]);

        partition.move_last_to_next(0).expect("right move succeeds");
        partition.move_last_to_next(0).expect("right move succeeds");
        assert_eq!(partition.boundaries(), &[0, 2]);
        assert_eq!(partition.ranges(), &[0..2, 2..6]);
    }

    #[test]
    fn boundary_shift_never_empties_a_segment() {
        let mut partition = Partition::from_boundaries(3, vec![0, 2]).expect("valid boundaries");
        assert_eq!(
            partition.move_first_to_previous(1),
            Err(SegError::empty_cluster(1))
        );
        assert_eq!(partition.boundaries(), &[0, 2]);

        assert!(partition.move_first_to_previous(0).is_err());
        assert!(partition.move_last_to_next(1).is_err());
    }
}
