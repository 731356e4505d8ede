// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::MAX_SWEEPS;
use crate::energy::EnergyModel;
use crate::partition::Partition;
use seqclust_core::{ExecutionContext, FitStats, SegError, SequenceView, VectorMath};
use tracing::{debug, trace, warn};

/// Which neighbor a scan hands samples to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// First member of segment `j` moves into `j - 1`.
    Left,
    /// Last member of segment `j` moves into `j + 1`.
    Right,
}

/// Maximum candidates examined per scan of a segment with `n` members.
///
/// `threshold = 0` explores about half the segment, `threshold = 1` a single
/// candidate.
pub fn scan_bound(n: usize, threshold: f64) -> usize {
    ((n as f64) * 0.5 * (1.0 - threshold)).floor() as usize + 1
}

fn checked_counter_increment(counter: &mut usize, name: &str) -> Result<(), SegError> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| SegError::numerical_issue(format!("{name} counter overflow")))?;
    Ok(())
}

/// Greedy boundary-shift search over one partition.
///
/// Owns mutable borrows of the partition and energy model for the duration of
/// a fit; nothing else can observe them mid-search.
pub struct BoundarySearch<'r, 'a, M: VectorMath> {
    x: &'r SequenceView<'a>,
    math: &'r M,
    partition: &'r mut Partition,
    energy: &'r mut EnergyModel,
    threshold: f64,
    stats: FitStats,
}

impl<'r, 'a, M: VectorMath> BoundarySearch<'r, 'a, M> {
    /// `energy` must already be computed for `partition`.
    pub fn new(
        x: &'r SequenceView<'a>,
        math: &'r M,
        partition: &'r mut Partition,
        energy: &'r mut EnergyModel,
        threshold: f64,
    ) -> Self {
        Self {
            x,
            math,
            partition,
            energy,
            threshold,
            stats: FitStats::default(),
        }
    }

    pub fn stats(&self) -> FitStats {
        self.stats
    }

    pub fn partition(&self) -> &Partition {
        self.partition
    }

    pub fn energy(&self) -> &EnergyModel {
        self.energy
    }

    /// Runs sweeps until one accepts nothing or [`MAX_SWEEPS`] have run.
    pub fn run(mut self, ctx: &ExecutionContext<'_>) -> Result<FitStats, SegError> {
        if self.partition.len() < 2 {
            self.stats.converged = true;
            return Ok(self.stats);
        }

        while self.stats.sweeps < MAX_SWEEPS {
            let accepted = self.sweep()?;
            checked_counter_increment(&mut self.stats.sweeps, "sweeps")?;
            ctx.report_progress(self.stats.sweeps as f32 / MAX_SWEEPS as f32);
            debug!(
                sweep = self.stats.sweeps,
                accepted,
                evaluations = self.stats.evaluations,
                total_energy = self.energy.total(),
                "boundary sweep finished"
            );

            if accepted == 0 {
                self.stats.converged = true;
                break;
            }
        }

        if !self.stats.converged {
            warn!(
                sweeps = self.stats.sweeps,
                accepted_moves = self.stats.accepted_moves,
                "sweep cap reached before convergence"
            );
        }
        Ok(self.stats)
    }

    /// One pass over every segment; returns the number of accepted moves.
    ///
    /// Both scans of a segment share the bound taken from its size at the
    /// start of its turn.
    pub fn sweep(&mut self) -> Result<usize, SegError> {
        let mut accepted = 0usize;
        let segments = self.partition.len();
        for j in 0..segments {
            let bound = scan_bound(self.partition.segment_len(j), self.threshold);
            if j > 0 {
                accepted += self.scan(j, Direction::Left, bound)?;
            }
            if j + 1 < segments {
                accepted += self.scan(j, Direction::Right, bound)?;
            }
        }
        Ok(accepted)
    }

    /// Moves boundary samples of `segment` toward one neighbor until the
    /// first rejection or `bound` attempts.
    pub fn scan(
        &mut self,
        segment: usize,
        direction: Direction,
        bound: usize,
    ) -> Result<usize, SegError> {
        let mut accepted = 0usize;
        for _ in 0..bound {
            if !self.try_move(segment, direction)? {
                break;
            }
            accepted += 1;
        }
        Ok(accepted)
    }

    /// Evaluates moving the boundary sample of `segment` in `direction` and
    /// applies the move when it lowers total energy by more than rounding noise.
    pub fn try_move(&mut self, segment: usize, direction: Direction) -> Result<bool, SegError> {
        let range = self.partition.range(segment).ok_or_else(|| {
            SegError::invalid_input(format!(
                "segment index {segment} out of range for {} segments",
                self.partition.len()
            ))
        })?;
        let (sample_idx, neighbor) = match direction {
            Direction::Left => (range.start, segment.checked_sub(1)),
            Direction::Right => (
                range.end.saturating_sub(1),
                Some(segment + 1).filter(|&next| next < self.partition.len()),
            ),
        };
        let Some(neighbor) = neighbor else {
            return Err(SegError::invalid_input(format!(
                "segment {segment} has no {direction:?} neighbor"
            )));
        };

        checked_counter_increment(&mut self.stats.evaluations, "evaluations")?;

        let n = range.len();
        if n < 2 {
            return Ok(false);
        }
        let m = self.partition.segment_len(neighbor);
        let sample = self.x.row(sample_idx);
        let cost = self
            .energy
            .move_cost(self.math, sample, segment, neighbor, n, m)?;
        if !cost.improves() {
            return Ok(false);
        }

        match direction {
            Direction::Left => self.partition.move_first_to_previous(segment)?,
            Direction::Right => self.partition.move_last_to_next(segment)?,
        }
        self.energy
            .apply_incremental_move(sample, segment, neighbor, n, m, cost)?;
        checked_counter_increment(&mut self.stats.accepted_moves, "accepted_moves")?;

        trace!(
            sample = sample_idx,
            from = segment,
            to = neighbor,
            delta = cost.delta(),
            "accepted boundary move"
        );
        Ok(true)
    }
}
