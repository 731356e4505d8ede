// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::partition::Partition;
use seqclust_core::{SegError, SequenceView, VectorMath};

/// Closed-form cost terms for moving one sample between adjacent segments.
///
/// For a sample leaving a segment of size `n` for a neighbor of size `m`,
/// `insert_cost = m / (m + 1) * |x - c_dest|^2` and
/// `removal_gain = n / (n - 1) * |x - c_src|^2`. The change in total energy is
/// exactly `insert_cost - removal_gain`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveCost {
    pub insert_cost: f64,
    pub removal_gain: f64,
}

/// Relative margin a move must clear before it counts as an improvement.
pub const IMPROVEMENT_EPS: f64 = 1e-12;

impl MoveCost {
    pub fn delta(&self) -> f64 {
        self.insert_cost - self.removal_gain
    }

    /// True when the move lowers total energy by more than rounding noise.
    ///
    /// Ties and NaN deltas are rejected, so a converged partition refits to
    /// itself.
    pub fn improves(&self) -> bool {
        let scale = (self.insert_cost + self.removal_gain).max(f64::MIN_POSITIVE);
        self.delta() < -IMPROVEMENT_EPS * scale
    }
}

/// Per-segment centroids and energies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnergyModel {
    centroids: Vec<Vec<f64>>,
    local: Vec<f64>,
    total: f64,
}

impl EnergyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all centroids and energies.
    pub fn clear(&mut self) {
        self.centroids.clear();
        self.local.clear();
        self.total = 0.0;
    }

    /// Full O(n * d) recomputation from the current partition.
    pub fn recompute_all<M: VectorMath>(
        &mut self,
        x: &SequenceView<'_>,
        partition: &Partition,
        math: &M,
    ) -> Result<(), SegError> {
        let mut centroids = Vec::with_capacity(partition.len());
        let mut local = Vec::with_capacity(partition.len());

        for segment in 0..partition.len() {
            let members = partition.members(x, segment)?;
            let centroid = math.mean(&members)?;
            let energy: f64 = members
                .iter_rows()
                .map(|row| math.squared_distance(row, &centroid))
                .sum();
            if !energy.is_finite() {
                return Err(SegError::numerical_issue(format!(
                    "non-finite energy for segment {segment}: {energy}"
                )));
            }
            centroids.push(centroid);
            local.push(energy);
        }

        let total: f64 = local.iter().sum();
        if !total.is_finite() {
            return Err(SegError::numerical_issue(format!(
                "non-finite total energy: {total}"
            )));
        }

        self.centroids = centroids;
        self.local = local;
        self.total = total;
        Ok(())
    }

    /// Cost terms for moving `sample` from `source` (size `n`) into `dest` (size `m`).
    ///
    /// `n` must be at least 2; callers reject smaller sources before asking.
    pub fn move_cost<M: VectorMath>(
        &self,
        math: &M,
        sample: &[f64],
        source: usize,
        dest: usize,
        n: usize,
        m: usize,
    ) -> Result<MoveCost, SegError> {
        self.check_move(source, dest)?;
        let n = n as f64;
        let m = m as f64;
        Ok(MoveCost {
            insert_cost: m / (m + 1.0) * math.squared_distance(sample, &self.centroids[dest]),
            removal_gain: n / (n - 1.0) * math.squared_distance(sample, &self.centroids[source]),
        })
    }

    fn check_move(&self, source: usize, dest: usize) -> Result<(), SegError> {
        if source >= self.centroids.len() || dest >= self.centroids.len() || source == dest {
            return Err(SegError::invalid_input(format!(
                "invalid move between segments {source} and {dest} for {} segments",
                self.centroids.len()
            )));
        }
        Ok(())
    }

    /// Applies a single-sample move to centroids and energies in O(d).
    ///
    /// Centroids use the exact running-mean updates; energies move by the
    /// same terms the acceptance test used.
    pub fn apply_incremental_move(
        &mut self,
        sample: &[f64],
        source: usize,
        dest: usize,
        n: usize,
        m: usize,
        cost: MoveCost,
    ) -> Result<(), SegError> {
        if n < 2 {
            return Err(SegError::empty_cluster(source));
        }
        self.check_move(source, dest)?;

        let dest_weight = 1.0 / (m as f64 + 1.0);
        for (c, &value) in self.centroids[dest].iter_mut().zip(sample) {
            *c += (value - *c) * dest_weight;
        }
        let source_weight = 1.0 / (n as f64 - 1.0);
        for (c, &value) in self.centroids[source].iter_mut().zip(sample) {
            *c -= (value - *c) * source_weight;
        }

        self.local[dest] += cost.insert_cost;
        self.local[source] -= cost.removal_gain;
        self.total += cost.delta();
        Ok(())
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    pub fn local_energies(&self) -> &[f64] {
        &self.local
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}
