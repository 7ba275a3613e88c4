//! Fixed-resolution loudness histogram
//!
//! Completed blocks are folded into 0.1 LU bins between the absolute gate
//! and +20 LUFS. Each bin keeps its block count and the exact sum of the
//! blocks' energies, so gated means are exact except for the bin that
//! straddles a relative threshold. Memory is fixed at construction and
//! nothing allocates while measuring.

use crate::{energy_to_lufs, ABSOLUTE_GATE_LUFS, LUFS_FLOOR};

const BIN_WIDTH_LU: f64 = 0.1;
const MAX_LUFS: f64 = 20.0;
const BINS: usize = ((MAX_LUFS - ABSOLUTE_GATE_LUFS) / BIN_WIDTH_LU) as usize;

#[derive(Debug, Clone)]
pub(crate) struct LoudnessHistogram {
    counts: Box<[u64]>,
    energies: Box<[f64]>,
    total: u64,
}

impl LoudnessHistogram {
    pub(crate) fn new() -> Self {
        Self {
            counts: vec![0; BINS].into_boxed_slice(),
            energies: vec![0.0; BINS].into_boxed_slice(),
            total: 0,
        }
    }

    fn bin_of(lufs: f64) -> usize {
        (((lufs - ABSOLUTE_GATE_LUFS) / BIN_WIDTH_LU).floor().max(0.0) as usize).min(BINS - 1)
    }

    fn bin_center(bin: usize) -> f64 {
        ABSOLUTE_GATE_LUFS + (bin as f64 + 0.5) * BIN_WIDTH_LU
    }

    /// Record a block; blocks below the absolute gate are dropped
    pub(crate) fn add(&mut self, energy: f64, lufs: f64) {
        if lufs.is_nan() || lufs <= ABSOLUTE_GATE_LUFS {
            return;
        }
        let bin = Self::bin_of(lufs);
        self.counts[bin] += 1;
        self.energies[bin] += energy;
        self.total += 1;
    }

    /// Number of blocks above the absolute gate
    pub(crate) fn len(&self) -> u64 {
        self.total
    }

    /// Mean energy of the blocks at or above `threshold_lufs`
    pub(crate) fn mean_energy_from(&self, threshold_lufs: f64) -> Option<f64> {
        let start = Self::bin_of(threshold_lufs);
        let (count, energy) = self.counts[start..]
            .iter()
            .zip(&self.energies[start..])
            .fold((0u64, 0.0f64), |(n, e), (&c, &x)| (n + c, e + x));
        (count > 0).then(|| energy / count as f64)
    }

    /// Two-stage gated loudness: absolute gate, then `relative_gate_lu` below
    /// the absolute-gated mean
    ///
    /// Returns the gate threshold and the loudness of the blocks that pass it.
    pub(crate) fn gated_loudness(&self, relative_gate_lu: f64) -> Option<(f64, f64)> {
        let ungated = self.mean_energy_from(ABSOLUTE_GATE_LUFS)?;
        let threshold = energy_to_lufs(ungated) + relative_gate_lu;
        let gated = self.mean_energy_from(threshold).unwrap_or(ungated);
        Some((threshold, energy_to_lufs(gated)))
    }

    /// Loudness at the `p`-th fraction (0..=1) of blocks at or above `threshold_lufs`
    pub(crate) fn percentile_from(&self, threshold_lufs: f64, p: f64) -> f64 {
        let start = Self::bin_of(threshold_lufs);
        let count: u64 = self.counts[start..].iter().sum();
        if count == 0 {
            return LUFS_FLOOR;
        }
        let rank = ((count - 1) as f64 * p.clamp(0.0, 1.0)).round() as u64;
        let mut seen = 0;
        for (offset, &c) in self.counts[start..].iter().enumerate() {
            seen += c;
            if seen > rank {
                return Self::bin_center(start + offset);
            }
        }
        Self::bin_center(BINS - 1)
    }

    pub(crate) fn reset(&mut self) {
        self.counts.fill(0);
        self.energies.fill(0.0);
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lufs_to_energy;

    fn add_lufs(hist: &mut LoudnessHistogram, lufs: f64, times: usize) {
        for _ in 0..times {
            hist.add(lufs_to_energy(lufs), lufs);
        }
    }

    #[test]
    fn blocks_below_absolute_gate_are_dropped() {
        let mut hist = LoudnessHistogram::new();
        add_lufs(&mut hist, -80.0, 10);
        hist.add(0.0, LUFS_FLOOR);
        assert_eq!(hist.len(), 0);
        assert!(hist.gated_loudness(-10.0).is_none());
    }

    #[test]
    fn block_exactly_at_absolute_gate_is_dropped() {
        let mut hist = LoudnessHistogram::new();
        add_lufs(&mut hist, ABSOLUTE_GATE_LUFS, 10);
        assert_eq!(hist.len(), 0);

        add_lufs(&mut hist, ABSOLUTE_GATE_LUFS + 0.01, 1);
        assert_eq!(hist.len(), 1);
    }

    #[test]
    fn gated_mean_is_exact_for_a_single_level() {
        let mut hist = LoudnessHistogram::new();
        add_lufs(&mut hist, -23.04, 50);
        let (_, lufs) = hist.gated_loudness(-10.0).unwrap();
        assert!((lufs - -23.04).abs() < 1e-9);
    }

    #[test]
    fn relative_gate_excludes_quiet_blocks() {
        let mut hist = LoudnessHistogram::new();
        add_lufs(&mut hist, -20.0, 100);
        add_lufs(&mut hist, -45.0, 100);
        let (threshold, lufs) = hist.gated_loudness(-10.0).unwrap();
        // Ungated mean is about -23 LUFS, so the gate sits near -33 LUFS
        assert!((threshold - -33.0).abs() < 0.1);
        assert!((lufs - -20.0).abs() < 1e-9);
    }

    #[test]
    fn percentiles_walk_the_bins() {
        let mut hist = LoudnessHistogram::new();
        for i in 0..100 {
            let lufs = -30.0 + f64::from(i) * 0.1;
            hist.add(lufs_to_energy(lufs), lufs);
        }
        let p10 = hist.percentile_from(ABSOLUTE_GATE_LUFS, 0.10);
        let p95 = hist.percentile_from(ABSOLUTE_GATE_LUFS, 0.95);
        assert!((p10 - -29.0).abs() < 0.2, "p10 = {p10}");
        assert!((p95 - -20.6).abs() < 0.2, "p95 = {p95}");
    }
}
