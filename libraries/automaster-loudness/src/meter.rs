//! BS.1770 loudness aggregation
//!
//! K-weighted, channel-weighted energy is accumulated in 100 ms hops. Every
//! completed hop closes a 400 ms gating block made of the last four hops
//! (75% overlap). Momentary loudness is the latest block, short-term loudness
//! averages the last 30 hops (3 s), and integrated loudness applies the
//! two-stage gate over every block since the last reset.

use crate::error::{LoudnessError, Result};
use crate::histogram::LoudnessHistogram;
use crate::kweighting::KWeightingBank;
use crate::{energy_to_lufs, LRA_RELATIVE_GATE_LU, LUFS_FLOOR, RELATIVE_GATE_LU};
use automaster_core::{validate_stream, ConfigError, EnergyHistory, SampleWindow, MAX_CHANNELS};

const HOP_SECONDS: f64 = 0.1;
const MOMENTARY_HOPS: usize = 4;
const SHORT_TERM_HOPS: usize = 30;
const SURROUND_WEIGHT: f64 = 1.41;

/// Per-channel BS.1770 weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelWeights {
    weights: [f64; MAX_CHANNELS],
    channels: usize,
}

impl ChannelWeights {
    /// Default weights for a channel count
    ///
    /// Six channels are treated as 5.1 in L, R, C, LFE, Ls, Rs order (LFE
    /// excluded, surrounds weighted 1.41). Every other layout weights all
    /// channels 1.0.
    pub fn for_channels(channels: usize) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        let mut weights = [1.0; MAX_CHANNELS];
        if channels == 6 {
            weights[3] = 0.0;
            weights[4] = SURROUND_WEIGHT;
            weights[5] = SURROUND_WEIGHT;
        }
        Self { weights, channels }
    }

    /// Explicit weights, one per channel
    pub fn custom(values: &[f64]) -> std::result::Result<Self, ConfigError> {
        if values.is_empty() || values.len() > MAX_CHANNELS {
            return Err(ConfigError::InvalidChannelCount(values.len()));
        }
        let mut weights = [0.0; MAX_CHANNELS];
        weights[..values.len()].copy_from_slice(values);
        Ok(Self {
            weights,
            channels: values.len(),
        })
    }

    /// Weight of `channel`
    #[inline]
    pub fn weight(&self, channel: usize) -> f64 {
        self.weights[channel]
    }

    /// Weights of the active channels
    pub fn as_slice(&self) -> &[f64] {
        &self.weights[..self.channels]
    }
}

/// A completed 400 ms gating block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatingBlock {
    /// Sequence number since the last reset
    pub index: u64,
    /// Channel-weighted mean square over the block
    pub energy: f64,
    /// Block loudness (LUFS)
    pub loudness_lufs: f64,
}

/// Streaming BS.1770 loudness meter
///
/// All storage is allocated in `new`; `process_frame`, `accumulate` and the
/// loudness queries never allocate, so the meter can run on an audio thread.
///
/// # Example
///
/// ```
/// use automaster_loudness::{LoudnessMeter, LUFS_FLOOR};
///
/// let mut meter = LoudnessMeter::new(48_000, 2)?;
/// assert_eq!(meter.integrated_lufs(), LUFS_FLOOR);
///
/// meter.add_frames(&vec![0.0; 48_000 * 2])?;
/// assert_eq!(meter.integrated_lufs(), LUFS_FLOOR);
/// # Ok::<(), automaster_loudness::LoudnessError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    sample_rate: u32,
    channels: usize,
    weights: ChannelWeights,
    kweighting: KWeightingBank,
    hop: SampleWindow,
    hops: EnergyHistory,
    blocks: LoudnessHistogram,
    short_term_values: LoudnessHistogram,
    momentary_lufs: f64,
    short_term_lufs: f64,
    max_momentary_lufs: f64,
    max_short_term_lufs: f64,
    block_count: u64,
    frames: u64,
}

impl LoudnessMeter {
    /// Create a meter
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz (8000-384000)
    /// * `channels` - Number of channels (1-8)
    pub fn new(sample_rate: u32, channels: usize) -> std::result::Result<Self, ConfigError> {
        validate_stream(sample_rate, channels)?;

        Ok(Self {
            sample_rate,
            channels,
            weights: ChannelWeights::for_channels(channels),
            kweighting: KWeightingBank::new(sample_rate, channels),
            hop: SampleWindow::from_duration(sample_rate, HOP_SECONDS),
            hops: EnergyHistory::new(SHORT_TERM_HOPS),
            blocks: LoudnessHistogram::new(),
            short_term_values: LoudnessHistogram::new(),
            momentary_lufs: LUFS_FLOOR,
            short_term_lufs: LUFS_FLOOR,
            max_momentary_lufs: LUFS_FLOOR,
            max_short_term_lufs: LUFS_FLOOR,
            block_count: 0,
            frames: 0,
        })
    }

    /// K-weight and accumulate one interleaved frame
    ///
    /// `frame` must hold exactly one sample per channel.
    #[inline]
    pub fn process_frame(&mut self, frame: &[f32]) -> Option<GatingBlock> {
        let mut weighted = [0.0; MAX_CHANNELS];
        self.kweighting
            .process_frame(frame, &mut weighted[..self.channels]);
        self.accumulate(&weighted[..self.channels])
    }

    /// Accumulate one frame of already K-weighted samples
    ///
    /// Returns the gating block closed by this frame, if any.
    #[inline]
    pub fn accumulate(&mut self, weighted: &[f64]) -> Option<GatingBlock> {
        let energy: f64 = weighted
            .iter()
            .enumerate()
            .map(|(ch, y)| self.weights.weight(ch) * y * y)
            .sum();
        self.frames += 1;

        let hop_energy = self.hop.push_energy(energy)?;
        self.hops.push(hop_energy);
        self.close_hop()
    }

    fn close_hop(&mut self) -> Option<GatingBlock> {
        if let Some(short_term) = self.hops.mean_of_last(SHORT_TERM_HOPS) {
            let lufs = energy_to_lufs(short_term);
            self.short_term_lufs = lufs;
            self.max_short_term_lufs = self.max_short_term_lufs.max(lufs);
            self.short_term_values.add(short_term, lufs);
        }

        let energy = self.hops.mean_of_last(MOMENTARY_HOPS)?;
        let loudness_lufs = energy_to_lufs(energy);
        self.momentary_lufs = loudness_lufs;
        self.max_momentary_lufs = self.max_momentary_lufs.max(loudness_lufs);
        self.blocks.add(energy, loudness_lufs);

        let block = GatingBlock {
            index: self.block_count,
            energy,
            loudness_lufs,
        };
        self.block_count += 1;
        Some(block)
    }

    /// Accumulate interleaved samples
    pub fn add_frames(&mut self, samples: &[f32]) -> Result<()> {
        if samples.len() % self.channels != 0 {
            return Err(LoudnessError::IncompleteFrame {
                samples: samples.len(),
                channels: self.channels,
            });
        }
        for frame in samples.chunks_exact(self.channels) {
            self.process_frame(frame);
        }
        Ok(())
    }

    /// Loudness of the last completed 400 ms block
    pub fn momentary_lufs(&self) -> f64 {
        self.momentary_lufs
    }

    /// Loudness of the last 3 s
    ///
    /// Reports the floor until three seconds have been measured.
    pub fn short_term_lufs(&self) -> f64 {
        self.short_term_lufs
    }

    /// Gated integrated loudness over every block since the last reset
    pub fn integrated_lufs(&self) -> f64 {
        self.blocks
            .gated_loudness(RELATIVE_GATE_LU)
            .map_or(LUFS_FLOOR, |(_, lufs)| lufs)
    }

    /// Loudness range (LU) per EBU Tech 3342
    ///
    /// Spread between the 10th and 95th percentiles of the gated short-term
    /// loudness distribution; 0 until enough material has been measured.
    pub fn loudness_range_lu(&self) -> f64 {
        let Some((threshold, _)) = self.short_term_values.gated_loudness(LRA_RELATIVE_GATE_LU)
        else {
            return 0.0;
        };
        let low = self.short_term_values.percentile_from(threshold, 0.10);
        let high = self.short_term_values.percentile_from(threshold, 0.95);
        (high - low).max(0.0)
    }

    /// Highest momentary loudness seen
    pub fn max_momentary_lufs(&self) -> f64 {
        self.max_momentary_lufs
    }

    /// Highest short-term loudness seen
    pub fn max_short_term_lufs(&self) -> f64 {
        self.max_short_term_lufs
    }

    /// Number of gating blocks closed since the last reset
    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Number of gating blocks above the absolute gate
    pub fn gated_block_count(&self) -> u64 {
        self.blocks.len()
    }

    /// Frames accumulated since the last reset
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Clear all blocks, windows and filter states
    pub fn reset(&mut self) {
        self.kweighting.reset();
        self.hop.reset();
        self.hops.reset();
        self.blocks.reset();
        self.short_term_values.reset();
        self.momentary_lufs = LUFS_FLOOR;
        self.short_term_lufs = LUFS_FLOOR;
        self.max_momentary_lufs = LUFS_FLOOR;
        self.max_short_term_lufs = LUFS_FLOOR;
        self.block_count = 0;
        self.frames = 0;
    }
}
