//! Linkwitz-Riley band splitter
//!
//! Splits each channel into N bands using 4th-order Linkwitz-Riley
//! (LR24) crossovers. An LR24 crossover is two cascaded 2nd-order Butterworth
//! sections for the low pass and two for the high pass; the low and high
//! outputs of one crossover sum to a 2nd-order all-pass.
//!
//! ## Topology
//!
//! Crossovers are applied as a chain. For crossovers at f0 < f1 < ... :
//!
//! 1. Split input at f0 -> low0, high0
//! 2. Split high0 at f1 -> low1, high1
//! 3. ... the last band is the remaining high output
//!
//! Band k has only been through crossovers 0..=k, so it is passed through the
//! all-pass equivalent of every higher crossover (k+1..). Every band then
//! carries the same phase rotation and the band sum is a pure all-pass: flat
//! magnitude, frequency-dependent phase.

use automaster_core::biquad::BUTTERWORTH_Q;
use automaster_core::{Biquad, BiquadCoefficients, ConfigError, Result, SampleRate};

use crate::MAX_BANDS;

/// Minimum number of bands
pub const MIN_BANDS: usize = 2;

/// Lowest accepted crossover frequency in Hz
pub const MIN_CROSSOVER_HZ: f64 = 20.0;

/// One LR24 crossover point for one channel
#[derive(Debug, Clone)]
struct CrossoverPoint {
    lp: [Biquad; 2],
    hp: [Biquad; 2],
}

impl CrossoverPoint {
    fn new(sample_rate: f64, frequency: f64) -> Self {
        let lp = BiquadCoefficients::lowpass(sample_rate, frequency, BUTTERWORTH_Q);
        let hp = BiquadCoefficients::highpass(sample_rate, frequency, BUTTERWORTH_Q);
        Self {
            lp: [Biquad::new(lp), Biquad::new(lp)],
            hp: [Biquad::new(hp), Biquad::new(hp)],
        }
    }

    /// Split into (low, high)
    #[inline]
    fn process(&mut self, input: f64) -> (f64, f64) {
        let stage = self.lp[0].process(input);
        let low = self.lp[1].process(stage);
        let stage = self.hp[0].process(input);
        let high = self.hp[1].process(stage);
        (low, high)
    }

    fn reset(&mut self) {
        for filter in self.lp.iter_mut().chain(self.hp.iter_mut()) {
            filter.reset();
        }
    }
}

/// Filter state for one channel
#[derive(Debug, Clone)]
struct ChannelSplitter {
    points: Vec<CrossoverPoint>,
    /// Phase compensation per band (all-passes of the higher crossovers)
    compensation: Vec<Vec<Biquad>>,
}

impl ChannelSplitter {
    fn new(sample_rate: f64, crossovers: &[f64]) -> Self {
        let points = crossovers
            .iter()
            .map(|&f| CrossoverPoint::new(sample_rate, f))
            .collect();

        let band_count = crossovers.len() + 1;
        let compensation = (0..band_count)
            .map(|band| {
                crossovers
                    .iter()
                    .skip(band + 1)
                    .map(|&f| Biquad::new(BiquadCoefficients::allpass(sample_rate, f, BUTTERWORTH_Q)))
                    .collect()
            })
            .collect();

        Self {
            points,
            compensation,
        }
    }

    #[inline]
    fn split(&mut self, input: f64, bands: &mut [f64]) {
        let last = self.points.len();
        let mut current = input;

        for (i, point) in self.points.iter_mut().enumerate() {
            let (low, high) = point.process(current);
            bands[i] = low;
            current = high;
        }
        bands[last] = current;

        for (band, allpasses) in bands.iter_mut().zip(self.compensation.iter_mut()) {
            for allpass in allpasses.iter_mut() {
                *band = allpass.process(*band);
            }
        }
    }

    fn reset(&mut self) {
        for point in &mut self.points {
            point.reset();
        }
        for filter in self.compensation.iter_mut().flatten() {
            filter.reset();
        }
    }
}

/// Multichannel Linkwitz-Riley band splitter
///
/// Crossover frequencies are fixed at construction. To move a crossover,
/// build a new splitter with [`BandSplitter::rebuild`] and swap it in.
///
/// # Example
///
/// ```rust
/// use automaster_dynamics::BandSplitter;
///
/// let mut splitter = BandSplitter::new(48_000, 2, &[200.0, 2_000.0]).unwrap();
/// assert_eq!(splitter.band_count(), 3);
///
/// let mut bands = [0.0; 3];
/// splitter.split(0, 0.5, &mut bands);
/// ```
#[derive(Debug, Clone)]
pub struct BandSplitter {
    sample_rate: u32,
    crossovers: Vec<f64>,
    channels: Vec<ChannelSplitter>,
}

impl BandSplitter {
    /// Build a splitter for `crossovers.len() + 1` bands
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `channels` - Number of channels (1..=8)
    /// * `crossovers` - Strictly ascending crossover frequencies in Hz, each
    ///   within [20 Hz, Nyquist)
    pub fn new(sample_rate: u32, channels: usize, crossovers: &[f64]) -> Result<Self> {
        automaster_core::validate_stream(sample_rate, channels)?;
        validate_crossovers(sample_rate, crossovers)?;

        let fs = f64::from(sample_rate);
        tracing::debug!(
            sample_rate,
            channels,
            bands = crossovers.len() + 1,
            "Building band splitter"
        );

        Ok(Self {
            sample_rate,
            crossovers: crossovers.to_vec(),
            channels: (0..channels)
                .map(|_| ChannelSplitter::new(fs, crossovers))
                .collect(),
        })
    }

    /// Build a new splitter with the same sample rate and channel count
    pub fn rebuild(&self, crossovers: &[f64]) -> Result<Self> {
        Self::new(self.sample_rate, self.channels.len(), crossovers)
    }

    /// Split one sample of `channel` into `bands`
    ///
    /// `bands` must hold at least [`band_count`](Self::band_count) values; the
    /// filters of `channel` advance by one sample. Out-of-range channels
    /// leave `bands` untouched.
    #[inline]
    pub fn split(&mut self, channel: usize, input: f64, bands: &mut [f64]) {
        let band_count = self.band_count();
        if bands.len() < band_count {
            return;
        }
        if let Some(state) = self.channels.get_mut(channel) {
            state.split(input, &mut bands[..band_count]);
        }
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.crossovers.len() + 1
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Crossover frequencies in Hz
    pub fn crossovers(&self) -> &[f64] {
        &self.crossovers
    }

    /// Frequency range [low, high) of one band
    pub fn band_range(&self, band: usize) -> Option<(f64, f64)> {
        if band >= self.band_count() {
            return None;
        }
        let low = if band == 0 { 0.0 } else { self.crossovers[band - 1] };
        let high = self
            .crossovers
            .get(band)
            .copied()
            .unwrap_or_else(|| SampleRate(self.sample_rate).nyquist());
        Some((low, high))
    }

    /// Frequency ranges [low, high) of every band
    pub fn band_ranges(&self) -> Vec<(f64, f64)> {
        (0..self.band_count())
            .filter_map(|band| self.band_range(band))
            .collect()
    }

    /// Clear all filter states
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }
}

/// Check a crossover list for the given sample rate
pub fn validate_crossovers(sample_rate: u32, crossovers: &[f64]) -> Result<()> {
    let count = crossovers.len() + 1;
    if !(MIN_BANDS..=MAX_BANDS).contains(&count) {
        return Err(ConfigError::InvalidBandCount {
            count,
            min: MIN_BANDS,
            max: MAX_BANDS,
        });
    }

    let nyquist = SampleRate(sample_rate).nyquist();
    for &frequency in crossovers {
        if !frequency.is_finite() || frequency < MIN_CROSSOVER_HZ || frequency >= nyquist {
            return Err(ConfigError::CrossoverOutOfRange { frequency, nyquist });
        }
    }

    for pair in crossovers.windows(2) {
        if pair[1] <= pair[0] {
            return Err(ConfigError::CrossoversNotAscending {
                previous: pair[0],
                next: pair[1],
            });
        }
    }

    Ok(())
}
