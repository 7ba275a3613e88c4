//! BS.1770 K-weighting
//!
//! Two cascaded biquads: a high shelf (+4 dB above roughly 1.5 kHz,
//! modelling the acoustic effect of the head) followed by a high pass
//! (RLB weighting). Coefficients are derived for any sample rate with the
//! bilinear transform; at 48 kHz they reproduce the tables published in
//! ITU-R BS.1770.

use automaster_core::{Biquad, BiquadCoefficients, MAX_CHANNELS};
use std::f64::consts::PI;

const SHELF_FREQUENCY: f64 = 1681.974450955533;
const SHELF_GAIN_DB: f64 = 3.999843853973347;
const SHELF_Q: f64 = 0.7071752369554196;
const HIGHPASS_FREQUENCY: f64 = 38.13547087602444;
const HIGHPASS_Q: f64 = 0.5003270373238773;

/// Stage 1 (high shelf) coefficients for `sample_rate`
pub fn shelf_coefficients(sample_rate: f64) -> BiquadCoefficients {
    let k = (PI * SHELF_FREQUENCY / sample_rate).tan();
    let vh = 10.0_f64.powf(SHELF_GAIN_DB / 20.0);
    let vb = vh.powf(0.4996667741545416);
    let a0 = 1.0 + k / SHELF_Q + k * k;

    BiquadCoefficients::from_raw(
        vh + vb * k / SHELF_Q + k * k,
        2.0 * (k * k - vh),
        vh - vb * k / SHELF_Q + k * k,
        a0,
        2.0 * (k * k - 1.0),
        1.0 - k / SHELF_Q + k * k,
    )
}

/// Stage 2 (high pass) coefficients for `sample_rate`
///
/// The numerator is left unnormalized (1, -2, 1) as in the published tables.
pub fn highpass_coefficients(sample_rate: f64) -> BiquadCoefficients {
    let k = (PI * HIGHPASS_FREQUENCY / sample_rate).tan();
    let a0 = 1.0 + k / HIGHPASS_Q + k * k;

    BiquadCoefficients {
        b0: 1.0,
        b1: -2.0,
        b2: 1.0,
        a1: 2.0 * (k * k - 1.0) / a0,
        a2: (1.0 - k / HIGHPASS_Q + k * k) / a0,
    }
}

/// K-weighting filter for one channel
#[derive(Debug, Clone)]
pub struct KWeightingFilter {
    shelf: Biquad,
    highpass: Biquad,
}

impl KWeightingFilter {
    /// Create a filter for `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        let fs = f64::from(sample_rate);
        Self {
            shelf: Biquad::new(shelf_coefficients(fs)),
            highpass: Biquad::new(highpass_coefficients(fs)),
        }
    }

    /// Filter one sample; must be called once per sample, in order
    #[inline]
    pub fn process(&mut self, sample: f64) -> f64 {
        self.highpass.process(self.shelf.process(sample))
    }

    /// Stage coefficients, shelf first
    pub fn coefficients(&self) -> [BiquadCoefficients; 2] {
        [*self.shelf.coefficients(), *self.highpass.coefficients()]
    }

    /// Combined magnitude response at `frequency`, linear
    pub fn magnitude_at(&self, sample_rate: f64, frequency: f64) -> f64 {
        let [shelf, highpass] = self.coefficients();
        shelf.magnitude_at(sample_rate, frequency) * highpass.magnitude_at(sample_rate, frequency)
    }

    /// Clear filter state
    pub fn reset(&mut self) {
        self.shelf.reset();
        self.highpass.reset();
    }
}

/// One K-weighting filter per channel
#[derive(Debug, Clone)]
pub struct KWeightingBank {
    filters: Vec<KWeightingFilter>,
}

impl KWeightingBank {
    /// Create a bank for `channels` channels (capped at `MAX_CHANNELS`)
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            filters: vec![KWeightingFilter::new(sample_rate); channels.min(MAX_CHANNELS)],
        }
    }

    /// Filter one sample of `channel`
    #[inline]
    pub fn process(&mut self, channel: usize, sample: f64) -> f64 {
        self.filters[channel].process(sample)
    }

    /// Filter one interleaved frame into `out`
    #[inline]
    pub fn process_frame(&mut self, frame: &[f32], out: &mut [f64]) {
        for ((filter, &x), y) in self.filters.iter_mut().zip(frame).zip(out.iter_mut()) {
            *y = filter.process(f64::from(x));
        }
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.filters.len()
    }

    /// Clear all filter states
    pub fn reset(&mut self) {
        self.filters.iter_mut().for_each(KWeightingFilter::reset);
    }
}
