//! True-peak detection
//!
//! Each channel is upsampled 4x with a 48-tap Kaiser-windowed sinc
//! (beta 8) split into four 12-tap polyphase branches. Each branch is
//! normalized to unity DC gain. The running maximum also includes the
//! native sample magnitude, so the reported true peak is never below the
//! sample peak.

use automaster_core::{linear_to_db, MAX_CHANNELS};
use std::f64::consts::PI;

/// Oversampling factor
pub const OVERSAMPLING: usize = 4;
/// Taps of the full interpolation filter
pub const FILTER_TAPS: usize = 48;
const TAPS_PER_PHASE: usize = FILTER_TAPS / OVERSAMPLING;
const KAISER_BETA: f64 = 8.0;

type Polyphase = [[f32; TAPS_PER_PHASE]; OVERSAMPLING];

/// Streaming 4x-oversampled peak detector
///
/// # Example
///
/// ```
/// use automaster_loudness::TruePeakDetector;
///
/// let mut detector = TruePeakDetector::new(1);
/// assert_eq!(detector.true_peak_dbtp(), f64::NEG_INFINITY);
///
/// for i in 0..480 {
///     let x = (2.0 * std::f64::consts::PI * i as f64 / 48.0).sin() as f32;
///     detector.detect_peak(&[x]);
/// }
/// assert!(detector.true_peak_dbtp() > -0.01);
/// ```
#[derive(Debug, Clone)]
pub struct TruePeakDetector {
    channels: usize,
    coeffs: Polyphase,
    // Each channel's history is stored twice so the newest TAPS_PER_PHASE
    // samples are always one contiguous slice starting at `pos`.
    history: [[f32; 2 * TAPS_PER_PHASE]; MAX_CHANNELS],
    pos: usize,
    true_peak: [f32; MAX_CHANNELS],
    sample_peak: [f32; MAX_CHANNELS],
}

impl TruePeakDetector {
    /// Create a detector for `channels` channels (capped at `MAX_CHANNELS`)
    pub fn new(channels: usize) -> Self {
        Self {
            channels: channels.clamp(1, MAX_CHANNELS),
            coeffs: design_interpolation_filter(),
            history: [[0.0; 2 * TAPS_PER_PHASE]; MAX_CHANNELS],
            pos: 0,
            true_peak: [0.0; MAX_CHANNELS],
            sample_peak: [0.0; MAX_CHANNELS],
        }
    }

    /// Feed one interleaved frame and return the running true peak (dBTP)
    #[inline]
    pub fn detect_peak(&mut self, frame: &[f32]) -> f64 {
        self.interpolated_peak(frame);
        self.true_peak_dbtp()
    }

    /// Feed one interleaved frame and return the largest magnitude among its
    /// native and interpolated samples, across channels
    ///
    /// Updates the running maxima as a side effect.
    #[inline]
    pub fn interpolated_peak(&mut self, frame: &[f32]) -> f32 {
        self.pos = (self.pos + TAPS_PER_PHASE - 1) % TAPS_PER_PHASE;
        let pos = self.pos;
        let mut frame_peak = 0.0f32;

        for (ch, &sample) in frame.iter().take(self.channels).enumerate() {
            let history = &mut self.history[ch];
            history[pos] = sample;
            history[pos + TAPS_PER_PHASE] = sample;
            let recent = &history[pos..pos + TAPS_PER_PHASE];

            let mut peak = sample.abs();
            self.sample_peak[ch] = self.sample_peak[ch].max(peak);
            for phase in &self.coeffs {
                let y: f32 = phase.iter().zip(recent).map(|(c, x)| c * x).sum();
                peak = peak.max(y.abs());
            }

            self.true_peak[ch] = self.true_peak[ch].max(peak);
            frame_peak = frame_peak.max(peak);
        }

        frame_peak
    }

    /// Feed interleaved samples
    pub fn process(&mut self, samples: &[f32]) {
        for frame in samples.chunks_exact(self.channels) {
            self.interpolated_peak(frame);
        }
    }

    /// Running true peak across channels, linear
    pub fn true_peak_linear(&self) -> f64 {
        f64::from(self.true_peak.iter().fold(0.0f32, |m, &p| m.max(p)))
    }

    /// Running true peak across channels (dBTP), -inf for silence
    pub fn true_peak_dbtp(&self) -> f64 {
        linear_to_db(self.true_peak_linear())
    }

    /// Running true peak of one channel (dBTP)
    pub fn channel_true_peak_dbtp(&self, channel: usize) -> f64 {
        linear_to_db(f64::from(self.true_peak[channel]))
    }

    /// Running sample peak across channels (dBFS), -inf for silence
    pub fn sample_peak_dbfs(&self) -> f64 {
        linear_to_db(f64::from(
            self.sample_peak.iter().fold(0.0f32, |m, &p| m.max(p)),
        ))
    }

    /// Clear the running maxima, keeping the filter history
    pub fn reset_peak(&mut self) {
        self.true_peak = [0.0; MAX_CHANNELS];
        self.sample_peak = [0.0; MAX_CHANNELS];
    }

    /// Clear maxima and filter history
    pub fn reset(&mut self) {
        self.reset_peak();
        self.history = [[0.0; 2 * TAPS_PER_PHASE]; MAX_CHANNELS];
        self.pos = 0;
    }

    /// Group delay of the interpolator in input samples
    pub fn latency_samples(&self) -> usize {
        TAPS_PER_PHASE / 2
    }
}

/// 48-tap windowed sinc (cutoff pi/4 of the upsampled rate), decomposed into
/// four phases that each sum to 1
fn design_interpolation_filter() -> Polyphase {
    let mut coeffs = [[0.0f32; TAPS_PER_PHASE]; OVERSAMPLING];
    let center = (FILTER_TAPS as f64 - 1.0) / 2.0;

    for i in 0..FILTER_TAPS {
        let x = (i as f64 - center) * PI / OVERSAMPLING as f64;
        let sinc = if x.abs() < 1e-12 { 1.0 } else { x.sin() / x };
        coeffs[i % OVERSAMPLING][i / OVERSAMPLING] = (sinc * kaiser(i)) as f32;
    }

    for phase in &mut coeffs {
        let sum: f32 = phase.iter().sum();
        phase.iter_mut().for_each(|c| *c /= sum);
    }

    coeffs
}

fn kaiser(n: usize) -> f64 {
    let x = 2.0 * n as f64 / (FILTER_TAPS as f64 - 1.0) - 1.0;
    bessel_i0(KAISER_BETA * (1.0 - x * x).max(0.0).sqrt()) / bessel_i0(KAISER_BETA)
}

/// Zeroth-order modified Bessel function of the first kind (power series)
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..=25 {
        term *= (half / f64::from(k)) * (half / f64::from(k));
        sum += term;
        if term < 1e-20 * sum {
            break;
        }
    }
    sum
}
