//! True-peak limiter
//!
//! Keeps the output under a dBTP ceiling. Detection runs on the 4x
//! interpolated signal so inter-sample peaks are caught, and the audio is
//! delayed by a short lookahead so the gain is already down when a peak
//! leaves the delay line. Attack is instant, followed by a hold and a
//! smooth release. Release is capped by the smallest target gain still
//! inside the lookahead window, so a detected peak can never leave the delay
//! line above the ceiling.

use crate::true_peak::TruePeakDetector;
use crate::DEFAULT_CEILING_DBTP;
use automaster_core::{db_to_linear, linear_to_db, ConfigError};

const LOOKAHEAD_SECONDS: f32 = 0.0015;
const HOLD_SECONDS: f32 = 0.01;
const DEFAULT_RELEASE_MS: f32 = 100.0;
/// Distance from unity at which the release finishes
const RELEASE_SNAP: f64 = 1e-4;

/// Check a limiter ceiling (finite, between -20 and 0 dBTP)
pub fn validate_ceiling(ceiling_dbtp: f64) -> Result<(), ConfigError> {
    if ceiling_dbtp.is_finite() && (-20.0..=0.0).contains(&ceiling_dbtp) {
        Ok(())
    } else {
        Err(ConfigError::InvalidCeiling(ceiling_dbtp))
    }
}

/// Lookahead true-peak limiter
///
/// # Example
///
/// ```
/// use automaster_loudness::TruePeakLimiter;
///
/// let mut limiter = TruePeakLimiter::new(48_000, 2);
/// limiter.set_ceiling_dbtp(-1.0)?;
///
/// let mut samples = vec![0.99_f32; 960];
/// limiter.process(&mut samples);
/// assert!(limiter.gain_reduction_db() < -0.9);
/// # Ok::<(), automaster_core::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TruePeakLimiter {
    /// Ceiling in linear (1.0 = 0 dBTP)
    ceiling: f32,
    ceiling_dbtp: f64,
    /// Release time in samples
    release_samples: usize,
    /// Current gain (linear, 0.0-1.0)
    gain: f64,
    /// Lookahead delay lines (per channel)
    lookahead_buffers: Vec<Vec<f32>>,
    lookahead_size: usize,
    write_pos: usize,
    /// Target gains of the frames still in the delay line (plus the current one)
    target_gains: Vec<f32>,
    target_pos: usize,
    channels: usize,
    sample_rate: u32,
    /// Hold samples remaining
    hold: usize,
    hold_time: usize,
    detector: TruePeakDetector,
}

impl TruePeakLimiter {
    /// Create a limiter with a -1 dBTP ceiling, 1.5 ms lookahead, 10 ms
    /// hold and 100 ms release
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        let fs = sample_rate as f32;
        let lookahead_size = ((fs * LOOKAHEAD_SECONDS).ceil() as usize).max(1);
        let channels = channels.max(1);

        Self {
            ceiling: db_to_linear(DEFAULT_CEILING_DBTP) as f32,
            ceiling_dbtp: DEFAULT_CEILING_DBTP,
            release_samples: ((fs * DEFAULT_RELEASE_MS / 1000.0) as usize).max(1),
            gain: 1.0,
            lookahead_buffers: vec![vec![0.0; lookahead_size]; channels],
            lookahead_size,
            write_pos: 0,
            target_gains: vec![1.0; lookahead_size + 1],
            target_pos: 0,
            channels,
            sample_rate,
            hold: 0,
            hold_time: (fs * HOLD_SECONDS) as usize,
            detector: TruePeakDetector::new(channels),
        }
    }

    /// Set the ceiling in dBTP
    pub fn set_ceiling_dbtp(&mut self, ceiling_dbtp: f64) -> Result<(), ConfigError> {
        validate_ceiling(ceiling_dbtp)?;
        self.ceiling_dbtp = ceiling_dbtp;
        self.ceiling = db_to_linear(ceiling_dbtp) as f32;
        Ok(())
    }

    /// Ceiling in dBTP
    pub fn ceiling_dbtp(&self) -> f64 {
        self.ceiling_dbtp
    }

    /// Current gain reduction in dB (<= 0)
    pub fn gain_reduction_db(&self) -> f64 {
        linear_to_db(self.gain)
    }

    /// Process interleaved audio in place
    pub fn process(&mut self, samples: &mut [f32]) {
        for frame in samples.chunks_exact_mut(self.channels) {
            self.process_frame(frame);
        }
    }

    /// Process a single frame (one sample per channel) in place
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f32]) {
        let frame_peak = self.detector.interpolated_peak(frame);

        let target_gain = if frame_peak > self.ceiling {
            self.ceiling / frame_peak
        } else {
            1.0
        };

        self.target_gains[self.target_pos] = target_gain;
        self.target_pos = (self.target_pos + 1) % self.target_gains.len();

        if f64::from(target_gain) < self.gain {
            // Attack: immediate (the lookahead delay hides it)
            self.gain = f64::from(target_gain);
            self.hold = self.hold_time;
        } else if self.hold > 0 {
            self.hold -= 1;
        } else if self.gain < 1.0 {
            let release = (1.0 - self.gain) / self.release_samples as f64;
            let cap = f64::from(self.window_min_gain());
            self.gain = (self.gain + release).min(cap);
            if cap >= 1.0 && 1.0 - self.gain < RELEASE_SNAP {
                self.gain = 1.0;
            }
        }

        let gain = self.gain as f32;
        for (buffer, sample) in self.lookahead_buffers.iter_mut().zip(frame.iter_mut()) {
            let delayed = buffer[self.write_pos];
            buffer[self.write_pos] = *sample;
            *sample = delayed * gain;
        }

        self.write_pos = (self.write_pos + 1) % self.lookahead_size;
    }

    #[inline]
    fn window_min_gain(&self) -> f32 {
        self.target_gains.iter().fold(1.0f32, |m, &g| m.min(g))
    }

    /// Reset the limiter state
    pub fn reset(&mut self) {
        self.gain = 1.0;
        self.hold = 0;
        self.write_pos = 0;
        self.target_gains.fill(1.0);
        self.target_pos = 0;
        for buffer in &mut self.lookahead_buffers {
            buffer.fill(0.0);
        }
        self.detector.reset();
    }

    /// Latency in samples introduced by the lookahead
    pub fn latency_samples(&self) -> usize {
        self.lookahead_size
    }

    /// Latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        self.lookahead_size as f32 / self.sample_rate as f32 * 1000.0
    }
}
