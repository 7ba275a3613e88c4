//! Feed-forward soft-knee compressor for a single band
//!
//! Uses a two-stage design:
//! 1. Peak level detection with instant attack and a fixed 50 ms release,
//!    which holds the level across waveform cycles
//! 2. Gain reduction smoothing with the band's attack/release times, which
//!    controls how fast compression responds
//!
//! Settings are passed into every call so the owner can swap them between
//! blocks; time-constant coefficients are recomputed only when the timing
//! changes.

use crate::settings::DynamicsSettings;
use automaster_core::db_to_linear;

/// Level floor of the peak detector in dB
const NOISE_FLOOR_DB: f64 = -120.0;

/// Level reported for digital silence in dB
const SILENCE_DB: f64 = -200.0;

/// Fixed release of the peak detector in seconds
const PEAK_RELEASE_S: f64 = 0.050;

/// Gain reduction closer to 0 dB than this snaps back to unity once released
const IDLE_EPSILON_DB: f64 = 1e-6;

/// What the compressor is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressorState {
    /// Unity gain, level below the knee
    #[default]
    Idle,
    /// Detected level is above the knee; gain reduction is applied
    Compressing,
    /// Level fell below the knee; gain reduction is recovering toward 0 dB
    Releasing,
}

/// Per-band compressor (linked across channels)
#[derive(Debug, Clone)]
pub struct BandCompressor {
    sample_rate: f64,
    state: CompressorState,

    // Peak level detector (dB)
    peak_level_db: f64,
    // Smoothed gain reduction (dB, always <= 0)
    gain_reduction_db: f64,

    // Coefficient cache
    peak_release_coeff: f64,
    attack_coeff: f64,
    release_coeff: f64,
    makeup_linear: f64,
    cached_timing: (f64, f64, f64),
}

impl BandCompressor {
    /// Create a compressor for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = f64::from(sample_rate.max(1));
        let mut compressor = Self {
            sample_rate,
            state: CompressorState::Idle,
            peak_level_db: NOISE_FLOOR_DB,
            gain_reduction_db: 0.0,
            peak_release_coeff: time_coefficient(PEAK_RELEASE_S, sample_rate),
            attack_coeff: 0.0,
            release_coeff: 0.0,
            makeup_linear: 1.0,
            cached_timing: (f64::NAN, f64::NAN, f64::NAN),
        };
        compressor.update_coefficients(&DynamicsSettings::new());
        compressor
    }

    /// Recompute coefficients if the timing or makeup changed
    #[inline]
    fn update_coefficients(&mut self, settings: &DynamicsSettings) {
        let timing = (settings.attack_s, settings.release_s, settings.makeup_db);
        if timing == self.cached_timing {
            return;
        }
        // coeff = exp(-1 / (time * sample_rate)): 63.2% response at `time`
        self.attack_coeff = time_coefficient(settings.attack_s, self.sample_rate);
        self.release_coeff = time_coefficient(settings.release_s, self.sample_rate);
        self.makeup_linear = if settings.makeup_db == 0.0 {
            1.0
        } else {
            db_to_linear(settings.makeup_db)
        };
        self.cached_timing = timing;
    }

    /// Process one mono sample
    ///
    /// Returns `(processed, gain_reduction_db)`.
    #[inline]
    pub fn process(&mut self, sample: f64, settings: &DynamicsSettings) -> (f64, f64) {
        let gain = self.advance(sample.abs(), settings);
        (sample * gain, self.gain_reduction_db)
    }

    /// Process one frame with linked detection
    ///
    /// The loudest channel drives the detector and the same gain is applied
    /// to every channel, which preserves the stereo image. Returns the gain
    /// reduction in dB.
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f64], settings: &DynamicsSettings) -> f64 {
        let peak = frame.iter().fold(0.0_f64, |max, s| max.max(s.abs()));
        let gain = self.advance(peak, settings);
        if gain != 1.0 {
            for sample in frame.iter_mut() {
                *sample *= gain;
            }
        }
        self.gain_reduction_db
    }

    /// Run detector and smoother for one rectified input level
    ///
    /// Returns the linear gain to apply (including makeup).
    #[inline]
    fn advance(&mut self, rectified: f64, settings: &DynamicsSettings) -> f64 {
        self.update_coefficients(settings);

        let input_db = if rectified > 1e-10 {
            20.0 * rectified.log10()
        } else {
            SILENCE_DB
        };

        self.update_peak_level(input_db);
        let target_gr_db = gain_reduction(settings, self.peak_level_db);
        self.smooth_gain_reduction(target_gr_db);

        if self.gain_reduction_db == 0.0 {
            self.makeup_linear
        } else {
            db_to_linear(self.gain_reduction_db) * self.makeup_linear
        }
    }

    /// Instant attack; release decays toward the noise floor at a fixed rate
    ///
    /// Decaying toward the input would drop to -inf at every zero crossing.
    #[inline]
    fn update_peak_level(&mut self, input_db: f64) {
        if input_db > self.peak_level_db {
            self.peak_level_db = input_db;
        } else {
            self.peak_level_db =
                self.peak_release_coeff * (self.peak_level_db - NOISE_FLOOR_DB) + NOISE_FLOOR_DB;
        }
    }

    /// Smooth gain reduction toward the target
    ///
    /// Attack applies while the target is more negative (more compression),
    /// release while it is less negative.
    #[inline]
    fn smooth_gain_reduction(&mut self, target_gr_db: f64) {
        let coeff = if target_gr_db < self.gain_reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };

        let smoothed = coeff * self.gain_reduction_db + (1.0 - coeff) * target_gr_db;
        self.gain_reduction_db = if target_gr_db == 0.0 && smoothed > -IDLE_EPSILON_DB {
            0.0
        } else {
            smoothed.min(0.0)
        };

        self.state = if target_gr_db < 0.0 {
            CompressorState::Compressing
        } else if self.gain_reduction_db < 0.0 {
            CompressorState::Releasing
        } else {
            CompressorState::Idle
        };
    }

    /// Current state
    pub fn state(&self) -> CompressorState {
        self.state
    }

    /// Current gain reduction in dB (<= 0)
    pub fn gain_reduction_db(&self) -> f64 {
        self.gain_reduction_db
    }

    /// Current detector level in dB
    pub fn level_db(&self) -> f64 {
        self.peak_level_db
    }

    /// Return to unity gain and an empty detector
    pub fn reset(&mut self) {
        self.peak_level_db = NOISE_FLOOR_DB;
        self.gain_reduction_db = 0.0;
        self.state = CompressorState::Idle;
    }
}

/// Static curve: output level in dB for an input level in dB
///
/// Hard knee when `knee_db` is 0, otherwise a quadratic transition across
/// [threshold - knee/2, threshold + knee/2].
#[inline]
pub fn output_level(settings: &DynamicsSettings, input_db: f64) -> f64 {
    let threshold = settings.threshold_db;
    let ratio = settings.ratio;
    let knee = settings.knee_db;

    if knee <= 0.0 {
        if input_db <= threshold {
            input_db
        } else {
            threshold + (input_db - threshold) / ratio
        }
    } else {
        let half_knee = knee / 2.0;
        let knee_start = threshold - half_knee;
        let knee_end = threshold + half_knee;

        if input_db <= knee_start {
            input_db
        } else if input_db >= knee_end {
            threshold + (input_db - threshold) / ratio
        } else {
            let x = input_db - knee_start;
            let slope_change = (1.0 - 1.0 / ratio) / (2.0 * knee);
            input_db - slope_change * x * x
        }
    }
}

/// Static gain reduction in dB (<= 0) for an input level in dB
#[inline]
pub fn gain_reduction(settings: &DynamicsSettings, input_db: f64) -> f64 {
    (output_level(settings, input_db) - input_db).min(0.0)
}

#[inline]
fn time_coefficient(seconds: f64, sample_rate: f64) -> f64 {
    let samples = seconds * sample_rate;
    if samples > 0.0 {
        (-1.0 / samples).exp()
    } else {
        0.0
    }
}
