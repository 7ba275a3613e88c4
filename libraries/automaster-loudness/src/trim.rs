//! Target-loudness trim
//!
//! Computes the gain that moves the measured integrated loudness onto the
//! target and applies it with per-sample smoothing, so trim changes between
//! metering updates never produce steps.

use crate::MAX_TRIM_DB;
use automaster_core::{db_to_linear, ConfigError};

const SMOOTHING_SECONDS: f64 = 0.2;

/// Loudness trim toward a target
///
/// # Example
///
/// ```
/// use automaster_loudness::TargetTrim;
///
/// let mut trim = TargetTrim::new(48_000, -14.0)?;
/// trim.update(-20.0);
/// assert!((trim.target_gain_db() - 6.0).abs() < 1e-9);
/// # Ok::<(), automaster_core::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TargetTrim {
    target_lufs: f64,
    /// Fixed loudness from a prior analysis pass; replaces the live value
    reference_lufs: Option<f64>,
    target_gain_db: f64,
    target_linear: f64,
    current_linear: f64,
    smoothing: f64,
}

impl TargetTrim {
    /// Create a trim stage toward `target_lufs`
    pub fn new(sample_rate: u32, target_lufs: f64) -> Result<Self, ConfigError> {
        validate_target(target_lufs)?;
        Ok(Self {
            target_lufs,
            reference_lufs: None,
            target_gain_db: 0.0,
            target_linear: 1.0,
            current_linear: 1.0,
            smoothing: 1.0 - (-1.0 / (SMOOTHING_SECONDS * f64::from(sample_rate))).exp(),
        })
    }

    /// Change the target loudness
    pub fn set_target(&mut self, target_lufs: f64) -> Result<(), ConfigError> {
        validate_target(target_lufs)?;
        self.target_lufs = target_lufs;
        Ok(())
    }

    /// Target loudness in LUFS
    pub fn target_lufs(&self) -> f64 {
        self.target_lufs
    }

    /// Use a fixed measured loudness instead of the live integrated value
    pub fn set_reference(&mut self, reference_lufs: Option<f64>) {
        self.reference_lufs = reference_lufs.filter(|l| l.is_finite());
    }

    /// Fixed reference loudness, if any
    pub fn reference_lufs(&self) -> Option<f64> {
        self.reference_lufs
    }

    /// Gain (dB) that maps `measured_lufs` onto the target
    ///
    /// Clamped to +-20 dB; 0 dB while the measurement is at the floor.
    pub fn gain_for(&self, measured_lufs: f64) -> f64 {
        let measured = self.reference_lufs.unwrap_or(measured_lufs);
        if measured.is_finite() {
            (self.target_lufs - measured).clamp(-MAX_TRIM_DB, MAX_TRIM_DB)
        } else {
            0.0
        }
    }

    /// Recompute the target gain from the latest integrated loudness
    pub fn update(&mut self, integrated_lufs: f64) {
        let gain_db = self.gain_for(integrated_lufs);
        if (gain_db - self.target_gain_db).abs() > 1e-9 {
            self.target_gain_db = gain_db;
            self.target_linear = db_to_linear(gain_db);
        }
    }

    /// Advance one sample and return the smoothed linear gain
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        self.current_linear += (self.target_linear - self.current_linear) * self.smoothing;
        self.current_linear as f32
    }

    /// Gain the trim is moving toward (dB)
    pub fn target_gain_db(&self) -> f64 {
        self.target_gain_db
    }

    /// Gain currently applied (dB)
    pub fn current_gain_db(&self) -> f64 {
        20.0 * self.current_linear.log10()
    }

    /// Drop the smoothing state and return to unity gain
    pub fn reset(&mut self) {
        self.target_gain_db = 0.0;
        self.target_linear = 1.0;
        self.current_linear = 1.0;
    }
}

/// Check a target loudness (finite, between -70 and 0 LUFS exclusive)
pub fn validate_target(target_lufs: f64) -> Result<(), ConfigError> {
    if target_lufs.is_finite() && target_lufs < 0.0 && target_lufs >= -70.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTarget(target_lufs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LUFS_FLOOR;

    #[test]
    fn boost_toward_target() {
        let trim = TargetTrim::new(48_000, -14.0).unwrap();
        assert!((trim.gain_for(-20.0) - 6.0).abs() < 1e-12);
        assert!((trim.gain_for(-8.0) - -6.0).abs() < 1e-12);
    }

    #[test]
    fn trim_is_clamped() {
        let trim = TargetTrim::new(48_000, -14.0).unwrap();
        assert_eq!(trim.gain_for(-60.0), MAX_TRIM_DB);
        assert_eq!(trim.gain_for(20.0), -MAX_TRIM_DB);
    }

    #[test]
    fn floor_means_no_trim() {
        let mut trim = TargetTrim::new(48_000, -14.0).unwrap();
        trim.update(LUFS_FLOOR);
        assert_eq!(trim.target_gain_db(), 0.0);
        assert_eq!(trim.next_gain(), 1.0);
    }

    #[test]
    fn reference_overrides_live_measurement() {
        let mut trim = TargetTrim::new(48_000, -14.0).unwrap();
        trim.set_reference(Some(-18.0));
        trim.update(-30.0);
        assert!((trim.target_gain_db() - 4.0).abs() < 1e-12);

        trim.set_reference(Some(f64::NEG_INFINITY));
        assert_eq!(trim.reference_lufs(), None);
    }

    #[test]
    fn gain_is_smoothed() {
        let mut trim = TargetTrim::new(48_000, -14.0).unwrap();
        trim.update(-20.0);

        let first = trim.next_gain();
        assert!(first > 1.0 && first < 1.01);

        for _ in 0..48_000 * 2 {
            trim.next_gain();
        }
        assert!((trim.current_gain_db() - 6.0).abs() < 0.01);
    }

    #[test]
    fn invalid_targets_are_rejected() {
        assert!(TargetTrim::new(48_000, 0.0).is_err());
        assert!(TargetTrim::new(48_000, f64::NAN).is_err());
        let mut trim = TargetTrim::new(48_000, -14.0).unwrap();
        assert_eq!(trim.set_target(3.0), Err(ConfigError::InvalidTarget(3.0)));
        assert_eq!(trim.target_lufs(), -14.0);
    }
}
