//! Per-band dynamics settings

use automaster_core::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Compressor settings for one band
///
/// Times are in seconds, levels in dB. Settings are checked with
/// [`DynamicsSettings::validate`] before they reach a processor; invalid
/// values are rejected rather than clamped into range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsSettings {
    /// Threshold in dBFS (<= 0)
    ///
    /// Levels above this are compressed.
    pub threshold_db: f64,

    /// Ratio (>= 1.0)
    ///
    /// 4.0 means 4:1 compression above the threshold.
    pub ratio: f64,

    /// Attack time in seconds (> 0)
    pub attack_s: f64,

    /// Release time in seconds (> 0)
    pub release_s: f64,

    /// Knee width in dB (0 = hard knee)
    pub knee_db: f64,

    /// Makeup gain in dB (>= 0), applied after gain reduction
    pub makeup_db: f64,
}

impl DynamicsSettings {
    /// Create default settings
    /// - Threshold: -20 dB
    /// - Ratio: 4:1
    /// - Attack: 5 ms
    /// - Release: 50 ms
    /// - Soft knee: 6 dB
    /// - Makeup gain: 0 dB
    pub fn new() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_s: 0.005,
            release_s: 0.050,
            knee_db: 6.0,
            makeup_db: 0.0,
        }
    }

    /// Gentle compression (vocals, acoustic material)
    pub fn gentle() -> Self {
        Self {
            threshold_db: -15.0,
            ratio: 2.5,
            attack_s: 0.010,
            release_s: 0.100,
            knee_db: 8.0,
            makeup_db: 0.0,
        }
    }

    /// Moderate compression (mix bus)
    pub fn moderate() -> Self {
        Self {
            threshold_db: -18.0,
            ratio: 4.0,
            attack_s: 0.005,
            release_s: 0.050,
            knee_db: 6.0,
            makeup_db: 0.0,
        }
    }

    /// Aggressive compression, close to limiting
    pub fn aggressive() -> Self {
        Self {
            threshold_db: -12.0,
            ratio: 10.0,
            attack_s: 0.001,
            release_s: 0.030,
            knee_db: 2.0,
            makeup_db: 0.0,
        }
    }

    /// Settings that never reduce gain (1:1 at 0 dBFS)
    pub fn transparent() -> Self {
        Self {
            threshold_db: 0.0,
            ratio: 1.0,
            attack_s: 0.010,
            release_s: 0.100,
            knee_db: 0.0,
            makeup_db: 0.0,
        }
    }

    /// Copy of these settings with new attack and release times
    ///
    /// Used when applying material recommendations.
    pub fn with_timing(self, attack_s: f64, release_s: f64) -> Self {
        Self {
            attack_s,
            release_s,
            ..self
        }
    }

    /// Check every field against its valid range
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_db.is_finite() || self.threshold_db > 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold_db));
        }
        if !self.ratio.is_finite() || self.ratio < 1.0 {
            return Err(ConfigError::InvalidRatio(self.ratio));
        }
        if !self.attack_s.is_finite() || self.attack_s <= 0.0 {
            return Err(ConfigError::attack(self.attack_s));
        }
        if !self.release_s.is_finite() || self.release_s <= 0.0 {
            return Err(ConfigError::release(self.release_s));
        }
        if !self.knee_db.is_finite() || self.knee_db < 0.0 {
            return Err(ConfigError::InvalidKnee(self.knee_db));
        }
        if !self.makeup_db.is_finite() || self.makeup_db < 0.0 {
            return Err(ConfigError::InvalidMakeup(self.makeup_db));
        }
        Ok(())
    }
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        Self::new()
    }
}
