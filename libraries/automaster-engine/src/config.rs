//! Mastering configuration

use automaster_core::ConfigError;
use automaster_dynamics::{validate_crossovers, DynamicsSettings};
use automaster_loudness::{validate_ceiling, validate_target, DEFAULT_CEILING_DBTP, STREAMING_TARGET_LUFS};
use serde::{Deserialize, Serialize};

use crate::preset::GenrePreset;

/// Default metering snapshot interval in milliseconds
pub const DEFAULT_METERING_INTERVAL_MS: u32 = 100;

/// Complete configuration of a mastering session
///
/// An empty band layout (no crossovers and/or no band settings) is filled in
/// by [`MasteringConfig::resolved`] from the genre preset, or from the pop
/// layout when no preset is selected. Explicit values always win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteringConfig {
    /// Target integrated loudness in LUFS
    pub target_lufs: f64,

    /// Limiter ceiling in dBTP
    pub true_peak_ceiling_dbtp: f64,

    /// Crossover frequencies in Hz (N - 1 values for N bands)
    #[serde(default)]
    pub band_crossovers: Vec<f64>,

    /// Dynamics settings per band (N values)
    #[serde(default)]
    pub band_settings: Vec<DynamicsSettings>,

    /// Apply material recommendations to band attack/release
    pub auto_material_detection: bool,

    /// Genre preset supplying the band layout
    pub genre_preset: Option<GenrePreset>,

    /// Metering snapshot cadence in milliseconds
    pub metering_interval_ms: u32,

    /// Count blocks that take longer than their real-time budget
    pub deadline_monitoring: bool,
}

impl Default for MasteringConfig {
    fn default() -> Self {
        Self {
            target_lufs: STREAMING_TARGET_LUFS,
            true_peak_ceiling_dbtp: DEFAULT_CEILING_DBTP,
            band_crossovers: Vec::new(),
            band_settings: Vec::new(),
            auto_material_detection: true,
            genre_preset: None,
            metering_interval_ms: DEFAULT_METERING_INTERVAL_MS,
            deadline_monitoring: true,
        }
    }
}

impl MasteringConfig {
    /// Configuration taken entirely from a genre preset
    pub fn from_preset(preset: GenrePreset) -> Self {
        let mut config = Self::default();
        config.apply_preset(preset);
        config
    }

    /// Replace layout, band settings and target with the preset's
    pub fn apply_preset(&mut self, preset: GenrePreset) {
        self.genre_preset = Some(preset);
        self.target_lufs = preset.target_lufs();
        self.band_crossovers = preset.crossovers();
        self.band_settings = preset.band_settings();
    }

    /// Copy with an empty band layout filled in
    pub fn resolved(&self) -> Self {
        let mut config = self.clone();
        let preset = self.genre_preset.unwrap_or(GenrePreset::Pop);

        if config.band_crossovers.is_empty() {
            config.band_crossovers = preset.crossovers();
        }
        if config.band_settings.is_empty() {
            let bands = config.band_crossovers.len() + 1;
            config.band_settings = if preset.band_count() == bands {
                preset.band_settings()
            } else {
                vec![DynamicsSettings::gentle(); bands]
            };
        }
        config
    }

    /// Number of bands described by the crossovers
    pub fn band_count(&self) -> usize {
        self.band_crossovers.len() + 1
    }

    /// Check every value for a stream at `sample_rate`
    ///
    /// Validates the resolved layout, so an empty layout passes as long as
    /// the preset layout fits the sample rate.
    pub fn validate(&self, sample_rate: u32) -> Result<(), ConfigError> {
        validate_target(self.target_lufs)?;
        validate_ceiling(self.true_peak_ceiling_dbtp)?;
        if self.metering_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval(self.metering_interval_ms));
        }

        let resolved = self.resolved();
        validate_crossovers(sample_rate, &resolved.band_crossovers)?;
        if resolved.band_settings.len() != resolved.band_count() {
            return Err(ConfigError::BandCountMismatch {
                expected: resolved.band_count(),
                actual: resolved.band_settings.len(),
            });
        }
        for settings in &resolved.band_settings {
            settings.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MasteringConfig::default();
        assert_eq!(config.target_lufs, -14.0);
        assert_eq!(config.true_peak_ceiling_dbtp, -1.0);
        assert!(config.auto_material_detection);
        assert_eq!(config.metering_interval_ms, 100);
        assert_eq!(config.validate(48_000), Ok(()));

        let resolved = config.resolved();
        assert_eq!(resolved.band_count(), 7);
        assert_eq!(resolved.band_settings, GenrePreset::Pop.band_settings());
    }

    #[test]
    fn preset_layout_fills_empty_bands() {
        let config = MasteringConfig {
            genre_preset: Some(GenrePreset::Podcast),
            ..MasteringConfig::default()
        };
        let resolved = config.resolved();
        assert_eq!(resolved.band_crossovers, vec![120.0, 1_000.0, 5_000.0]);
        assert_eq!(resolved.band_settings.len(), 4);
        // Target is not taken from the preset unless it is applied
        assert_eq!(resolved.target_lufs, -14.0);
    }

    #[test]
    fn explicit_crossovers_get_default_settings() {
        let config = MasteringConfig {
            band_crossovers: vec![200.0, 2_000.0],
            ..MasteringConfig::default()
        };
        let resolved = config.resolved();
        assert_eq!(resolved.band_settings, vec![DynamicsSettings::gentle(); 3]);
        assert_eq!(config.validate(44_100), Ok(()));
    }

    #[test]
    fn from_preset_takes_target() {
        let config = MasteringConfig::from_preset(GenrePreset::Classical);
        assert_eq!(config.target_lufs, -18.0);
        assert_eq!(config.band_count(), 5);
        assert_eq!(config.genre_preset, Some(GenrePreset::Classical));
    }

    #[test]
    fn rejects_bad_values() {
        let base = MasteringConfig::default();

        let config = MasteringConfig { target_lufs: 3.0, ..base.clone() };
        assert_eq!(config.validate(48_000), Err(ConfigError::InvalidTarget(3.0)));

        let config = MasteringConfig { true_peak_ceiling_dbtp: 1.0, ..base.clone() };
        assert_eq!(config.validate(48_000), Err(ConfigError::InvalidCeiling(1.0)));

        let config = MasteringConfig { metering_interval_ms: 0, ..base.clone() };
        assert_eq!(config.validate(48_000), Err(ConfigError::InvalidInterval(0)));

        let config = MasteringConfig {
            band_crossovers: vec![500.0, 200.0],
            ..base.clone()
        };
        assert!(matches!(
            config.validate(48_000),
            Err(ConfigError::CrossoversNotAscending { .. })
        ));

        let config = MasteringConfig {
            band_crossovers: vec![200.0, 2_000.0],
            band_settings: vec![DynamicsSettings::new(); 2],
            ..base.clone()
        };
        assert_eq!(
            config.validate(48_000),
            Err(ConfigError::BandCountMismatch {
                expected: 3,
                actual: 2
            })
        );

        let mut settings = GenrePreset::Pop.band_settings();
        settings[2].ratio = 0.5;
        let config = MasteringConfig {
            band_settings: settings,
            ..base.clone()
        };
        assert_eq!(config.validate(48_000), Err(ConfigError::InvalidRatio(0.5)));

        // 12 kHz crossover does not fit under the Nyquist of 22.05 kHz audio
        assert!(matches!(
            base.validate(22_050),
            Err(ConfigError::CrossoverOutOfRange { .. })
        ));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: MasteringConfig =
            serde_json::from_str(r#"{"target_lufs": -16.0, "genre_preset": "rock"}"#).unwrap();
        assert_eq!(config.target_lufs, -16.0);
        assert_eq!(config.genre_preset, Some(GenrePreset::Rock));
        assert!(config.band_settings.is_empty());
        assert_eq!(config.true_peak_ceiling_dbtp, -1.0);
        assert_eq!(config.resolved().band_settings, GenrePreset::Rock.band_settings());
    }
}
