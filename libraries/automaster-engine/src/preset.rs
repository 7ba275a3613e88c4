//! Genre presets
//!
//! Each preset supplies a crossover layout, per-band dynamics and a target
//! loudness. Most presets use seven bands; speech and classical material use
//! fewer, wider bands.

use automaster_dynamics::{DynamicsSettings, DEFAULT_CROSSOVERS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Genre preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenrePreset {
    /// Pop
    Pop,
    /// Rock
    Rock,
    /// Hip-hop
    #[serde(alias = "hip-hop", alias = "hip_hop")]
    HipHop,
    /// Electronic / dance
    Electronic,
    /// Acoustic
    Acoustic,
    /// Classical
    Classical,
    /// Spoken word
    Podcast,
}

/// (threshold dB, ratio, attack ms, release ms, knee dB)
type BandRow = (f64, f64, f64, f64, f64);

const POP: [BandRow; 7] = [
    (-18.0, 2.5, 10.0, 150.0, 6.0),
    (-18.0, 2.5, 8.0, 120.0, 6.0),
    (-20.0, 2.0, 10.0, 120.0, 6.0),
    (-20.0, 2.0, 5.0, 100.0, 6.0),
    (-22.0, 2.0, 3.0, 80.0, 6.0),
    (-24.0, 2.5, 2.0, 60.0, 6.0),
    (-26.0, 2.0, 1.0, 50.0, 6.0),
];

const ROCK: [BandRow; 7] = [
    (-16.0, 3.0, 10.0, 150.0, 6.0),
    (-16.0, 3.0, 8.0, 120.0, 6.0),
    (-18.0, 2.5, 8.0, 120.0, 6.0),
    (-18.0, 3.0, 5.0, 100.0, 4.0),
    (-20.0, 3.0, 3.0, 80.0, 4.0),
    (-22.0, 2.5, 2.0, 60.0, 6.0),
    (-24.0, 2.0, 1.0, 50.0, 6.0),
];

const HIP_HOP: [BandRow; 7] = [
    (-14.0, 4.0, 15.0, 200.0, 6.0),
    (-16.0, 3.5, 10.0, 150.0, 6.0),
    (-20.0, 2.0, 10.0, 120.0, 6.0),
    (-20.0, 2.5, 5.0, 100.0, 6.0),
    (-22.0, 2.5, 3.0, 80.0, 6.0),
    (-24.0, 2.0, 2.0, 60.0, 6.0),
    (-26.0, 2.0, 1.0, 50.0, 6.0),
];

const ELECTRONIC: [BandRow; 7] = [
    (-12.0, 4.0, 20.0, 200.0, 4.0),
    (-14.0, 4.0, 10.0, 150.0, 4.0),
    (-18.0, 3.0, 8.0, 100.0, 6.0),
    (-18.0, 3.0, 5.0, 80.0, 6.0),
    (-20.0, 3.0, 2.0, 60.0, 6.0),
    (-22.0, 2.5, 1.0, 50.0, 6.0),
    (-24.0, 2.0, 1.0, 40.0, 6.0),
];

const ACOUSTIC: [BandRow; 7] = [
    (-24.0, 1.5, 20.0, 250.0, 10.0),
    (-24.0, 1.5, 15.0, 200.0, 10.0),
    (-24.0, 1.5, 15.0, 200.0, 10.0),
    (-22.0, 1.8, 10.0, 150.0, 10.0),
    (-24.0, 1.8, 8.0, 120.0, 10.0),
    (-26.0, 1.5, 5.0, 100.0, 10.0),
    (-28.0, 1.5, 5.0, 100.0, 10.0),
];

const CLASSICAL: [BandRow; 5] = [
    (-30.0, 1.3, 30.0, 400.0, 12.0),
    (-30.0, 1.3, 25.0, 350.0, 12.0),
    (-28.0, 1.5, 20.0, 300.0, 12.0),
    (-30.0, 1.3, 15.0, 250.0, 12.0),
    (-32.0, 1.3, 10.0, 200.0, 12.0),
];

const PODCAST: [BandRow; 4] = [
    (-24.0, 3.0, 10.0, 150.0, 6.0),
    (-20.0, 3.0, 5.0, 100.0, 6.0),
    (-22.0, 2.5, 3.0, 80.0, 6.0),
    (-26.0, 2.0, 2.0, 60.0, 6.0),
];

fn rows_to_settings(rows: &[BandRow]) -> Vec<DynamicsSettings> {
    rows.iter()
        .map(
            |&(threshold_db, ratio, attack_ms, release_ms, knee_db)| DynamicsSettings {
                threshold_db,
                ratio,
                attack_s: attack_ms / 1000.0,
                release_s: release_ms / 1000.0,
                knee_db,
                makeup_db: 0.0,
            },
        )
        .collect()
}

impl GenrePreset {
    /// Every preset, in display order
    pub const ALL: [GenrePreset; 7] = [
        Self::Pop,
        Self::Rock,
        Self::HipHop,
        Self::Electronic,
        Self::Acoustic,
        Self::Classical,
        Self::Podcast,
    ];

    /// Lowercase name, as accepted by [`FromStr`]
    pub fn name(self) -> &'static str {
        match self {
            Self::Pop => "pop",
            Self::Rock => "rock",
            Self::HipHop => "hiphop",
            Self::Electronic => "electronic",
            Self::Acoustic => "acoustic",
            Self::Classical => "classical",
            Self::Podcast => "podcast",
        }
    }

    /// One-line description
    pub fn description(self) -> &'static str {
        match self {
            Self::Pop => "Balanced seven-band glue for streaming releases",
            Self::Rock => "Firmer mids and low end, louder target",
            Self::HipHop => "Tight low end with slow release on sub and bass",
            Self::Electronic => "Dense, loud, heavy low-band control",
            Self::Acoustic => "Light ratios and wide knees to keep dynamics",
            Self::Classical => "Five wide bands, barely compressed, quiet target",
            Self::Podcast => "Four speech bands, firm mids, -16 LUFS",
        }
    }

    /// Target loudness in LUFS
    pub fn target_lufs(self) -> f64 {
        match self {
            Self::Pop => -14.0,
            Self::Rock | Self::HipHop => -12.0,
            Self::Electronic => -11.0,
            Self::Acoustic | Self::Podcast => -16.0,
            Self::Classical => -18.0,
        }
    }

    /// Crossover frequencies in Hz
    pub fn crossovers(self) -> Vec<f64> {
        match self {
            Self::Pop | Self::Rock | Self::Acoustic => DEFAULT_CROSSOVERS.to_vec(),
            Self::HipHop => vec![60.0, 150.0, 500.0, 2_000.0, 6_000.0, 12_000.0],
            Self::Electronic => vec![60.0, 150.0, 500.0, 2_000.0, 7_000.0, 14_000.0],
            Self::Classical => vec![100.0, 500.0, 2_500.0, 8_000.0],
            Self::Podcast => vec![120.0, 1_000.0, 5_000.0],
        }
    }

    /// Per-band dynamics (one entry per band)
    pub fn band_settings(self) -> Vec<DynamicsSettings> {
        match self {
            Self::Pop => rows_to_settings(&POP),
            Self::Rock => rows_to_settings(&ROCK),
            Self::HipHop => rows_to_settings(&HIP_HOP),
            Self::Electronic => rows_to_settings(&ELECTRONIC),
            Self::Acoustic => rows_to_settings(&ACOUSTIC),
            Self::Classical => rows_to_settings(&CLASSICAL),
            Self::Podcast => rows_to_settings(&PODCAST),
        }
    }

    /// Number of bands
    pub fn band_count(self) -> usize {
        self.crossovers().len() + 1
    }
}

impl fmt::Display for GenrePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GenrePreset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == normalized)
            .ok_or_else(|| EngineError::UnknownPreset(s.to_string()))
    }
}
