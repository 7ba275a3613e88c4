//! Material classification from transient density
//!
//! The signal is cut into 5 ms RMS windows. A window whose level rises more
//! than 10 dB above the previous window (and sits above a -60 dBFS activity
//! floor) counts as a transient. Transient density per second selects the
//! material type:
//!
//! | Density (per s) | Material   | Attack | Release |
//! |-----------------|------------|--------|---------|
//! | > 10            | Percussive | 1 ms   | 80 ms   |
//! | 5 ..= 10        | Balanced   | 3 ms   | 150 ms  |
//! | < 5             | Smooth     | 10 ms  | 250 ms  |
//!
//! Sparse but sharp material (at least one transient per second and a crest
//! factor of 12 dB or more) is promoted from smooth to balanced. The crest
//! factor is the true peak (dBTP) minus the short-term loudness (LUFS).

use automaster_core::{power_to_db, SampleWindow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RMS window length in seconds
pub const WINDOW_SECONDS: f64 = 0.005;

/// Level jump (dB) that marks a transient
pub const TRANSIENT_RISE_DB: f64 = 10.0;

/// Windows quieter than this never count as transients (dBFS)
pub const ACTIVITY_FLOOR_DBFS: f64 = -60.0;

/// Densities above this are percussive (per second)
pub const PERCUSSIVE_DENSITY: f64 = 10.0;

/// Densities at or above this are at least balanced (per second)
pub const BALANCED_DENSITY: f64 = 5.0;

/// Crest factor (dB) that promotes sparse material from smooth to balanced
pub const CREST_PROMOTION_DB: f64 = 12.0;

/// Minimum density (per second) for crest promotion
pub const MIN_PROMOTION_DENSITY: f64 = 1.0;

/// Default reporting interval in seconds
pub const DEFAULT_INTERVAL_SECONDS: f64 = 1.0;

/// Broad material type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    /// Dense, sharp transients (drums, percussion-led mixes)
    Percussive,
    /// Moderate transient activity
    Balanced,
    /// Sustained material with few transients (pads, strings, speech beds)
    Smooth,
}

impl MaterialType {
    /// Recommended (attack, release) in seconds
    pub fn recommended_timing(self) -> (f64, f64) {
        match self {
            Self::Percussive => (0.001, 0.080),
            Self::Balanced => (0.003, 0.150),
            Self::Smooth => (0.010, 0.250),
        }
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Percussive => "percussive",
            Self::Balanced => "balanced",
            Self::Smooth => "smooth",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying one reporting interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialClassification {
    /// Material type
    pub material: MaterialType,
    /// Transients per second
    pub transient_density_per_sec: f64,
    /// True peak minus short-term loudness (dB); not finite when unknown
    pub crest_factor_db: f64,
    /// Recommended attack time in seconds
    pub recommended_attack_s: f64,
    /// Recommended release time in seconds
    pub recommended_release_s: f64,
}

impl MaterialClassification {
    fn new(material: MaterialType, density: f64, crest_factor_db: f64) -> Self {
        let (attack, release) = material.recommended_timing();
        Self {
            material,
            transient_density_per_sec: density,
            crest_factor_db,
            recommended_attack_s: attack,
            recommended_release_s: release,
        }
    }
}

/// Whether a window at `level_db` following one at `previous_db` is a transient
#[inline]
pub fn is_transient(previous_db: f64, level_db: f64) -> bool {
    level_db > ACTIVITY_FLOOR_DBFS && level_db - previous_db > TRANSIENT_RISE_DB
}

/// Pick a material type from transient density and crest factor
///
/// A crest factor that is not finite (silence, or no short-term reading yet)
/// never promotes.
pub fn material_for(density_per_sec: f64, crest_factor_db: f64) -> MaterialType {
    if density_per_sec > PERCUSSIVE_DENSITY {
        MaterialType::Percussive
    } else if density_per_sec >= BALANCED_DENSITY {
        MaterialType::Balanced
    } else if density_per_sec >= MIN_PROMOTION_DENSITY
        && crest_factor_db.is_finite()
        && crest_factor_db >= CREST_PROMOTION_DB
    {
        MaterialType::Balanced
    } else {
        MaterialType::Smooth
    }
}

/// Classify a history of window levels (dB RMS)
///
/// # Arguments
/// * `levels_db` - Consecutive 5 ms window levels, oldest first
/// * `interval_secs` - Duration the history covers
/// * `crest_factor_db` - True peak minus short-term loudness
pub fn classify(
    levels_db: &[f64],
    interval_secs: f64,
    crest_factor_db: f64,
) -> MaterialClassification {
    let mut previous = f64::NEG_INFINITY;
    let mut transients = 0usize;
    for &level in levels_db {
        if is_transient(previous, level) {
            transients += 1;
        }
        previous = level;
    }

    let density = if interval_secs > 0.0 {
        transients as f64 / interval_secs
    } else {
        0.0
    };
    MaterialClassification::new(material_for(density, crest_factor_db), density, crest_factor_db)
}

/// Streaming classifier
///
/// Feeds 5 ms windows as frames arrive and reports the end of each interval;
/// the owner then supplies the crest factor and collects the classification.
/// Nothing is allocated after construction.
#[derive(Debug, Clone)]
pub struct MaterialClassifier {
    window: SampleWindow,
    channels: usize,
    previous_db: f64,
    transients: usize,
    windows_per_interval: usize,
    windows_in_interval: usize,
    interval_secs: f64,
    last: Option<MaterialClassification>,
}

impl MaterialClassifier {
    /// Create a classifier reporting every `interval_secs`
    pub fn new(sample_rate: u32, channels: usize, interval_secs: f64) -> Self {
        let window = SampleWindow::from_duration(sample_rate, WINDOW_SECONDS);
        let window_secs = window.len() as f64 / f64::from(sample_rate.max(1));
        let windows_per_interval = ((interval_secs / window_secs).round() as usize).max(1);

        Self {
            channels: channels.max(1),
            previous_db: f64::NEG_INFINITY,
            transients: 0,
            windows_per_interval,
            windows_in_interval: 0,
            interval_secs: (windows_per_interval * window.len()) as f64
                / f64::from(sample_rate.max(1)),
            window,
            last: None,
        }
    }

    /// Feed one interleaved frame
    ///
    /// Returns `true` when this frame completes a reporting interval.
    #[inline]
    pub fn push_frame(&mut self, frame: &[f32]) -> bool {
        let energy = frame
            .iter()
            .map(|&s| f64::from(s) * f64::from(s))
            .sum::<f64>()
            / self.channels as f64;

        let Some(mean_square) = self.window.push_energy(energy) else {
            return false;
        };

        let level_db = power_to_db(mean_square);
        if is_transient(self.previous_db, level_db) {
            self.transients += 1;
        }
        self.previous_db = level_db;
        self.windows_in_interval += 1;

        self.windows_in_interval >= self.windows_per_interval
    }

    /// Close the current interval and classify it
    pub fn finish_interval(&mut self, crest_factor_db: f64) -> MaterialClassification {
        let density = self.transients as f64 / self.interval_secs;
        let classification =
            MaterialClassification::new(material_for(density, crest_factor_db), density, crest_factor_db);

        self.transients = 0;
        self.windows_in_interval = 0;
        self.last = Some(classification);
        classification
    }

    /// Most recent classification
    pub fn last(&self) -> Option<MaterialClassification> {
        self.last
    }

    /// Interval length in seconds
    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.window.reset();
        self.previous_db = f64::NEG_INFINITY;
        self.transients = 0;
        self.windows_in_interval = 0;
        self.last = None;
    }
}
