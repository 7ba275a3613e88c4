//! Loudness metering and loudness-driven gain for Automaster
//!
//! This crate provides:
//! - ITU-R BS.1770 K-weighting and channel weighting
//! - Momentary, short-term and gated integrated loudness (LUFS)
//! - Loudness range (EBU Tech 3342)
//! - True-peak detection with 4x polyphase oversampling
//! - Target-loudness trim and a true-peak-aware lookahead limiter
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐     ┌───────────────┐
//! │ Audio Frame │ ──► │ K-Weighting  │ ──► │ Hop Window    │ ──► │ Gating Blocks │
//! └─────────────┘     └──────────────┘     └───────────────┘     └───────────────┘
//!        │                                                               │
//!        ▼                                                               ▼
//! ┌──────────────┐                                              ┌───────────────┐
//! │ True Peak    │                                              │ LUFS / LRA    │
//! └──────────────┘                                              └───────────────┘
//!
//! During Mastering:
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Audio Data  │ ──► │ Target Trim  │ ──► │ TP Limiter    │
//! └─────────────┘     └──────────────┘     └───────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use automaster_loudness::LoudnessAnalyzer;
//!
//! let mut analyzer = LoudnessAnalyzer::new(48_000, 1)?;
//! let tone: Vec<f32> = (0..48_000 * 4)
//!     .map(|i| (0.1 * (2.0 * std::f64::consts::PI * 1_000.0 * i as f64 / 48_000.0).sin()) as f32)
//!     .collect();
//! analyzer.add_frames(&tone)?;
//! let info = analyzer.finalize()?;
//!
//! assert!((info.integrated_lufs - -23.0).abs() < 0.2);
//! # Ok::<(), automaster_loudness::LoudnessError>(())
//! ```

#![forbid(unsafe_code)]

mod analyzer;
mod error;
mod histogram;
mod kweighting;
mod limiter;
mod meter;
mod trim;
mod true_peak;

pub use analyzer::{LoudnessAnalyzer, LoudnessInfo};
pub use error::{LoudnessError, Result};
pub use kweighting::{KWeightingBank, KWeightingFilter};
pub use limiter::{validate_ceiling, TruePeakLimiter};
pub use meter::{ChannelWeights, GatingBlock, LoudnessMeter};
pub use trim::{validate_target, TargetTrim};
pub use true_peak::TruePeakDetector;

/// Loudness reported when nothing measurable has been accumulated
pub const LUFS_FLOOR: f64 = f64::NEG_INFINITY;

/// BS.1770 offset applied to the channel-weighted mean square
pub const LOUDNESS_OFFSET: f64 = -0.691;

/// Absolute gating threshold (LUFS)
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gating threshold for integrated loudness (LU below the ungated mean)
pub const RELATIVE_GATE_LU: f64 = -10.0;

/// Relative gating threshold for loudness range (EBU Tech 3342)
pub const LRA_RELATIVE_GATE_LU: f64 = -20.0;

/// EBU R128 broadcast reference level (-23 LUFS)
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// Common streaming platform reference level (-14 LUFS)
pub const STREAMING_TARGET_LUFS: f64 = -14.0;

/// Default limiter ceiling (dBTP)
pub const DEFAULT_CEILING_DBTP: f64 = -1.0;

/// Largest trim (boost or cut) applied toward the target loudness, in dB
pub const MAX_TRIM_DB: f64 = 20.0;

/// Loudness of a channel-weighted mean square
#[inline]
pub fn energy_to_lufs(energy: f64) -> f64 {
    if energy > 0.0 {
        LOUDNESS_OFFSET + 10.0 * energy.log10()
    } else {
        LUFS_FLOOR
    }
}

/// Channel-weighted mean square of a loudness value
#[inline]
pub fn lufs_to_energy(lufs: f64) -> f64 {
    10.0_f64.powf((lufs - LOUDNESS_OFFSET) / 10.0)
}
