//! Error types for loudness analysis

use automaster_core::ConfigError;
use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur during loudness analysis
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Rejected configuration (sample rate, channel count, target, ceiling)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Interleaved sample count does not divide into whole frames
    #[error("Sample count {samples} is not divisible by channel count {channels}")]
    IncompleteFrame { samples: usize, channels: usize },

    /// No samples were provided for analysis
    #[error("No audio samples provided for analysis")]
    NoSamples,
}
