/// Configuration error types shared by every Automaster crate
use thiserror::Error;

/// Result type alias using `ConfigError`
pub type Result<T> = std::result::Result<T, ConfigError>;

/// A rejected configuration value
///
/// Settings are validated when they are supplied and rejected with one of
/// these variants; nothing is silently clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Compression ratio below 1:1 (or not finite)
    #[error("Invalid ratio {0}: must be >= 1.0")]
    InvalidRatio(f64),

    /// Attack or release time that is not strictly positive
    #[error("Invalid {name} time {value} s: must be > 0")]
    InvalidTimeConstant { name: &'static str, value: f64 },

    /// Threshold above full scale
    #[error("Invalid threshold {0} dB: must be <= 0 dBFS")]
    InvalidThreshold(f64),

    /// Negative knee width
    #[error("Invalid knee width {0} dB: must be >= 0")]
    InvalidKnee(f64),

    /// Negative (or non-finite) makeup gain
    #[error("Invalid makeup gain {0} dB: must be >= 0")]
    InvalidMakeup(f64),

    /// Crossover frequency outside [20 Hz, Nyquist)
    #[error("Crossover {frequency} Hz out of range (20 Hz .. {nyquist} Hz)")]
    CrossoverOutOfRange { frequency: f64, nyquist: f64 },

    /// Crossover list is not strictly increasing
    #[error("Crossovers must be strictly ascending ({previous} Hz followed by {next} Hz)")]
    CrossoversNotAscending { previous: f64, next: f64 },

    /// Band count outside the supported range
    #[error("Invalid band count {count}: supported range is {min}..={max}")]
    InvalidBandCount { count: usize, min: usize, max: usize },

    /// Number of band settings does not match the band layout
    #[error("Band count mismatch: expected {expected}, got {actual}")]
    BandCountMismatch { expected: usize, actual: usize },

    /// Sample rate outside the supported range
    #[error("Unsupported sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Channel count outside the supported range
    #[error("Unsupported channel count: {0}")]
    InvalidChannelCount(usize),

    /// Target loudness that is not a finite negative LUFS value
    #[error("Invalid target loudness {0} LUFS")]
    InvalidTarget(f64),

    /// Limiter ceiling above 0 dBTP (or not finite)
    #[error("Invalid true-peak ceiling {0} dBTP: must be <= 0")]
    InvalidCeiling(f64),

    /// Metering interval of zero
    #[error("Invalid metering interval: {0} ms")]
    InvalidInterval(u32),
}

impl ConfigError {
    /// Create an attack time error
    pub fn attack(value: f64) -> Self {
        Self::InvalidTimeConstant {
            name: "attack",
            value,
        }
    }

    /// Create a release time error
    pub fn release(value: f64) -> Self {
        Self::InvalidTimeConstant {
            name: "release",
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            ConfigError::InvalidRatio(0.5).to_string(),
            "Invalid ratio 0.5: must be >= 1.0"
        );
        assert_eq!(
            ConfigError::attack(0.0).to_string(),
            "Invalid attack time 0 s: must be > 0"
        );
        assert!(ConfigError::BandCountMismatch {
            expected: 4,
            actual: 3
        }
        .to_string()
        .contains("expected 4, got 3"));
    }
}
