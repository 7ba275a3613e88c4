//! Automaster Core
//!
//! Platform-agnostic building blocks shared by the Automaster loudness,
//! dynamics and engine crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Audio Types**: `SampleRate`, `AudioFormat`, `AudioBuffer`
//! - **Analysis Windows**: `SampleWindow` and `EnergyHistory` for gated energy measurement
//! - **Filters**: an inspectable f64 `Biquad` with RBJ/BS.1770 coefficient designs
//! - **Level Helpers**: dB/linear conversion and input sanitizing
//! - **Error Handling**: `ConfigError` for rejected settings
//!
//! # Example
//!
//! ```rust
//! use automaster_core::window::SampleWindow;
//!
//! // 100 ms hops at 48 kHz
//! let mut window = SampleWindow::from_duration(48_000, 0.1);
//! let mut completed = None;
//! for _ in 0..4_800 {
//!     completed = window.push(0.5).or(completed);
//! }
//! assert_eq!(completed, Some(0.25));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod biquad;
pub mod error;
pub mod level;
pub mod sanitize;
pub mod types;
pub mod window;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use biquad::{Biquad, BiquadCoefficients};
pub use error::{ConfigError, Result};
pub use level::{db_to_linear, linear_to_db, power_to_db};
pub use sanitize::sanitize_in_place;
pub use types::{AudioBuffer, AudioFormat, SampleRate};
pub use window::{EnergyHistory, SampleWindow};

/// Maximum number of channels any processor preallocates for
pub const MAX_CHANNELS: usize = 8;

/// Supported sample rate range in Hz
pub const MIN_SAMPLE_RATE: u32 = 8_000;
/// Supported sample rate range in Hz
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Check a sample rate / channel count pair against the supported ranges
pub fn validate_stream(sample_rate: u32, channels: usize) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(ConfigError::InvalidSampleRate(sample_rate));
    }
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(ConfigError::InvalidChannelCount(channels));
    }
    Ok(())
}
