//! Automaster Dynamics
//!
//! Multiband dynamics for the mastering chain:
//! - **Band splitting**: Linkwitz-Riley 24 dB/oct crossovers with all-pass
//!   phase compensation, so the bands sum back to flat magnitude
//! - **Per-band compression**: feed-forward soft-knee compressor with a peak
//!   detector and attack/release gain smoothing
//! - **Multiband processing**: split, compress each band, sum
//!
//! # Example
//!
//! ```rust
//! use automaster_dynamics::{DynamicsSettings, MultibandCompressor, DEFAULT_CROSSOVERS};
//!
//! let settings = [DynamicsSettings::gentle(); DEFAULT_CROSSOVERS.len() + 1];
//! let mut processor =
//!     MultibandCompressor::new(48_000, 2, &DEFAULT_CROSSOVERS, &settings).unwrap();
//!
//! let mut samples = vec![0.0f32; 960];
//! processor.process_interleaved(&mut samples);
//! assert_eq!(processor.gain_reduction_db(0), 0.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod compressor;
mod error;
mod multiband;
mod settings;
mod splitter;

pub use compressor::{gain_reduction, output_level, BandCompressor, CompressorState};
pub use error::{DynamicsError, Result};
pub use multiband::{band_name, Band, MultibandCompressor};
pub use settings::DynamicsSettings;
pub use splitter::{validate_crossovers, BandSplitter, MIN_BANDS, MIN_CROSSOVER_HZ};

/// Maximum number of bands
pub const MAX_BANDS: usize = 8;

/// Default crossover frequencies in Hz (seven bands)
pub const DEFAULT_CROSSOVERS: [f64; 6] = [80.0, 200.0, 600.0, 2_000.0, 6_000.0, 12_000.0];
