/// Error types for band splitting and dynamics processing
use automaster_core::ConfigError;
use thiserror::Error;

/// Result type alias using `DynamicsError`
pub type Result<T> = std::result::Result<T, DynamicsError>;

/// Errors that can occur while configuring the multiband processor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DynamicsError {
    /// A setting was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Band index outside the current layout
    #[error("Band index {index} out of range ({count} bands)")]
    BandIndex { index: usize, count: usize },
}
