/// Error types for the mastering engine
use automaster_core::ConfigError;
use automaster_dynamics::DynamicsError;
use automaster_loudness::LoudnessError;
use thiserror::Error;

/// Result type alias using `EngineError`
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while configuring or running the mastering engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// A configuration value was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Loudness measurement failed
    #[error(transparent)]
    Loudness(#[from] LoudnessError),

    /// Dynamics configuration failed
    #[error(transparent)]
    Dynamics(#[from] DynamicsError),

    /// A lock-free queue had no room for the item
    #[error("The {queue} queue is full")]
    QueueFull { queue: &'static str },

    /// Unknown genre preset name
    #[error("Unknown genre preset: {0}")]
    UnknownPreset(String),

    /// Render block size of zero
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    /// Input buffer is not a whole number of frames
    #[error("Input has {samples} samples, not a multiple of {channels} channels")]
    IncompleteFrame { samples: usize, channels: usize },

    /// The render worker thread could not be started
    #[error("Failed to start render worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The render worker thread panicked
    #[error("Render worker panicked")]
    WorkerPanicked,
}
