//! Automaster CLI Library
//!
//! Offline loudness analysis and mastering of WAV files. The binary is a thin
//! clap front end over these functions; they are exposed for testing.

pub mod cli;
pub mod commands;
pub mod config;
pub mod wav;

pub use cli::{AnalyzeArgs, Cli, Commands, MasterArgs};
pub use commands::{analyze, effective_config, master, presets_table, Analysis, MasterSummary};
pub use config::{load_config, ENV_PREFIX};
pub use wav::{read_wav, write_wav};
