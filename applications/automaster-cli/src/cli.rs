/// Command-line arguments
use automaster_engine::{GenrePreset, DEFAULT_BLOCK_SIZE};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "automaster")]
#[command(about = "Loudness analysis and automatic mastering of WAV files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Measure loudness, peaks and material type of a WAV file
    Analyze(AnalyzeArgs),
    /// Master a WAV file and write the result as 32-bit float WAV
    Master(MasterArgs),
    /// List the genre presets
    Presets,
    /// Print the effective configuration as JSON
    Config {
        /// Configuration file path (TOML)
        #[arg(short, long, env = "AUTOMASTER_CONFIG")]
        config: Option<PathBuf>,
        /// Genre preset applied on top of the file
        #[arg(short, long)]
        preset: Option<GenrePreset>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// WAV file to analyze
    pub input: PathBuf,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct MasterArgs {
    /// Source WAV file
    pub input: PathBuf,
    /// Destination WAV file
    pub output: PathBuf,
    /// Configuration file path (TOML)
    #[arg(short, long, env = "AUTOMASTER_CONFIG")]
    pub config: Option<PathBuf>,
    /// Genre preset (replaces the band layout and target of the file)
    #[arg(short, long)]
    pub preset: Option<GenrePreset>,
    /// Target integrated loudness in LUFS
    #[arg(long, allow_negative_numbers = true)]
    pub target: Option<f64>,
    /// True-peak ceiling in dBTP
    #[arg(long, allow_negative_numbers = true)]
    pub ceiling: Option<f64>,
    /// Converge the trim while rendering instead of measuring first
    #[arg(long)]
    pub single_pass: bool,
    /// Frames per processing block
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,
}

impl MasterArgs {
    /// Arguments with every option at its default
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            config: None,
            preset: None,
            target: None,
            ceiling: None,
            single_pass: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}
