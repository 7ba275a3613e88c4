/// Subcommand implementations
use anyhow::Result;
use automaster_engine::{
    render, GenrePreset, MasteringConfig, MasteringPipeline, MaterialClassification,
    PipelineParts, RenderOptions, RenderReport, DEFAULT_BLOCK_SIZE,
};
use automaster_loudness::{LoudnessAnalyzer, LoudnessInfo};
use serde_json::json;
use std::fmt::{self, Write as _};
use std::path::Path;

use crate::cli::MasterArgs;
use crate::config::load_config;
use crate::wav::{read_wav, write_wav};

/// Loudness measurement and material classification of one file
#[derive(Debug, Clone)]
pub struct Analysis {
    pub loudness: LoudnessInfo,
    /// `None` for material shorter than one classifier interval
    pub classification: Option<MaterialClassification>,
}

impl Analysis {
    /// JSON form of the report (non-finite levels become `null`)
    pub fn to_json(&self) -> serde_json::Value {
        let info = &self.loudness;
        json!({
            "integrated_lufs": info.integrated_lufs,
            "loudness_range_lu": info.loudness_range_lu,
            "max_momentary_lufs": info.max_momentary_lufs,
            "max_short_term_lufs": info.max_short_term_lufs,
            "true_peak_dbtp": info.true_peak_dbtp,
            "sample_peak_dbfs": info.sample_peak_dbfs,
            "duration_seconds": info.duration_seconds,
            "sample_rate": info.sample_rate,
            "channels": info.channels,
            "classification": self.classification,
        })
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = &self.loudness;
        writeln!(f, "Integrated:      {:>7.1} LUFS", info.integrated_lufs)?;
        writeln!(f, "Loudness range:  {:>7.1} LU", info.loudness_range_lu)?;
        writeln!(f, "Max momentary:   {:>7.1} LUFS", info.max_momentary_lufs)?;
        writeln!(f, "Max short-term:  {:>7.1} LUFS", info.max_short_term_lufs)?;
        writeln!(f, "True peak:       {:>7.1} dBTP", info.true_peak_dbtp)?;
        writeln!(f, "Sample peak:     {:>7.1} dBFS", info.sample_peak_dbfs)?;
        writeln!(
            f,
            "Duration:        {:>7.2} s ({} Hz, {} ch)",
            info.duration_seconds, info.sample_rate, info.channels
        )?;
        match &self.classification {
            Some(c) => write!(
                f,
                "Material:        {} ({:.1} transients/s, crest {:.1} dB)",
                c.material, c.transient_density_per_sec, c.crest_factor_db
            ),
            None => write!(f, "Material:        too short to classify"),
        }
    }
}

/// Measure a WAV file
pub fn analyze(path: &Path) -> Result<Analysis> {
    let input = read_wav(path)?;
    let sample_rate = input.format.sample_rate.as_hz();
    let channels = input.format.channel_count();

    let mut analyzer = LoudnessAnalyzer::new(sample_rate, u32::from(input.format.channels))?;
    analyzer.add_frames(&input.samples)?;
    let loudness = analyzer.finalize()?;

    // Classification needs the pipeline's meters; run a copy through it
    let config = MasteringConfig {
        auto_material_detection: false,
        deadline_monitoring: false,
        ..MasteringConfig::default()
    };
    let PipelineParts { mut pipeline, .. } = MasteringPipeline::new(&config, sample_rate, channels)?;
    let mut scratch = input.samples;
    for block in scratch.chunks_mut(DEFAULT_BLOCK_SIZE * channels) {
        pipeline.process_interleaved(block);
    }

    tracing::info!(
        path = %path.display(),
        integrated_lufs = loudness.integrated_lufs,
        true_peak_dbtp = loudness.true_peak_dbtp,
        "Analyzed"
    );
    Ok(Analysis {
        loudness,
        classification: pipeline.classification(),
    })
}

/// Configuration file plus command-line overrides
///
/// The preset replaces the file's band layout and target; explicit
/// `--target` and `--ceiling` win over both.
pub fn effective_config(
    path: Option<&Path>,
    preset: Option<GenrePreset>,
    target: Option<f64>,
    ceiling: Option<f64>,
) -> Result<MasteringConfig> {
    let mut config = load_config(path)?;
    if let Some(preset) = preset {
        config.apply_preset(preset);
    }
    if let Some(target) = target {
        config.target_lufs = target;
    }
    if let Some(ceiling) = ceiling {
        config.true_peak_ceiling_dbtp = ceiling;
    }
    Ok(config)
}

/// Outcome of `master`
#[derive(Debug, Clone)]
pub struct MasterSummary {
    pub config: MasteringConfig,
    pub report: RenderReport,
}

impl fmt::Display for MasterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.report;
        writeln!(f, "Input:  {}", report.input_loudness)?;
        writeln!(f, "Output: {}", report.output_loudness)?;
        writeln!(
            f,
            "Target: {:.1} LUFS, ceiling {:.1} dBTP, trim {:+.1} dB, limiter {:.1} dB",
            self.config.target_lufs,
            self.config.true_peak_ceiling_dbtp,
            report.final_snapshot.trim_db,
            report.final_snapshot.limiter_gain_reduction_db
        )?;
        if let Some(c) = &report.classification {
            writeln!(f, "Material: {}", c.material)?;
        }
        write!(
            f,
            "Rendered {:.2} s in {:.2} s ({} diagnostics)",
            report.output.duration_secs(),
            report.elapsed.as_secs_f64(),
            report.diagnostics.len()
        )
    }
}

/// Master `args.input` into `args.output`
pub fn master(args: &MasterArgs) -> Result<MasterSummary> {
    let config = effective_config(args.config.as_deref(), args.preset, args.target, args.ceiling)?;
    let input = read_wav(&args.input)?;

    let options = RenderOptions {
        block_size: args.block_size,
        two_pass: !args.single_pass,
        compensate_latency: true,
    };
    let report = render(&config, &input, &options)?;
    for event in &report.diagnostics {
        tracing::warn!(%event, "Render diagnostic");
    }

    write_wav(&args.output, &report.output)?;
    tracing::info!(output = %args.output.display(), "Mastered");

    Ok(MasterSummary { config, report })
}

/// Human-readable list of the genre presets
pub fn presets_table() -> String {
    let mut table = String::new();
    for preset in GenrePreset::ALL {
        let crossovers: Vec<String> = preset
            .crossovers()
            .iter()
            .map(|hz| format!("{hz}"))
            .collect();
        // Writing into a String cannot fail
        let _ = writeln!(
            table,
            "{:<11} {} bands  {:>5.1} LUFS  [{}] Hz\n            {}",
            preset.name(),
            preset.band_count(),
            preset.target_lufs(),
            crossovers.join(", "),
            preset.description()
        );
    }
    table
}
