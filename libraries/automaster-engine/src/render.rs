//! Offline rendering
//!
//! Runs a whole buffer through the same [`MasteringPipeline`] a live host
//! would use, block by block. In two-pass mode the input is analyzed first
//! and its integrated loudness becomes the fixed trim reference, so the trim
//! is constant for the whole program instead of converging while the meter
//! fills.

use automaster_core::AudioBuffer;
use automaster_loudness::{LoudnessAnalyzer, LoudnessInfo};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::classifier::MaterialClassification;
use crate::config::MasteringConfig;
use crate::error::{EngineError, Result};
use crate::metering::{DiagnosticEvent, MeteringSnapshot};
use crate::pipeline::{MasteringPipeline, PipelineParts};

/// Default block size in frames
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Offline render options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Frames per processing block
    pub block_size: usize,
    /// Analyze first and use the measured loudness as the trim reference
    pub two_pass: bool,
    /// Flush the limiter lookahead and drop the leading delay
    pub compensate_latency: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            two_pass: true,
            compensate_latency: true,
        }
    }
}

/// Result of an offline render
#[derive(Debug, Clone)]
pub struct RenderReport {
    /// Processed audio, same format as the input
    pub output: AudioBuffer,
    /// Loudness of the input
    pub input_loudness: LoudnessInfo,
    /// Loudness of the output
    pub output_loudness: LoudnessInfo,
    /// Meter readings after the last frame
    pub final_snapshot: MeteringSnapshot,
    /// Last material classification
    pub classification: Option<MaterialClassification>,
    /// Every snapshot published during the render
    pub snapshots: Vec<MeteringSnapshot>,
    /// Every diagnostic reported during the render
    pub diagnostics: Vec<DiagnosticEvent>,
    /// Fixed trim reference used (two-pass mode with non-silent input)
    pub reference_lufs: Option<f64>,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

fn analyze(buffer: &AudioBuffer) -> Result<LoudnessInfo> {
    if buffer.is_empty() {
        return Ok(LoudnessInfo::empty(
            buffer.format.sample_rate.as_hz(),
            u32::from(buffer.format.channels),
        ));
    }
    let mut analyzer =
        LoudnessAnalyzer::new(buffer.format.sample_rate.as_hz(), u32::from(buffer.format.channels))?;
    analyzer.add_frames(&buffer.samples)?;
    Ok(analyzer.finalize()?)
}

/// Master `input` offline
///
/// Deadline monitoring is always off; everything else follows `config`.
pub fn render(
    config: &MasteringConfig,
    input: &AudioBuffer,
    options: &RenderOptions,
) -> Result<RenderReport> {
    if options.block_size == 0 {
        return Err(EngineError::InvalidBlockSize(options.block_size));
    }
    let started = Instant::now();
    let sample_rate = input.format.sample_rate.as_hz();
    let channels = input.format.channel_count();

    let config = MasteringConfig {
        deadline_monitoring: false,
        ..config.clone()
    };
    let PipelineParts {
        mut pipeline,
        mut receiver,
        ..
    } = MasteringPipeline::new(&config, sample_rate, channels)?;

    if input.samples.len() % channels != 0 {
        return Err(EngineError::IncompleteFrame {
            samples: input.samples.len(),
            channels,
        });
    }
    let input_loudness = analyze(input)?;

    let reference_lufs = if options.two_pass {
        Some(input_loudness.integrated_lufs).filter(|lufs| lufs.is_finite())
    } else {
        None
    };
    pipeline.set_reference(reference_lufs);

    tracing::info!(
        frames = input.frames(),
        sample_rate,
        channels,
        input_lufs = input_loudness.integrated_lufs,
        ?reference_lufs,
        block_size = options.block_size,
        "Rendering"
    );

    let latency = if options.compensate_latency {
        pipeline.latency_samples()
    } else {
        0
    };
    let mut samples = Vec::with_capacity(input.samples.len() + latency * channels);
    samples.extend_from_slice(&input.samples);
    samples.resize(input.samples.len() + latency * channels, 0.0);

    let mut snapshots = Vec::new();
    let mut diagnostics = Vec::new();
    for block in samples.chunks_mut(options.block_size * channels) {
        pipeline.process_interleaved(block);
        snapshots.extend(receiver.snapshots());
        diagnostics.extend(receiver.diagnostics());
    }
    samples.drain(..latency * channels);

    let output = AudioBuffer::new(samples, input.format);
    let output_loudness = analyze(&output)?;
    let elapsed = started.elapsed();

    tracing::info!(
        output_lufs = output_loudness.integrated_lufs,
        output_true_peak_dbtp = output_loudness.true_peak_dbtp,
        snapshots = snapshots.len(),
        diagnostics = diagnostics.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Render finished"
    );

    Ok(RenderReport {
        output,
        input_loudness,
        output_loudness,
        final_snapshot: pipeline.snapshot(),
        classification: pipeline.classification(),
        snapshots,
        diagnostics,
        reference_lufs,
        elapsed,
    })
}

/// Handle to a render running on a worker thread
#[derive(Debug)]
pub struct RenderHandle {
    handle: JoinHandle<Result<RenderReport>>,
}

impl RenderHandle {
    /// Wait for the render to finish
    pub fn join(self) -> Result<RenderReport> {
        self.handle
            .join()
            .map_err(|_| EngineError::WorkerPanicked)?
    }

    /// Whether the worker has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Start [`render`] on a named worker thread
pub fn spawn_render(
    config: MasteringConfig,
    input: AudioBuffer,
    options: RenderOptions,
) -> Result<RenderHandle> {
    let handle = thread::Builder::new()
        .name("automaster-render".to_string())
        .spawn(move || render(&config, &input, &options))?;
    Ok(RenderHandle { handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaster_core::test_utils::generate_sine;
    use automaster_core::SampleRate;

    fn sine_buffer(seconds: f64, amplitude: f64) -> AudioBuffer {
        let left = generate_sine(440.0, 48_000, seconds, amplitude, 1);
        let right = left.clone();
        AudioBuffer::from_planar(&[left.as_slice(), right.as_slice()], SampleRate::DVD_QUALITY)
    }

    #[test]
    fn keeps_length_and_format() {
        let input = sine_buffer(1.0, 0.25);
        let report = render(&MasteringConfig::default(), &input, &RenderOptions::default()).unwrap();
        assert_eq!(report.output.samples.len(), input.samples.len());
        assert_eq!(report.output.format, input.format);
        assert!(report.output.samples.iter().all(|s| s.is_finite()));
        assert_eq!(report.snapshots.len(), 10);
    }

    #[test]
    fn two_pass_uses_input_loudness() {
        let input = sine_buffer(2.0, 0.1);
        let report = render(&MasteringConfig::default(), &input, &RenderOptions::default()).unwrap();
        assert_eq!(report.reference_lufs, Some(report.input_loudness.integrated_lufs));

        let single = RenderOptions {
            two_pass: false,
            ..RenderOptions::default()
        };
        let report = render(&MasteringConfig::default(), &input, &single).unwrap();
        assert_eq!(report.reference_lufs, None);
    }

    #[test]
    fn latency_compensation_aligns_output() {
        let input = sine_buffer(0.5, 0.1);
        let raw = RenderOptions {
            compensate_latency: false,
            ..RenderOptions::default()
        };
        let delayed = render(&MasteringConfig::default(), &input, &raw).unwrap();
        let aligned = render(&MasteringConfig::default(), &input, &RenderOptions::default()).unwrap();

        // The uncompensated output starts with the lookahead delay of silence
        let latency = 72 * 2;
        assert!(delayed.output.samples[..latency].iter().all(|&s| s == 0.0));
        assert_eq!(
            &aligned.output.samples[..1_000],
            &delayed.output.samples[latency..latency + 1_000]
        );
    }

    #[test]
    fn rejects_zero_block_size() {
        let input = sine_buffer(0.1, 0.1);
        let options = RenderOptions {
            block_size: 0,
            ..RenderOptions::default()
        };
        assert!(matches!(
            render(&MasteringConfig::default(), &input, &options),
            Err(EngineError::InvalidBlockSize(0))
        ));
    }

    #[test]
    fn empty_input_renders_empty() {
        let input = AudioBuffer::new(Vec::new(), sine_buffer(0.1, 0.1).format);
        let report = render(&MasteringConfig::default(), &input, &RenderOptions::default()).unwrap();

        assert!(report.output.is_empty());
        assert_eq!(report.output.format, input.format);
        assert_eq!(report.input_loudness.integrated_lufs, f64::NEG_INFINITY);
        assert_eq!(report.output_loudness.true_peak_dbtp, f64::NEG_INFINITY);
        assert_eq!(report.reference_lufs, None);
    }

    #[test]
    fn worker_thread_returns_report() {
        let input = sine_buffer(0.5, 0.2);
        let handle =
            spawn_render(MasteringConfig::default(), input.clone(), RenderOptions::default()).unwrap();
        let report = handle.join().unwrap();
        assert_eq!(report.output.samples.len(), input.samples.len());
    }
}
