//! The mastering pipeline
//!
//! One [`MasteringPipeline`] owns every piece of state for a session. Each
//! frame is seen by two branches inside the same loop:
//!
//! ```text
//!                 +-> K-weighting -> loudness meter -> trim target
//!                 +-> true-peak detector, phase correlation, classifier
//! input -> sanitize
//!                 +-> band splitter -> band compressors -> sum
//!                          -> loudness trim -> true-peak limiter -> output
//! ```
//!
//! The metering branch observes the input; the processing branch rewrites
//! the frame in place. Configuration changes arrive as commands that are
//! applied at the start of a block. Nothing in `process_*` allocates, locks
//! or blocks.

use automaster_core::{linear_to_db, sanitize_in_place, validate_stream, MAX_CHANNELS};
use automaster_dynamics::{Band, DynamicsSettings, MultibandCompressor};
use automaster_loudness::{LoudnessMeter, TargetTrim, TruePeakDetector, TruePeakLimiter};
use std::time::Instant;

use crate::classifier::{MaterialClassification, MaterialClassifier, DEFAULT_INTERVAL_SECONDS};
use crate::command::{command_channels, PipelineCommand, PipelineController, Retired};
use crate::config::MasteringConfig;
use crate::error::Result;
use crate::metering::{
    metering_channel, DiagnosticEvent, MeterPublisher, MeterReceiver, MeteringSnapshot,
    PhaseCorrelation, SNAPSHOT_QUEUE_CAPACITY,
};

/// A pipeline together with its control and metering handles
#[derive(Debug)]
pub struct PipelineParts {
    /// The pipeline itself, owned by the audio thread
    pub pipeline: MasteringPipeline,
    /// Queues validated configuration changes
    pub controller: PipelineController,
    /// Receives snapshots and diagnostics
    pub receiver: MeterReceiver,
}

/// Real-time mastering processor
///
/// # Example
///
/// ```
/// use automaster_engine::{MasteringConfig, MasteringPipeline};
///
/// let parts = MasteringPipeline::new(&MasteringConfig::default(), 48_000, 2)?;
/// let mut pipeline = parts.pipeline;
/// let mut receiver = parts.receiver;
///
/// let mut block = vec![0.0f32; 2 * 4_800];
/// pipeline.process_interleaved(&mut block);
///
/// let snapshot = receiver.latest().expect("one snapshot per 100 ms");
/// assert_eq!(snapshot.position_frames, 4_800);
/// # Ok::<(), automaster_engine::EngineError>(())
/// ```
pub struct MasteringPipeline {
    sample_rate: u32,
    channels: usize,

    // Metering branch
    meter: LoudnessMeter,
    input_peak: TruePeakDetector,
    correlation: PhaseCorrelation,
    classifier: MaterialClassifier,
    /// Linear input true peak over the current classifier interval
    interval_peak: f32,

    // Processing branch
    dynamics: MultibandCompressor,
    trim: TargetTrim,
    limiter: TruePeakLimiter,
    output_peak: TruePeakDetector,
    auto_material: bool,

    frames_per_snapshot: u64,
    frames_until_snapshot: u64,
    position_frames: u64,
    sanitized_samples: u64,
    late_blocks: u64,
    deadline_monitoring: bool,

    commands: rtrb::Consumer<PipelineCommand>,
    retired: rtrb::Producer<Retired>,
    publisher: MeterPublisher,
}

impl MasteringPipeline {
    /// Build a pipeline for `channels` channels at `sample_rate`
    ///
    /// The configuration is validated first; an empty band layout is filled
    /// in from the genre preset.
    pub fn new(config: &MasteringConfig, sample_rate: u32, channels: usize) -> Result<PipelineParts> {
        validate_stream(sample_rate, channels)?;
        config.validate(sample_rate)?;
        let config = config.resolved();

        let dynamics = MultibandCompressor::new(
            sample_rate,
            channels,
            &config.band_crossovers,
            &config.band_settings,
        )?;
        let trim = TargetTrim::new(sample_rate, config.target_lufs)?;
        let mut limiter = TruePeakLimiter::new(sample_rate, channels);
        limiter.set_ceiling_dbtp(config.true_peak_ceiling_dbtp)?;

        let ((command_tx, command_rx), (retired_tx, retired_rx)) = command_channels();
        let (publisher, receiver) = metering_channel(SNAPSHOT_QUEUE_CAPACITY);

        let frames_per_snapshot =
            ((u64::from(sample_rate) * u64::from(config.metering_interval_ms)) / 1000).max(1);
        let band_count = dynamics.band_count();

        tracing::info!(
            sample_rate,
            channels,
            bands = band_count,
            preset = ?config.genre_preset,
            target_lufs = config.target_lufs,
            ceiling_dbtp = config.true_peak_ceiling_dbtp,
            "Mastering pipeline ready"
        );

        let pipeline = Self {
            sample_rate,
            channels,
            meter: LoudnessMeter::new(sample_rate, channels)?,
            input_peak: TruePeakDetector::new(channels),
            correlation: PhaseCorrelation::new(),
            classifier: MaterialClassifier::new(sample_rate, channels, DEFAULT_INTERVAL_SECONDS),
            interval_peak: 0.0,
            dynamics,
            trim,
            limiter,
            output_peak: TruePeakDetector::new(channels),
            auto_material: config.auto_material_detection,
            frames_per_snapshot,
            frames_until_snapshot: frames_per_snapshot,
            position_frames: 0,
            sanitized_samples: 0,
            late_blocks: 0,
            deadline_monitoring: config.deadline_monitoring,
            commands: command_rx,
            retired: retired_tx,
            publisher,
        };

        Ok(PipelineParts {
            pipeline,
            controller: PipelineController::new(
                command_tx,
                retired_rx,
                sample_rate,
                channels,
                band_count,
            ),
            receiver,
        })
    }

    /// Process interleaved audio in place
    ///
    /// A block that is not a whole number of frames is zeroed and reported.
    pub fn process_interleaved(&mut self, samples: &mut [f32]) {
        let started = self.deadline_monitoring.then(Instant::now);
        self.apply_commands();

        if samples.len() % self.channels != 0 {
            samples.fill(0.0);
            self.publisher.report(DiagnosticEvent::ChannelMismatch {
                expected: self.channels,
                actual: samples.len(),
            });
            return;
        }

        let sanitized = sanitize_in_place(samples);
        self.record_sanitized(sanitized);

        let frames = samples.len() / self.channels;
        for frame in samples.chunks_exact_mut(self.channels) {
            self.process_frame(frame);
        }

        if let Some(started) = started {
            self.check_deadline(started, frames);
        }
    }

    /// Process one slice per channel in place
    ///
    /// The number of slices must match the channel count and every slice must
    /// have the same length; otherwise the block is zeroed and reported.
    pub fn process_planar(&mut self, channels: &mut [&mut [f32]]) {
        let started = self.deadline_monitoring.then(Instant::now);
        self.apply_commands();

        let frames = channels.first().map_or(0, |ch| ch.len());
        if channels.len() != self.channels || channels.iter().any(|ch| ch.len() != frames) {
            for channel in channels.iter_mut() {
                channel.fill(0.0);
            }
            self.publisher.report(DiagnosticEvent::ChannelMismatch {
                expected: self.channels,
                actual: channels.len(),
            });
            return;
        }

        let sanitized: usize = channels
            .iter_mut()
            .map(|channel| sanitize_in_place(channel))
            .sum();
        self.record_sanitized(sanitized);

        let mut frame = [0.0f32; MAX_CHANNELS];
        for index in 0..frames {
            for (slot, channel) in frame.iter_mut().zip(channels.iter()) {
                *slot = channel[index];
            }
            self.process_frame(&mut frame[..self.channels]);
            for (slot, channel) in frame.iter().zip(channels.iter_mut()) {
                channel[index] = *slot;
            }
        }

        if let Some(started) = started {
            self.check_deadline(started, frames);
        }
    }

    #[inline]
    fn process_frame(&mut self, frame: &mut [f32]) {
        // Metering branch (input)
        if self.meter.process_frame(frame).is_some() {
            self.trim.update(self.meter.integrated_lufs());
        }
        let peak = self.input_peak.interpolated_peak(frame);
        self.interval_peak = self.interval_peak.max(peak);

        let left = f64::from(frame[0]);
        let right = frame.get(1).map_or(left, |&s| f64::from(s));
        self.correlation.push(left, right);

        if self.classifier.push_frame(frame) {
            self.close_classifier_interval();
        }

        // Processing branch
        let mut work = [0.0f64; MAX_CHANNELS];
        let work = &mut work[..frame.len()];
        for (w, &s) in work.iter_mut().zip(frame.iter()) {
            *w = f64::from(s);
        }
        self.dynamics.process_frame(work);

        let gain = f64::from(self.trim.next_gain());
        for (s, &w) in frame.iter_mut().zip(work.iter()) {
            *s = (w * gain) as f32;
        }
        self.limiter.process_frame(frame);
        self.output_peak.interpolated_peak(frame);

        self.position_frames += 1;
        self.frames_until_snapshot -= 1;
        if self.frames_until_snapshot == 0 {
            self.frames_until_snapshot = self.frames_per_snapshot;
            self.correlation.finish();
            let snapshot = self.snapshot();
            self.publisher.publish(snapshot);
        }
    }

    fn close_classifier_interval(&mut self) {
        // Not finite until short-term loudness is available; never promotes then
        let crest_factor_db =
            linear_to_db(f64::from(self.interval_peak)) - self.meter.short_term_lufs();
        let classification = self.classifier.finish_interval(crest_factor_db);
        self.interval_peak = 0.0;

        if self.auto_material {
            // Recommended timings are always in range
            let _ = self.dynamics.apply_timing(
                classification.recommended_attack_s,
                classification.recommended_release_s,
            );
        }
    }

    fn record_sanitized(&mut self, count: usize) {
        if count > 0 {
            self.sanitized_samples += count as u64;
            self.publisher.report(DiagnosticEvent::NonFiniteSamples {
                count,
                position_frames: self.position_frames,
            });
        }
    }

    fn check_deadline(&mut self, started: Instant, frames: usize) {
        let budget_us = frames as u64 * 1_000_000 / u64::from(self.sample_rate);
        let elapsed_us = started.elapsed().as_micros() as u64;
        if elapsed_us > budget_us {
            self.late_blocks += 1;
            self.publisher.report(DiagnosticEvent::LateBlock {
                elapsed_us,
                budget_us,
            });
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: PipelineCommand) {
        let name = command.name();
        let applied = match command {
            PipelineCommand::SetBandSettings { band, settings } => {
                self.dynamics.set_band_settings(band, settings).is_ok()
            }
            PipelineCommand::LoadPreset(mut change) => {
                let applied = self.dynamics.swap_splitter(&mut change.splitter).is_ok()
                    && self.dynamics.set_all_settings(&change.settings).is_ok()
                    && self.trim.set_target(change.target_lufs).is_ok();
                self.trim.update(self.meter.integrated_lufs());
                self.retire(Retired::Preset(change));
                applied
            }
            PipelineCommand::ReplaceSplitter(mut splitter) => {
                let applied = self.dynamics.swap_splitter(&mut splitter).is_ok();
                self.retire(Retired::Splitter(splitter));
                applied
            }
            PipelineCommand::SetTarget(target_lufs) => {
                let applied = self.trim.set_target(target_lufs).is_ok();
                self.trim.update(self.meter.integrated_lufs());
                applied
            }
            PipelineCommand::SetCeiling(ceiling_dbtp) => {
                self.limiter.set_ceiling_dbtp(ceiling_dbtp).is_ok()
            }
            PipelineCommand::SetAutoMode(enabled) => {
                self.auto_material = enabled;
                true
            }
            PipelineCommand::SetReference(reference_lufs) => {
                self.trim.set_reference(reference_lufs);
                self.trim.update(self.meter.integrated_lufs());
                true
            }
            PipelineCommand::SetManualOverride { band, manual } => {
                self.dynamics.set_manual_override(band, manual).is_ok()
            }
            PipelineCommand::Reset => {
                self.reset();
                true
            }
        };

        if !applied {
            self.publisher
                .report(DiagnosticEvent::RejectedCommand { command: name });
        }
    }

    fn retire(&mut self, retired: Retired) {
        // A full queue means the controller stopped collecting; the object
        // is then dropped here
        let _ = self.retired.push(retired);
    }

    /// Current meter readings
    ///
    /// Phase correlation is that of the last completed metering interval.
    pub fn snapshot(&self) -> MeteringSnapshot {
        let mut snapshot = MeteringSnapshot::empty(self.dynamics.band_count());
        snapshot.integrated_lufs = self.meter.integrated_lufs();
        snapshot.short_term_lufs = self.meter.short_term_lufs();
        snapshot.momentary_lufs = self.meter.momentary_lufs();
        snapshot.true_peak_dbtp = self.input_peak.true_peak_dbtp();
        snapshot.phase_correlation = self.correlation.value();
        snapshot.band_count = self
            .dynamics
            .gain_reductions(&mut snapshot.band_gain_reduction_db);
        snapshot.output_true_peak_dbtp = self.output_peak.true_peak_dbtp();
        snapshot.trim_db = self.trim.current_gain_db();
        snapshot.limiter_gain_reduction_db = self.limiter.gain_reduction_db();
        snapshot.loudness_range_lu = self.meter.loudness_range_lu();
        snapshot.material = self.classifier.last();
        snapshot.sanitized_samples = self.sanitized_samples;
        snapshot.late_blocks = self.late_blocks;
        snapshot.dropped_snapshots = self.publisher.dropped_snapshots();
        snapshot.position_frames = self.position_frames;
        snapshot
    }

    /// Flush every filter, meter and counter
    ///
    /// Target, ceiling, band settings and the reference loudness are kept.
    pub fn reset(&mut self) {
        self.meter.reset();
        self.input_peak.reset();
        self.correlation.reset();
        self.classifier.reset();
        self.interval_peak = 0.0;
        self.dynamics.reset();
        self.trim.reset();
        self.trim.update(self.meter.integrated_lufs());
        self.limiter.reset();
        self.output_peak.reset();
        self.frames_until_snapshot = self.frames_per_snapshot;
        self.position_frames = 0;
        self.sanitized_samples = 0;
        self.late_blocks = 0;
    }

    /// Delay from input to output in frames
    pub fn latency_samples(&self) -> usize {
        self.limiter.latency_samples()
    }

    /// Change the target loudness directly (owner thread only)
    pub fn set_target(&mut self, target_lufs: f64) -> Result<()> {
        self.trim.set_target(target_lufs)?;
        self.trim.update(self.meter.integrated_lufs());
        Ok(())
    }

    /// Change the limiter ceiling directly (owner thread only)
    pub fn set_ceiling(&mut self, ceiling_dbtp: f64) -> Result<()> {
        self.limiter.set_ceiling_dbtp(ceiling_dbtp)?;
        Ok(())
    }

    /// Use a fixed measured loudness for the trim (owner thread only)
    pub fn set_reference(&mut self, reference_lufs: Option<f64>) {
        self.trim.set_reference(reference_lufs);
        self.trim.update(self.meter.integrated_lufs());
    }

    /// Replace one band's settings directly (owner thread only)
    pub fn set_band_settings(&mut self, band: usize, settings: DynamicsSettings) -> Result<()> {
        self.dynamics.set_band_settings(band, settings)?;
        Ok(())
    }

    /// Enable or disable automatic material timing
    pub fn set_auto_mode(&mut self, enabled: bool) {
        self.auto_material = enabled;
    }

    /// Whether material recommendations are applied
    pub fn auto_mode(&self) -> bool {
        self.auto_material
    }

    /// Latest material classification
    pub fn classification(&self) -> Option<MaterialClassification> {
        self.classifier.last()
    }

    /// Bands with their current settings
    pub fn bands(&self) -> &[Band] {
        self.dynamics.bands()
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.dynamics.band_count()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames processed since construction or the last reset
    pub fn position_frames(&self) -> u64 {
        self.position_frames
    }

    /// Target loudness in LUFS
    pub fn target_lufs(&self) -> f64 {
        self.trim.target_lufs()
    }
}

impl std::fmt::Debug for MasteringPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasteringPipeline")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("bands", &self.dynamics.band_count())
            .field("target_lufs", &self.trim.target_lufs())
            .field("ceiling_dbtp", &self.limiter.ceiling_dbtp())
            .field("auto_material", &self.auto_material)
            .field("position_frames", &self.position_frames)
            .finish_non_exhaustive()
    }
}
