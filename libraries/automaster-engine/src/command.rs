//! Staged configuration changes for a running pipeline
//!
//! The control thread validates every change through a [`PipelineController`]
//! and queues it as a [`PipelineCommand`]. The pipeline pops commands at the
//! start of the next block, so a block is always processed with one
//! consistent configuration. Heap objects that a command replaces (splitters,
//! preset payloads) travel back through a second queue as [`Retired`] values
//! and are dropped by the controller, never on the audio thread.

use automaster_core::ConfigError;
use automaster_dynamics::{BandSplitter, DynamicsError, DynamicsSettings};
use automaster_loudness::{validate_ceiling, validate_target};

use crate::error::{EngineError, Result};
use crate::preset::GenrePreset;

/// Command queue capacity
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Everything a preset load changes, prepared on the control thread
#[derive(Debug)]
pub struct PresetChange {
    /// Preset being loaded
    pub preset: GenrePreset,
    /// Splitter built for the preset's crossovers
    pub splitter: BandSplitter,
    /// Settings for every band
    pub settings: Vec<DynamicsSettings>,
    /// Preset target loudness (LUFS)
    pub target_lufs: f64,
}

/// A validated change waiting to be applied at the next block boundary
#[derive(Debug)]
pub enum PipelineCommand {
    /// Replace one band's settings
    SetBandSettings {
        band: usize,
        settings: DynamicsSettings,
    },
    /// Load a whole genre preset (splitter, band settings and target)
    LoadPreset(Box<PresetChange>),
    /// Swap in a splitter with new crossovers
    ReplaceSplitter(Box<BandSplitter>),
    /// Change the target loudness
    SetTarget(f64),
    /// Change the limiter ceiling
    SetCeiling(f64),
    /// Enable or disable automatic material timing
    SetAutoMode(bool),
    /// Set or clear the fixed reference loudness for the trim
    SetReference(Option<f64>),
    /// Mark a band as manually adjusted (or clear the mark)
    SetManualOverride { band: usize, manual: bool },
    /// Flush every filter and meter
    Reset,
}

impl PipelineCommand {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetBandSettings { .. } => "set-band-settings",
            Self::LoadPreset(_) => "load-preset",
            Self::ReplaceSplitter(_) => "replace-splitter",
            Self::SetTarget(_) => "set-target",
            Self::SetCeiling(_) => "set-ceiling",
            Self::SetAutoMode(_) => "set-auto-mode",
            Self::SetReference(_) => "set-reference",
            Self::SetManualOverride { .. } => "set-manual-override",
            Self::Reset => "reset",
        }
    }
}

/// A heap object handed back by the pipeline after a command replaced it
#[derive(Debug)]
pub enum Retired {
    /// Payload of an applied preset load, now holding the previous splitter
    Preset(Box<PresetChange>),
    /// The previous splitter
    Splitter(Box<BandSplitter>),
}

/// Create the command and retirement queues
pub(crate) fn command_channels() -> (
    (rtrb::Producer<PipelineCommand>, rtrb::Consumer<PipelineCommand>),
    (rtrb::Producer<Retired>, rtrb::Consumer<Retired>),
) {
    (
        rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY),
        // One retired object per command at most
        rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY),
    )
}

/// Control-thread handle to a running pipeline
///
/// Every method validates its input against the pipeline's layout and
/// returns the error immediately; nothing invalid ever reaches the queue.
pub struct PipelineController {
    commands: rtrb::Producer<PipelineCommand>,
    retired: rtrb::Consumer<Retired>,
    sample_rate: u32,
    channels: usize,
    band_count: usize,
}

impl PipelineController {
    pub(crate) fn new(
        commands: rtrb::Producer<PipelineCommand>,
        retired: rtrb::Consumer<Retired>,
        sample_rate: u32,
        channels: usize,
        band_count: usize,
    ) -> Self {
        Self {
            commands,
            retired,
            sample_rate,
            channels,
            band_count,
        }
    }

    /// Number of bands of the controlled pipeline
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Replace one band's settings
    pub fn set_band_settings(&mut self, band: usize, settings: DynamicsSettings) -> Result<()> {
        self.check_band(band)?;
        settings.validate()?;
        self.send(PipelineCommand::SetBandSettings { band, settings })
    }

    /// Load a genre preset
    ///
    /// The preset must have as many bands as the running pipeline.
    pub fn load_preset(&mut self, preset: GenrePreset) -> Result<()> {
        if preset.band_count() != self.band_count {
            return Err(ConfigError::BandCountMismatch {
                expected: self.band_count,
                actual: preset.band_count(),
            }
            .into());
        }
        let splitter = BandSplitter::new(self.sample_rate, self.channels, &preset.crossovers())?;
        let settings = preset.band_settings();
        for s in &settings {
            s.validate()?;
        }

        tracing::debug!(%preset, "Queueing preset load");
        self.send(PipelineCommand::LoadPreset(Box::new(PresetChange {
            preset,
            splitter,
            settings,
            target_lufs: preset.target_lufs(),
        })))
    }

    /// Move the crossovers (same band count)
    pub fn set_crossovers(&mut self, crossovers: &[f64]) -> Result<()> {
        if crossovers.len() + 1 != self.band_count {
            return Err(ConfigError::BandCountMismatch {
                expected: self.band_count,
                actual: crossovers.len() + 1,
            }
            .into());
        }
        let splitter = BandSplitter::new(self.sample_rate, self.channels, crossovers)?;
        self.send(PipelineCommand::ReplaceSplitter(Box::new(splitter)))
    }

    /// Change the target loudness
    pub fn set_target(&mut self, target_lufs: f64) -> Result<()> {
        validate_target(target_lufs)?;
        self.send(PipelineCommand::SetTarget(target_lufs))
    }

    /// Change the limiter ceiling
    pub fn set_ceiling(&mut self, ceiling_dbtp: f64) -> Result<()> {
        validate_ceiling(ceiling_dbtp)?;
        self.send(PipelineCommand::SetCeiling(ceiling_dbtp))
    }

    /// Enable or disable automatic material timing
    pub fn set_auto_mode(&mut self, enabled: bool) -> Result<()> {
        self.send(PipelineCommand::SetAutoMode(enabled))
    }

    /// Use a fixed measured loudness for the trim (`None` returns to live)
    pub fn set_reference(&mut self, reference_lufs: Option<f64>) -> Result<()> {
        if let Some(lufs) = reference_lufs {
            if !lufs.is_finite() {
                return Err(ConfigError::InvalidTarget(lufs).into());
            }
        }
        self.send(PipelineCommand::SetReference(reference_lufs))
    }

    /// Mark a band as manually adjusted (or clear the mark)
    pub fn set_manual_override(&mut self, band: usize, manual: bool) -> Result<()> {
        self.check_band(band)?;
        self.send(PipelineCommand::SetManualOverride { band, manual })
    }

    /// Flush every filter and meter at the next block
    pub fn reset(&mut self) -> Result<()> {
        self.send(PipelineCommand::Reset)
    }

    /// Free slots in the command queue
    pub fn pending_capacity(&self) -> usize {
        self.commands.slots()
    }

    /// Drop everything the pipeline handed back; returns how many objects
    /// were collected
    pub fn collect_retired(&mut self) -> usize {
        let mut collected = 0;
        while let Ok(retired) = self.retired.pop() {
            match &retired {
                Retired::Preset(change) => {
                    tracing::debug!(preset = %change.preset, "Preset applied");
                }
                Retired::Splitter(splitter) => {
                    tracing::debug!(crossovers = ?splitter.crossovers(), "Splitter retired");
                }
            }
            collected += 1;
        }
        collected
    }

    fn check_band(&self, band: usize) -> Result<()> {
        if band < self.band_count {
            Ok(())
        } else {
            Err(DynamicsError::BandIndex {
                index: band,
                count: self.band_count,
            }
            .into())
        }
    }

    fn send(&mut self, command: PipelineCommand) -> Result<()> {
        self.commands
            .push(command)
            .map_err(|_| EngineError::QueueFull { queue: "command" })
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("band_count", &self.band_count)
            .finish_non_exhaustive()
    }
}
