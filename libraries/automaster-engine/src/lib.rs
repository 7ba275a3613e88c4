//! Automaster Engine
//!
//! The mastering orchestrator built on the loudness and dynamics crates:
//! - **Pipeline**: metering and processing of every frame in one loop
//!   (multiband dynamics, loudness trim, true-peak limiting)
//! - **Material classification**: transient density and crest factor pick
//!   attack/release recommendations
//! - **Presets and configuration**: genre layouts, serde-friendly settings
//! - **Metering**: snapshots and diagnostics published over lock-free queues
//! - **Commands**: validated configuration changes applied between blocks
//! - **Offline rendering**: whole buffers, optionally two-pass, on a worker
//!   thread
//!
//! # Example
//!
//! ```rust
//! use automaster_core::{test_utils::generate_sine, AudioBuffer, SampleRate};
//! use automaster_engine::{render, GenrePreset, MasteringConfig, RenderOptions};
//!
//! let left = generate_sine(440.0, 48_000, 1.0, 0.1, 1);
//! let input = AudioBuffer::from_planar(&[left.as_slice(), left.as_slice()], SampleRate::DVD_QUALITY);
//!
//! let config = MasteringConfig::from_preset(GenrePreset::Pop);
//! let report = render(&config, &input, &RenderOptions::default())?;
//! assert_eq!(report.output.samples.len(), input.samples.len());
//! # Ok::<(), automaster_engine::EngineError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
mod command;
mod config;
mod error;
pub mod metering;
mod pipeline;
mod preset;
mod render;

pub use classifier::{MaterialClassification, MaterialClassifier, MaterialType};
pub use command::{PipelineCommand, PipelineController, PresetChange, Retired, COMMAND_QUEUE_CAPACITY};
pub use config::{MasteringConfig, DEFAULT_METERING_INTERVAL_MS};
pub use error::{EngineError, Result};
pub use metering::{metering_channel, DiagnosticEvent, MeterReceiver, MeteringSnapshot};
pub use pipeline::{MasteringPipeline, PipelineParts};
pub use preset::GenrePreset;
pub use render::{render, spawn_render, RenderHandle, RenderOptions, RenderReport, DEFAULT_BLOCK_SIZE};
