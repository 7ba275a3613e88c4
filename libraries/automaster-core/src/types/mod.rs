//! Audio buffer and format types

mod audio;

pub use audio::{AudioBuffer, AudioFormat, SampleRate};
