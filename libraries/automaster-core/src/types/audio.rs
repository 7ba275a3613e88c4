/// Audio-related types
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);
    pub const HIGH_RES_96: Self = Self(96_000);
    pub const HIGH_RES_192: Self = Self(192_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }

    /// Nyquist frequency in Hz
    pub fn nyquist(&self) -> f64 {
        f64::from(self.0) / 2.0
    }

    /// Number of whole frames covering `secs` seconds (rounded to nearest)
    pub fn frames_for(&self, secs: f64) -> usize {
        (f64::from(self.0) * secs).round() as usize
    }
}

/// Audio format information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate
    pub sample_rate: SampleRate,

    /// Number of channels (1 = mono, 2 = stereo, 6 = 5.1)
    pub channels: u16,

    /// Bits per sample of the source material (informational)
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Create a new audio format
    pub fn new(sample_rate: SampleRate, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// 48 kHz stereo 32-bit float, the mastering working format
    pub fn studio() -> Self {
        Self {
            sample_rate: SampleRate::DVD_QUALITY,
            channels: 2,
            bits_per_sample: 32,
        }
    }

    /// Channel count as `usize`
    pub fn channel_count(&self) -> usize {
        usize::from(self.channels)
    }
}

/// Audio buffer holding f32 samples
///
/// Samples are nominally in [-1.0, 1.0].
/// Interleaved format: [L, R, L, R, ...] for stereo
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Audio samples (f32, interleaved)
    pub samples: Vec<f32>,

    /// Audio format information
    pub format: AudioFormat,
}

impl AudioBuffer {
    /// Create a new audio buffer
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// Create an empty audio buffer with a given capacity
    pub fn with_capacity(capacity: usize, format: AudioFormat) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            format,
        }
    }

    /// Build an interleaved buffer from per-channel slices of equal length
    ///
    /// Channels shorter than the first one are padded with silence.
    pub fn from_planar(channels: &[&[f32]], sample_rate: SampleRate) -> Self {
        let frames = channels.first().map_or(0, |c| c.len());
        let mut samples = Vec::with_capacity(frames * channels.len());
        for frame in 0..frames {
            for channel in channels {
                samples.push(channel.get(frame).copied().unwrap_or(0.0));
            }
        }
        Self {
            samples,
            format: AudioFormat::new(sample_rate, channels.len() as u16, 32),
        }
    }

    /// Split the interleaved samples into one vector per channel
    pub fn to_planar(&self) -> Vec<Vec<f32>> {
        let channels = self.format.channel_count().max(1);
        let mut planar = vec![Vec::with_capacity(self.frames()); channels];
        for frame in self.samples.chunks_exact(channels) {
            for (channel, &sample) in planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        planar
    }

    /// Get the number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.samples.len() / usize::from(channels),
        }
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.format.sample_rate.as_hz())
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
