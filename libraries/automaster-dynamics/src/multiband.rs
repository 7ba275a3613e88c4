//! Multiband compressor: split, compress each band, sum

use automaster_core::{ConfigError, MAX_CHANNELS};

use crate::compressor::{BandCompressor, CompressorState};
use crate::error::{DynamicsError, Result};
use crate::settings::DynamicsSettings;
use crate::splitter::BandSplitter;
use crate::MAX_BANDS;

/// One frequency band of the multiband processor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Display name derived from the band's range
    pub name: &'static str,
    /// Lower edge in Hz (inclusive)
    pub low_hz: f64,
    /// Upper edge in Hz (exclusive)
    pub high_hz: f64,
    /// Dynamics settings
    pub settings: DynamicsSettings,
    /// Manually adjusted bands ignore material recommendations
    pub manual_override: bool,
}

/// Pick a display name from the upper edge of a band
pub fn band_name(high_hz: f64) -> &'static str {
    match high_hz {
        f if f <= 100.0 => "Sub",
        f if f <= 300.0 => "Bass",
        f if f <= 800.0 => "Low-Mid",
        f if f <= 2_500.0 => "Mid",
        f if f <= 7_000.0 => "Upper-Mid",
        f if f <= 13_000.0 => "Presence",
        _ => "Air",
    }
}

/// Multiband compressor
///
/// Owns the band splitter, one [`BandCompressor`] per band and the band
/// settings. Band count and channel count are fixed at construction; all
/// per-frame scratch lives on the stack, so processing never allocates.
#[derive(Debug, Clone)]
pub struct MultibandCompressor {
    splitter: BandSplitter,
    bands: Vec<Band>,
    compressors: Vec<BandCompressor>,
}

impl MultibandCompressor {
    /// Create a processor for the given layout and per-band settings
    pub fn new(
        sample_rate: u32,
        channels: usize,
        crossovers: &[f64],
        settings: &[DynamicsSettings],
    ) -> Result<Self> {
        let splitter = BandSplitter::new(sample_rate, channels, crossovers)?;
        Self::with_splitter(splitter, settings)
    }

    /// Create a processor around an existing splitter
    pub fn with_splitter(splitter: BandSplitter, settings: &[DynamicsSettings]) -> Result<Self> {
        check_settings(splitter.band_count(), settings)?;

        let bands = splitter
            .band_ranges()
            .into_iter()
            .zip(settings.iter())
            .map(|((low_hz, high_hz), &settings)| Band {
                name: band_name(high_hz),
                low_hz,
                high_hz,
                settings,
                manual_override: false,
            })
            .collect();
        let compressors = (0..splitter.band_count())
            .map(|_| BandCompressor::new(splitter.sample_rate()))
            .collect();

        Ok(Self {
            splitter,
            bands,
            compressors,
        })
    }

    /// Process one frame in place (one f64 sample per channel)
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f64]) {
        let channels = frame.len().min(self.splitter.channels());
        let band_count = self.bands.len();
        let mut split = [[0.0_f64; MAX_BANDS]; MAX_CHANNELS];

        for (ch, bands) in split.iter_mut().enumerate().take(channels) {
            self.splitter.split(ch, frame[ch], bands);
        }

        let mut band_frame = [0.0_f64; MAX_CHANNELS];
        for (b, (compressor, band)) in self
            .compressors
            .iter_mut()
            .zip(self.bands.iter())
            .enumerate()
        {
            for (dst, bands) in band_frame.iter_mut().zip(split.iter()).take(channels) {
                *dst = bands[b];
            }
            compressor.process_frame(&mut band_frame[..channels], &band.settings);
            for (src, bands) in band_frame.iter().zip(split.iter_mut()).take(channels) {
                bands[b] = *src;
            }
        }

        for (sample, bands) in frame.iter_mut().zip(split.iter()).take(channels) {
            *sample = bands[..band_count].iter().sum();
        }
    }

    /// Process interleaved f32 samples in place
    pub fn process_interleaved(&mut self, samples: &mut [f32]) {
        let channels = self.splitter.channels();
        let mut frame = [0.0_f64; MAX_CHANNELS];
        for chunk in samples.chunks_exact_mut(channels) {
            for (dst, &src) in frame.iter_mut().zip(chunk.iter()) {
                *dst = f64::from(src);
            }
            self.process_frame(&mut frame[..channels]);
            for (dst, &src) in chunk.iter_mut().zip(frame.iter()) {
                *dst = src as f32;
            }
        }
    }

    /// Replace the settings of one band
    pub fn set_band_settings(&mut self, index: usize, settings: DynamicsSettings) -> Result<()> {
        settings.validate()?;
        let count = self.bands.len();
        let band = self
            .bands
            .get_mut(index)
            .ok_or(DynamicsError::BandIndex { index, count })?;
        band.settings = settings;
        Ok(())
    }

    /// Replace the settings of every band at once
    ///
    /// Nothing changes unless all settings are valid and the count matches.
    pub fn set_all_settings(&mut self, settings: &[DynamicsSettings]) -> Result<()> {
        check_settings(self.bands.len(), settings)?;
        for (band, &settings) in self.bands.iter_mut().zip(settings.iter()) {
            band.settings = settings;
        }
        Ok(())
    }

    /// Mark a band as manually adjusted (or clear the mark)
    pub fn set_manual_override(&mut self, index: usize, manual: bool) -> Result<()> {
        let count = self.bands.len();
        let band = self
            .bands
            .get_mut(index)
            .ok_or(DynamicsError::BandIndex { index, count })?;
        band.manual_override = manual;
        Ok(())
    }

    /// Apply recommended attack/release times to every band without a manual
    /// override, returning how many bands changed
    pub fn apply_timing(&mut self, attack_s: f64, release_s: f64) -> Result<usize> {
        DynamicsSettings::new()
            .with_timing(attack_s, release_s)
            .validate()?;

        let mut updated = 0;
        for band in self.bands.iter_mut().filter(|band| !band.manual_override) {
            let settings = band.settings.with_timing(attack_s, release_s);
            if settings != band.settings {
                band.settings = settings;
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Swap in a splitter with different crossovers
    ///
    /// The band count, channel count and sample rate must match the current
    /// layout. Returns the previous splitter so the caller decides where it is
    /// dropped.
    pub fn replace_splitter(&mut self, mut splitter: BandSplitter) -> Result<BandSplitter> {
        self.swap_splitter(&mut splitter)?;
        Ok(splitter)
    }

    /// Exchange the current splitter with `splitter` in place
    ///
    /// On success `splitter` holds the previous one. Nothing is allocated or
    /// dropped, so this is safe to call from the audio thread.
    pub fn swap_splitter(&mut self, splitter: &mut BandSplitter) -> Result<()> {
        self.check_splitter(splitter)?;
        std::mem::swap(&mut self.splitter, splitter);
        for (index, band) in self.bands.iter_mut().enumerate() {
            if let Some((low_hz, high_hz)) = self.splitter.band_range(index) {
                band.low_hz = low_hz;
                band.high_hz = high_hz;
                band.name = band_name(high_hz);
            }
        }
        Ok(())
    }

    /// Check that a splitter can replace the current one
    pub fn check_splitter(&self, splitter: &BandSplitter) -> Result<()> {
        if splitter.band_count() != self.bands.len() {
            return Err(ConfigError::BandCountMismatch {
                expected: self.bands.len(),
                actual: splitter.band_count(),
            }
            .into());
        }
        if splitter.channels() != self.splitter.channels() {
            return Err(ConfigError::InvalidChannelCount(splitter.channels()).into());
        }
        if splitter.sample_rate() != self.splitter.sample_rate() {
            return Err(ConfigError::InvalidSampleRate(splitter.sample_rate()).into());
        }
        Ok(())
    }

    /// Gain reduction of one band in dB (0 for unknown bands)
    pub fn gain_reduction_db(&self, band: usize) -> f64 {
        self.compressors
            .get(band)
            .map_or(0.0, BandCompressor::gain_reduction_db)
    }

    /// Copy per-band gain reduction into `out`, returning how many were written
    pub fn gain_reductions(&self, out: &mut [f64]) -> usize {
        let mut written = 0;
        for (dst, compressor) in out.iter_mut().zip(self.compressors.iter()) {
            *dst = compressor.gain_reduction_db();
            written += 1;
        }
        written
    }

    /// State of one band's compressor
    pub fn band_state(&self, band: usize) -> Option<CompressorState> {
        self.compressors.get(band).map(BandCompressor::state)
    }

    /// Bands with their current settings
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.splitter.channels()
    }

    /// The current splitter
    pub fn splitter(&self) -> &BandSplitter {
        &self.splitter
    }

    /// Flush filter and envelope state
    pub fn reset(&mut self) {
        self.splitter.reset();
        for compressor in &mut self.compressors {
            compressor.reset();
        }
    }
}

fn check_settings(band_count: usize, settings: &[DynamicsSettings]) -> Result<()> {
    if settings.len() != band_count {
        return Err(ConfigError::BandCountMismatch {
            expected: band_count,
            actual: settings.len(),
        }
        .into());
    }
    for settings in settings {
        settings.validate()?;
    }
    Ok(())
}
