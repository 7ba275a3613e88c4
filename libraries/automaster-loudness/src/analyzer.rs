//! Offline loudness analysis
//!
//! Runs a whole program through the BS.1770 meter and the true-peak
//! detector and summarizes it. It measures:
//! - Integrated loudness (LUFS) - the overall perceived loudness
//! - Loudness range (LRA) - the variation in loudness
//! - Maximum momentary and short-term loudness
//! - True peak (dBTP) - the maximum inter-sample peak level
//! - Sample peak (dBFS) - the maximum sample value

use crate::error::{LoudnessError, Result};
use crate::meter::LoudnessMeter;
use crate::true_peak::TruePeakDetector;
use crate::LUFS_FLOOR;
use std::fmt;
use tracing::debug;

/// Information about the loudness characteristics of a program
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessInfo {
    /// Integrated loudness in LUFS (floor for silent material)
    pub integrated_lufs: f64,

    /// Loudness range in LU
    /// Measures the variation in loudness - lower values indicate more compressed audio
    pub loudness_range_lu: f64,

    /// Highest momentary (400 ms) loudness in LUFS
    pub max_momentary_lufs: f64,

    /// Highest short-term (3 s) loudness in LUFS
    pub max_short_term_lufs: f64,

    /// True peak in dBTP (4x oversampled)
    pub true_peak_dbtp: f64,

    /// Sample peak in dBFS (not accounting for inter-sample peaks)
    pub sample_peak_dbfs: f64,

    /// Duration of the analyzed audio in seconds
    pub duration_seconds: f64,

    /// Sample rate of the analyzed audio
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u32,
}

impl LoudnessInfo {
    /// Summary of a program with no audio: every level at the floor
    pub fn empty(sample_rate: u32, channels: u32) -> Self {
        Self {
            integrated_lufs: LUFS_FLOOR,
            loudness_range_lu: 0.0,
            max_momentary_lufs: LUFS_FLOOR,
            max_short_term_lufs: LUFS_FLOOR,
            true_peak_dbtp: f64::NEG_INFINITY,
            sample_peak_dbfs: f64::NEG_INFINITY,
            duration_seconds: 0.0,
            sample_rate,
            channels,
        }
    }

    /// True when no block rose above the absolute gate
    pub fn is_silent(&self) -> bool {
        self.integrated_lufs == LUFS_FLOOR
    }

    /// Check if the audio would exceed `ceiling_dbtp` after applying gain
    pub fn will_clip_at_gain(&self, gain_db: f64, ceiling_dbtp: f64) -> bool {
        self.true_peak_dbtp + gain_db > ceiling_dbtp
    }

    /// Largest gain that keeps the true peak at or below `ceiling_dbtp`
    pub fn max_safe_gain(&self, ceiling_dbtp: f64) -> f64 {
        ceiling_dbtp - self.true_peak_dbtp
    }

    /// Peak-to-loudness ratio (true peak minus integrated loudness)
    pub fn peak_to_loudness_ratio(&self) -> Option<f64> {
        let plr = self.true_peak_dbtp - self.integrated_lufs;
        plr.is_finite().then_some(plr)
    }
}

impl fmt::Display for LoudnessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loudness: {:.1} LUFS, Range: {:.1} LU, True Peak: {:.1} dBTP, Sample Peak: {:.1} dBFS",
            self.integrated_lufs,
            self.loudness_range_lu,
            self.true_peak_dbtp,
            self.sample_peak_dbfs
        )
    }
}

/// Whole-program loudness analyzer
///
/// # Example
///
/// ```
/// use automaster_loudness::LoudnessAnalyzer;
///
/// let mut analyzer = LoudnessAnalyzer::new(44_100, 2)?;
/// analyzer.add_frames(&vec![0.0; 44_100 * 2])?;
/// let info = analyzer.finalize()?;
/// assert!(info.is_silent());
/// # Ok::<(), automaster_loudness::LoudnessError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LoudnessAnalyzer {
    meter: LoudnessMeter,
    peaks: TruePeakDetector,
    sample_rate: u32,
    channels: u32,
    samples_processed: usize,
}

impl LoudnessAnalyzer {
    /// Create a new loudness analyzer
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz (8000-384000)
    /// * `channels` - Number of channels (1-8)
    pub fn new(sample_rate: u32, channels: u32) -> Result<Self> {
        let meter = LoudnessMeter::new(sample_rate, channels as usize)?;

        Ok(Self {
            meter,
            peaks: TruePeakDetector::new(channels as usize),
            sample_rate,
            channels,
            samples_processed: 0,
        })
    }

    /// Add interleaved f32 samples (-1.0 to 1.0)
    pub fn add_frames(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.check_frames(samples.len())?;

        for frame in samples.chunks_exact(self.channels as usize) {
            self.meter.process_frame(frame);
            self.peaks.interpolated_peak(frame);
        }
        self.samples_processed += samples.len();

        Ok(())
    }

    /// Add interleaved i16 samples
    pub fn add_frames_i16(&mut self, samples: &[i16]) -> Result<()> {
        self.add_scaled(samples, |s| f32::from(s) / 32_768.0)
    }

    fn add_scaled<T: Copy>(&mut self, samples: &[T], convert: impl Fn(T) -> f32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.check_frames(samples.len())?;

        let mut frame = [0.0f32; automaster_core::MAX_CHANNELS];
        let channels = self.channels as usize;
        for chunk in samples.chunks_exact(channels) {
            for (dst, &src) in frame.iter_mut().zip(chunk) {
                *dst = convert(src);
            }
            self.meter.process_frame(&frame[..channels]);
            self.peaks.interpolated_peak(&frame[..channels]);
        }
        self.samples_processed += samples.len();

        Ok(())
    }

    fn check_frames(&self, len: usize) -> Result<()> {
        if len % self.channels as usize != 0 {
            return Err(LoudnessError::IncompleteFrame {
                samples: len,
                channels: self.channels as usize,
            });
        }
        Ok(())
    }

    /// Summarize everything added so far
    ///
    /// # Errors
    /// Returns `NoSamples` if nothing was added
    pub fn finalize(self) -> Result<LoudnessInfo> {
        let info = self.snapshot()?;
        debug!("Analysis complete: {}", info);
        Ok(info)
    }

    /// Summarize without consuming the analyzer
    pub fn snapshot(&self) -> Result<LoudnessInfo> {
        if self.samples_processed == 0 {
            return Err(LoudnessError::NoSamples);
        }

        let frames = self.samples_processed / self.channels as usize;

        Ok(LoudnessInfo {
            integrated_lufs: self.meter.integrated_lufs(),
            loudness_range_lu: self.meter.loudness_range_lu(),
            max_momentary_lufs: self.meter.max_momentary_lufs(),
            max_short_term_lufs: self.meter.max_short_term_lufs(),
            true_peak_dbtp: self.peaks.true_peak_dbtp(),
            sample_peak_dbfs: self.peaks.sample_peak_dbfs(),
            duration_seconds: frames as f64 / f64::from(self.sample_rate),
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    /// Get the number of samples processed
    pub fn samples_processed(&self) -> usize {
        self.samples_processed
    }

    /// Reset the analyzer for reuse
    pub fn reset(&mut self) {
        self.meter.reset();
        self.peaks.reset();
        self.samples_processed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaster_core::test_utils::generate_sine_at_dbfs;

    #[test]
    fn test_empty_info_is_at_the_floor() {
        let info = LoudnessInfo::empty(48_000, 2);
        assert!(info.is_silent());
        assert_eq!(info.true_peak_dbtp, f64::NEG_INFINITY);
        assert_eq!(info.duration_seconds, 0.0);
        assert_eq!(info.peak_to_loudness_ratio(), None);
    }

    #[test]
    fn test_analyzer_creation() {
        assert!(LoudnessAnalyzer::new(44_100, 2).is_ok());
        assert!(LoudnessAnalyzer::new(48_000, 1).is_ok());
        assert!(LoudnessAnalyzer::new(96_000, 6).is_ok());

        assert!(LoudnessAnalyzer::new(100, 2).is_err());
        assert!(LoudnessAnalyzer::new(500_000, 2).is_err());
        assert!(LoudnessAnalyzer::new(44_100, 0).is_err());
        assert!(LoudnessAnalyzer::new(44_100, 10).is_err());
    }

    #[test]
    fn test_silent_audio_reports_floor() {
        let mut analyzer = LoudnessAnalyzer::new(44_100, 2).unwrap();
        analyzer.add_frames(&vec![0.0_f32; 44_100 * 2]).unwrap();

        let info = analyzer.finalize().unwrap();
        assert!(info.is_silent());
        assert_eq!(info.true_peak_dbtp, f64::NEG_INFINITY);
        assert_eq!(info.peak_to_loudness_ratio(), None);
    }

    #[test]
    fn test_sine_wave_loudness() {
        let mut analyzer = LoudnessAnalyzer::new(44_100, 2).unwrap();
        // -20 dBFS peak stereo: each channel -23.01 LUFS, summed +3.01 dB
        let samples = generate_sine_at_dbfs(1_000.0, 44_100, 4.0, -20.0, 2);
        analyzer.add_frames(&samples).unwrap();
        let info = analyzer.finalize().unwrap();

        assert!(
            (info.integrated_lufs - -20.0).abs() < 0.1,
            "Expected loudness around -20 LUFS, got {:.2}",
            info.integrated_lufs
        );
        assert!((info.true_peak_dbtp - -20.0).abs() < 0.05);
        assert!(info.loudness_range_lu < 0.5);
        assert!((info.duration_seconds - 4.0).abs() < 1e-9);
        assert!((info.peak_to_loudness_ratio().unwrap() - 0.0).abs() < 0.2);
    }

    #[test]
    fn test_integer_input_matches_float_input() {
        let float = generate_sine_at_dbfs(440.0, 48_000, 1.0, -6.0, 1);
        let ints: Vec<i16> = float.iter().map(|&s| (s * 32_768.0) as i16).collect();

        let mut a = LoudnessAnalyzer::new(48_000, 1).unwrap();
        a.add_frames(&float).unwrap();
        let mut b = LoudnessAnalyzer::new(48_000, 1).unwrap();
        b.add_frames_i16(&ints).unwrap();

        let (a, b) = (a.finalize().unwrap(), b.finalize().unwrap());
        assert!((a.integrated_lufs - b.integrated_lufs).abs() < 0.01);
    }

    #[test]
    fn test_no_samples_error() {
        let analyzer = LoudnessAnalyzer::new(44_100, 2).unwrap();
        assert!(matches!(analyzer.finalize(), Err(LoudnessError::NoSamples)));
    }

    #[test]
    fn test_invalid_sample_count() {
        let mut analyzer = LoudnessAnalyzer::new(44_100, 2).unwrap();
        assert!(analyzer.add_frames(&[0.1_f32; 5]).is_err());
        assert!(analyzer.add_frames_i16(&[1_i16; 3]).is_err());
    }

    #[test]
    fn test_loudness_info_headroom() {
        let info = LoudnessInfo {
            integrated_lufs: -14.0,
            loudness_range_lu: 5.0,
            max_momentary_lufs: -10.0,
            max_short_term_lufs: -12.0,
            true_peak_dbtp: -3.0,
            sample_peak_dbfs: -3.5,
            duration_seconds: 180.0,
            sample_rate: 44_100,
            channels: 2,
        };

        // +2.5 dB would put the peak at -0.5 dBTP, above a -1 dBTP ceiling
        assert!(info.will_clip_at_gain(2.5, -1.0));
        assert!(!info.will_clip_at_gain(1.5, -1.0));
        assert!((info.max_safe_gain(-1.0) - 2.0).abs() < 1e-9);
        assert_eq!(info.peak_to_loudness_ratio(), Some(11.0));
    }
}
