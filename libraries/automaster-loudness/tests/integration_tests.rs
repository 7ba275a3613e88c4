//! Integration tests for automaster-loudness
//!
//! Tests include:
//! - EBU Tech 3341 / 3342 style reference signals
//! - Property-based tests with proptest
//! - Cross-module checks (meter, true peak, trim, limiter)

use automaster_core::test_utils::{generate_sine, generate_sine_at_dbfs, generate_silence};
use automaster_loudness::{
    LoudnessAnalyzer, LoudnessMeter, TargetTrim, TruePeakDetector, TruePeakLimiter, LUFS_FLOOR,
};
use proptest::prelude::*;

const FS: u32 = 48_000;

// ========== Helper Functions ==========

/// Concatenate stereo 1 kHz segments of (dBFS, seconds)
fn stereo_program(segments: &[(f64, f64)]) -> Vec<f32> {
    segments
        .iter()
        .flat_map(|&(dbfs, secs)| generate_sine_at_dbfs(1_000.0, FS, secs, dbfs, 2))
        .collect()
}

fn analyze(samples: &[f32], channels: u32) -> automaster_loudness::LoudnessInfo {
    let mut analyzer = LoudnessAnalyzer::new(FS, channels).unwrap();
    analyzer.add_frames(samples).unwrap();
    analyzer.finalize().unwrap()
}

fn true_peak(samples: &[f32], channels: usize) -> f64 {
    let mut detector = TruePeakDetector::new(channels);
    detector.process(samples);
    detector.true_peak_dbtp()
}

// ========== Reference Signals ==========

#[test]
fn test_silence_reports_floor_everywhere() {
    let silence = generate_silence(FS, 5.0, 2);
    let mut meter = LoudnessMeter::new(FS, 2).unwrap();
    meter.add_frames(&silence).unwrap();

    assert_eq!(meter.integrated_lufs(), LUFS_FLOOR);
    assert_eq!(meter.momentary_lufs(), LUFS_FLOOR);
    assert_eq!(meter.short_term_lufs(), LUFS_FLOOR);
    assert_eq!(true_peak(&silence, 2), f64::NEG_INFINITY);
}

#[test]
fn test_full_scale_sine_true_peak_at_least_zero() {
    let tone = generate_sine(1_000.0, FS, 1.0, 1.0, 2);
    let peak = true_peak(&tone, 2);
    assert!(peak >= -0.001, "true peak {peak} dBTP");
}

#[test]
fn test_constant_sine_readings_agree() {
    let tone = generate_sine_at_dbfs(1_000.0, FS, 5.0, -20.0, 2);
    let mut meter = LoudnessMeter::new(FS, 2).unwrap();
    meter.add_frames(&tone).unwrap();

    let m = meter.momentary_lufs();
    let s = meter.short_term_lufs();
    let i = meter.integrated_lufs();
    assert!((m - s).abs() < 0.1, "momentary {m} short-term {s}");
    assert!((m - i).abs() < 0.1, "momentary {m} integrated {i}");
    assert!((i - -20.0).abs() < 0.1);
}

#[test]
fn test_single_channel_997hz_reads_minus_3_01() {
    let mono = generate_sine(997.0, FS, 5.0, 1.0, 1);
    // Left channel only
    let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, 0.0]).collect();
    let info = analyze(&stereo, 2);
    assert!((info.integrated_lufs - -3.01).abs() < 0.1, "{}", info.integrated_lufs);
}

#[test]
fn test_ebu_3341_case_1_and_2() {
    for level in [-23.0, -33.0] {
        let info = analyze(&stereo_program(&[(level, 20.0)]), 2);
        assert!(
            (info.integrated_lufs - level).abs() < 0.1,
            "expected {level}, got {}",
            info.integrated_lufs
        );
    }
}

#[test]
fn test_relative_gate_excludes_quiet_passages() {
    // EBU Tech 3341 case 3
    let program = stereo_program(&[(-36.0, 10.0), (-23.0, 60.0), (-36.0, 10.0)]);
    let info = analyze(&program, 2);
    assert!((info.integrated_lufs - -23.0).abs() < 0.1, "{}", info.integrated_lufs);
}

#[test]
fn test_absolute_gate_excludes_near_silence() {
    // EBU Tech 3341 case 4
    let program = stereo_program(&[
        (-72.0, 10.0),
        (-36.0, 10.0),
        (-23.0, 60.0),
        (-36.0, 10.0),
        (-72.0, 10.0),
    ]);
    let info = analyze(&program, 2);
    assert!((info.integrated_lufs - -23.0).abs() < 0.1, "{}", info.integrated_lufs);
}

#[test]
fn test_tone_followed_by_silence() {
    let mut program = stereo_program(&[(-20.0, 10.0)]);
    program.extend(generate_silence(FS, 10.0, 2));
    let info = analyze(&program, 2);
    assert!((info.integrated_lufs - -20.0).abs() < 0.1);
}

#[test]
fn test_loudness_range_two_levels() {
    // EBU Tech 3342 case 1
    let program = stereo_program(&[(-20.0, 20.0), (-30.0, 20.0)]);
    let info = analyze(&program, 2);
    assert!((info.loudness_range_lu - 10.0).abs() < 1.0, "LRA {}", info.loudness_range_lu);
}

#[test]
fn test_incremental_analysis_matches_single_pass() {
    let program = stereo_program(&[(-18.0, 6.0)]);

    let mut incremental = LoudnessAnalyzer::new(FS, 2).unwrap();
    for chunk in program.chunks(1_024) {
        incremental.add_frames(chunk).unwrap();
    }
    let a = incremental.finalize().unwrap();
    let b = analyze(&program, 2);
    assert_eq!(a, b);
}

// ========== Cross-Module ==========

#[test]
fn test_trim_from_measured_loudness() {
    let source = stereo_program(&[(-20.0, 5.0)]);
    let mut meter = LoudnessMeter::new(FS, 2).unwrap();
    meter.add_frames(&source).unwrap();

    let mut trim = TargetTrim::new(FS, -14.0).unwrap();
    trim.update(meter.integrated_lufs());
    assert!((trim.target_gain_db() - 6.0).abs() < 0.1);
}

#[test]
fn test_trim_then_limit_stays_under_ceiling() {
    // -10 dBFS program pushed up by 14 dB: peaks near +4 dBFS before limiting
    let mut samples = stereo_program(&[(-10.0, 3.0)]);
    let mut trim = TargetTrim::new(FS, -6.0).unwrap();
    trim.set_reference(Some(-20.0));
    trim.update(LUFS_FLOOR);

    let mut limiter = TruePeakLimiter::new(FS, 2);
    for frame in samples.chunks_exact_mut(2) {
        let gain = trim.next_gain();
        frame.iter_mut().for_each(|s| *s *= gain);
        limiter.process_frame(frame);
    }

    assert!(true_peak(&samples, 2) <= -1.0 + 0.05);
    assert!(limiter.gain_reduction_db() < -4.0);
}

// ========== Property-Based Tests ==========

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The limiter output never exceeds its ceiling (with interpolation tolerance)
    #[test]
    fn limiter_respects_ceiling(
        ceiling_db in -12.0_f64..-0.1,
        gain_db in 0.0_f64..12.0,
        frequency in 50.0_f64..8_000.0,
    ) {
        let mut limiter = TruePeakLimiter::new(FS, 2);
        limiter.set_ceiling_dbtp(ceiling_db).unwrap();

        let amplitude = 10.0_f64.powf((ceiling_db + gain_db) / 20.0).min(4.0);
        let mut samples = generate_sine(frequency, FS, 0.25, amplitude, 2);
        limiter.process(&mut samples);

        let peak = true_peak(&samples, 2);
        prop_assert!(peak <= ceiling_db + 0.1, "peak {} ceiling {}", peak, ceiling_db);
    }

    /// Loudness readings are finite or the floor, never NaN
    #[test]
    fn meter_readings_are_well_formed(
        amplitude in 0.0_f64..2.0,
        frequency in 20.0_f64..20_000.0,
    ) {
        let mut meter = LoudnessMeter::new(FS, 2).unwrap();
        meter.add_frames(&generate_sine(frequency, FS, 3.5, amplitude, 2)).unwrap();

        for value in [meter.momentary_lufs(), meter.short_term_lufs(), meter.integrated_lufs()] {
            prop_assert!(value.is_finite() || value == LUFS_FLOOR);
        }
        prop_assert!(meter.loudness_range_lu() >= 0.0);
    }

    /// Scaling the input by g dB moves integrated loudness by g LU
    #[test]
    fn integrated_loudness_tracks_gain(gain_db in -20.0_f64..0.0) {
        let reference = analyze(&stereo_program(&[(-6.0, 4.0)]), 2);
        let scaled = analyze(&stereo_program(&[(-6.0 + gain_db, 4.0)]), 2);
        prop_assert!((scaled.integrated_lufs - reference.integrated_lufs - gain_db).abs() < 0.05);
    }

    /// Analyzer accepts every supported sample rate
    #[test]
    fn analyzer_accepts_valid_sample_rates(sample_rate in 8_000u32..=384_000) {
        prop_assert!(LoudnessAnalyzer::new(sample_rate, 2).is_ok());
    }
}
