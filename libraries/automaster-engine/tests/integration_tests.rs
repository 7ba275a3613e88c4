//! End-to-end tests for the mastering pipeline and offline renderer

use automaster_core::test_utils::{
    calculate_peak, generate_click_track, generate_silence, generate_sine, generate_white_noise,
};
use automaster_core::{db_to_linear, AudioBuffer, AudioFormat, ConfigError, SampleRate};
use automaster_dynamics::DynamicsSettings;
use automaster_engine::{
    render, DiagnosticEvent, EngineError, GenrePreset, MasteringConfig, MasteringPipeline,
    MaterialType, PipelineParts, RenderOptions,
};
use proptest::prelude::*;

const SR: u32 = 48_000;

fn offline_config() -> MasteringConfig {
    MasteringConfig {
        deadline_monitoring: false,
        ..MasteringConfig::default()
    }
}

fn run(pipeline: &mut MasteringPipeline, samples: &mut [f32], channels: usize) {
    for block in samples.chunks_mut(512 * channels) {
        pipeline.process_interleaved(block);
    }
}

fn stereo(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter().zip(right).flat_map(|(&l, &r)| [l, r]).collect()
}

#[test]
fn silence_stays_silent() {
    let PipelineParts {
        mut pipeline,
        mut receiver,
        ..
    } = MasteringPipeline::new(&offline_config(), SR, 2).unwrap();

    let mut samples = generate_silence(SR, 5.0, 2);
    run(&mut pipeline, &mut samples, 2);

    assert!(samples.iter().all(|&s| s == 0.0));
    let snapshot = receiver.latest().unwrap();
    assert_eq!(snapshot.integrated_lufs, f64::NEG_INFINITY);
    assert_eq!(snapshot.true_peak_dbtp, f64::NEG_INFINITY);
    assert_eq!(snapshot.output_true_peak_dbtp, f64::NEG_INFINITY);
    assert!(snapshot.band_gain_reductions().iter().all(|&gr| gr == 0.0));
    assert_eq!(snapshot.band_gain_reductions().len(), 7);
    assert_eq!(snapshot.trim_db, 0.0);
    assert_eq!(snapshot.limiter_gain_reduction_db, 0.0);
    assert_eq!(snapshot.phase_correlation, 1.0);

    let material = snapshot.material.unwrap();
    assert_eq!(material.material, MaterialType::Smooth);
    assert_eq!(material.transient_density_per_sec, 0.0);
}

#[test]
fn click_track_is_at_least_balanced() {
    let PipelineParts { mut pipeline, .. } =
        MasteringPipeline::new(&offline_config(), SR, 2).unwrap();

    let mut samples = generate_click_track(120.0, SR, 8.0, 0.8, 2);
    run(&mut pipeline, &mut samples, 2);

    let classification = pipeline.classification().unwrap();
    assert_ne!(classification.material, MaterialType::Smooth);
    assert!((classification.transient_density_per_sec - 2.0).abs() < 1e-9);
    assert!(classification.crest_factor_db >= 12.0);
}

#[test]
fn auto_mode_skips_manual_bands() {
    let PipelineParts {
        mut pipeline,
        mut controller,
        ..
    } = MasteringPipeline::new(&offline_config(), SR, 2).unwrap();
    controller.set_manual_override(0, true).unwrap();

    let mut samples = generate_click_track(120.0, SR, 8.0, 0.8, 2);
    run(&mut pipeline, &mut samples, 2);

    let pop = GenrePreset::Pop.band_settings();
    assert_eq!(pipeline.bands()[0].settings, pop[0]);
    for band in &pipeline.bands()[1..] {
        assert_eq!(band.settings.attack_s, 0.003);
        assert_eq!(band.settings.release_s, 0.150);
    }
}

#[test]
fn auto_mode_off_keeps_preset_timing() {
    let config = MasteringConfig {
        auto_material_detection: false,
        ..offline_config()
    };
    let PipelineParts { mut pipeline, .. } = MasteringPipeline::new(&config, SR, 2).unwrap();

    let mut samples = generate_click_track(120.0, SR, 3.0, 0.8, 2);
    run(&mut pipeline, &mut samples, 2);

    let settings: Vec<DynamicsSettings> = pipeline.bands().iter().map(|b| b.settings).collect();
    assert_eq!(settings, GenrePreset::Pop.band_settings());
    assert!(pipeline.classification().is_some());
}

#[test]
fn quiet_source_gets_six_db_of_trim() {
    let PipelineParts {
        mut pipeline,
        mut receiver,
        ..
    } = MasteringPipeline::new(&offline_config(), SR, 2).unwrap();

    // 997 Hz at 0.1 in both channels reads about -20 LUFS
    let tone = generate_sine(997.0, SR, 5.0, 0.1, 1);
    let mut samples = stereo(&tone, &tone);
    run(&mut pipeline, &mut samples, 2);

    let snapshot = receiver.latest().unwrap();
    assert!(
        (snapshot.integrated_lufs - -20.0).abs() < 0.3,
        "integrated {}",
        snapshot.integrated_lufs
    );
    let expected = -14.0 - snapshot.integrated_lufs;
    assert!((snapshot.trim_db - expected).abs() < 0.01, "trim {}", snapshot.trim_db);
    assert!((snapshot.trim_db - 6.0).abs() < 0.3);
}

#[test]
fn two_pass_render_trims_from_the_first_sample() {
    let tone = generate_sine(997.0, SR, 4.0, 0.1, 1);
    let input = AudioBuffer::from_planar(&[tone.as_slice(), tone.as_slice()], SampleRate::DVD_QUALITY);

    let report = render(&MasteringConfig::default(), &input, &RenderOptions::default()).unwrap();
    let reference = report.reference_lufs.unwrap();
    assert!((reference - report.input_loudness.integrated_lufs).abs() < 1e-12);

    // The trim is already moving before the first gating block closes
    let first = report.snapshots[0];
    assert!(first.integrated_lufs.is_infinite());
    assert!(first.trim_db > 2.0, "first trim {}", first.trim_db);
    assert!((report.final_snapshot.trim_db - (-14.0 - reference)).abs() < 0.01);

    let single = RenderOptions {
        two_pass: false,
        ..RenderOptions::default()
    };
    let report = render(&MasteringConfig::default(), &input, &single).unwrap();
    assert_eq!(report.snapshots[0].trim_db, 0.0);
}

#[test]
fn limiter_holds_the_ceiling() {
    // Transparent bands so the limiter sees the trimmed input directly
    let config = MasteringConfig {
        target_lufs: -1.0,
        true_peak_ceiling_dbtp: -3.0,
        band_settings: vec![DynamicsSettings::transparent(); 7],
        ..offline_config()
    };
    let tone = generate_sine(1_000.0, SR, 2.0, 0.5, 1);
    let input = AudioBuffer::from_planar(&[tone.as_slice(), tone.as_slice()], SampleRate::DVD_QUALITY);
    let report = render(&config, &input, &RenderOptions::default()).unwrap();

    assert!(calculate_peak(&report.output.samples) <= db_to_linear(-3.0) + 1e-4);
    assert!(
        report.output_loudness.true_peak_dbtp <= -3.0 + 0.2,
        "output true peak {}",
        report.output_loudness.true_peak_dbtp
    );
    assert!(report.final_snapshot.limiter_gain_reduction_db < -1.0);
}

#[test]
fn non_finite_input_is_reported() {
    let mut samples = generate_sine(440.0, SR, 0.5, 0.3, 2);
    samples[1_000] = f32::NAN;
    samples[1_001] = f32::NEG_INFINITY;
    let input = AudioBuffer::new(samples, AudioFormat::new(SampleRate::DVD_QUALITY, 2, 32));

    // The analyzer would choke on NaN, so feed the pipeline directly
    let PipelineParts {
        mut pipeline,
        mut receiver,
        ..
    } = MasteringPipeline::new(&offline_config(), SR, 2).unwrap();
    let mut samples = input.samples.clone();
    run(&mut pipeline, &mut samples, 2);

    assert!(samples.iter().all(|s| s.is_finite()));
    let events: Vec<_> = receiver.diagnostics().collect();
    assert_eq!(
        events,
        vec![DiagnosticEvent::NonFiniteSamples {
            count: 2,
            position_frames: 0
        }]
    );
    assert_eq!(pipeline.snapshot().sanitized_samples, 2);
}

#[test]
fn inverted_channels_read_negative_correlation() {
    let PipelineParts {
        mut pipeline,
        mut receiver,
        ..
    } = MasteringPipeline::new(&offline_config(), SR, 2).unwrap();

    let left = generate_sine(500.0, SR, 0.5, 0.5, 1);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    let mut samples = stereo(&left, &right);
    run(&mut pipeline, &mut samples, 2);

    let snapshot = receiver.latest().unwrap();
    assert!((snapshot.phase_correlation + 1.0).abs() < 1e-6);
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = MasteringConfig {
        band_crossovers: vec![100.0, 100.0],
        ..MasteringConfig::default()
    };
    assert!(matches!(
        MasteringPipeline::new(&config, SR, 2),
        Err(EngineError::Config(ConfigError::CrossoversNotAscending { .. }))
    ));

    let config = MasteringConfig {
        band_crossovers: vec![1_000.0],
        band_settings: vec![
            DynamicsSettings::new(),
            DynamicsSettings {
                attack_s: 0.0,
                ..DynamicsSettings::new()
            },
        ],
        ..MasteringConfig::default()
    };
    assert!(matches!(
        MasteringPipeline::new(&config, SR, 2),
        Err(EngineError::Config(ConfigError::InvalidTimeConstant { .. }))
    ));

    let config = MasteringConfig {
        target_lufs: f64::NAN,
        ..MasteringConfig::default()
    };
    assert!(MasteringPipeline::new(&config, SR, 2).is_err());
}

#[test]
fn every_preset_renders() {
    let input = AudioBuffer::new(
        generate_white_noise(SR, 1.0, 0.3, 2, 11),
        AudioFormat::new(SampleRate::DVD_QUALITY, 2, 32),
    );
    for preset in GenrePreset::ALL {
        let config = MasteringConfig::from_preset(preset);
        let report = render(&config, &input, &RenderOptions::default()).unwrap();
        assert_eq!(report.final_snapshot.band_count, preset.band_count());
        assert!(report.output.samples.iter().all(|s| s.is_finite()), "{}", preset);
    }
}

#[test]
fn block_size_does_not_change_output() {
    let input = AudioBuffer::new(
        generate_white_noise(SR, 1.0, 0.5, 2, 5),
        AudioFormat::new(SampleRate::DVD_QUALITY, 2, 32),
    );
    let small = RenderOptions {
        block_size: 64,
        ..RenderOptions::default()
    };
    let a = render(&MasteringConfig::default(), &input, &small).unwrap();
    let b = render(&MasteringConfig::default(), &input, &RenderOptions::default()).unwrap();
    assert_eq!(a.output.samples, b.output.samples);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn output_is_finite_and_reductions_non_positive(
        frequency in 40.0f64..15_000.0,
        amplitude in 0.0f64..2.0,
        seed in any::<u64>(),
    ) {
        let PipelineParts { mut pipeline, .. } =
            MasteringPipeline::new(&offline_config(), SR, 2).unwrap();

        let tone = generate_sine(frequency, SR, 0.25, amplitude, 1);
        let noise = generate_white_noise(SR, 0.25, amplitude * 0.5, 1, seed);
        let mut samples = stereo(&tone, &noise);
        run(&mut pipeline, &mut samples, 2);

        prop_assert!(samples.iter().all(|s| s.is_finite()));
        let snapshot = pipeline.snapshot();
        prop_assert!(snapshot.band_gain_reductions().iter().all(|&gr| gr <= 0.0));
        prop_assert!(snapshot.limiter_gain_reduction_db <= 0.0);
    }
}
