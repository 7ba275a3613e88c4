//! Test signal generation
//!
//! Standard signals used in loudness and dynamics verification:
//! - Sine waves (any channel count, optional phase)
//! - Seeded white noise
//! - Click tracks at a given tempo
//! - Silence
//!
//! All generators return interleaved samples.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Generate a sine wave on every channel
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
/// * `channels` - Number of interleaved channels
pub fn generate_sine(
    frequency: f64,
    sample_rate: u32,
    duration: f64,
    amplitude: f64,
    channels: usize,
) -> Vec<f32> {
    generate_sine_with_phase(frequency, sample_rate, duration, amplitude, 0.0, channels)
}

/// Generate a sine wave starting at `phase` radians
pub fn generate_sine_with_phase(
    frequency: f64,
    sample_rate: u32,
    duration: f64,
    amplitude: f64,
    phase: f64,
    channels: usize,
) -> Vec<f32> {
    let frames = (f64::from(sample_rate) * duration).round() as usize;
    let mut samples = Vec::with_capacity(frames * channels);

    for i in 0..frames {
        let t = i as f64 / f64::from(sample_rate);
        let sample = ((2.0 * PI * frequency * t + phase).sin() * amplitude) as f32;
        for _ in 0..channels {
            samples.push(sample);
        }
    }

    samples
}

/// Generate a sine whose RMS level is `dbfs` (full-scale sine = 0 dBFS peak)
pub fn generate_sine_at_dbfs(
    frequency: f64,
    sample_rate: u32,
    duration: f64,
    dbfs: f64,
    channels: usize,
) -> Vec<f32> {
    let amplitude = 10.0_f64.powf(dbfs / 20.0);
    generate_sine(frequency, sample_rate, duration, amplitude, channels)
}

/// Generate uniformly distributed white noise from a fixed seed
///
/// Each channel receives independent noise.
pub fn generate_white_noise(
    sample_rate: u32,
    duration: f64,
    amplitude: f64,
    channels: usize,
    seed: u64,
) -> Vec<f32> {
    let frames = (f64::from(sample_rate) * duration).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    (0..frames * channels)
        .map(|_| (rng.gen_range(-1.0..1.0) * amplitude) as f32)
        .collect()
}

/// Generate a click track
///
/// Each click is a 10 ms, 2 kHz burst with a 2 ms exponential decay, placed
/// on every beat. Between clicks the signal is digital silence.
pub fn generate_click_track(
    bpm: f64,
    sample_rate: u32,
    duration: f64,
    amplitude: f64,
    channels: usize,
) -> Vec<f32> {
    let fs = f64::from(sample_rate);
    let frames = (fs * duration).round() as usize;
    let beat = (fs * 60.0 / bpm).round() as usize;
    let click_len = (fs * 0.010).round() as usize;
    let mut samples = vec![0.0f32; frames * channels];

    for start in (0..frames).step_by(beat.max(1)) {
        for n in 0..click_len.min(frames - start) {
            let t = n as f64 / fs;
            let value = (amplitude * (2.0 * PI * 2_000.0 * t + PI / 2.0).sin() * (-t / 0.002).exp()) as f32;
            let frame = (start + n) * channels;
            samples[frame..frame + channels].fill(value);
        }
    }

    samples
}

/// Generate silence
pub fn generate_silence(sample_rate: u32, duration: f64, channels: usize) -> Vec<f32> {
    vec![0.0; (f64::from(sample_rate) * duration).round() as usize * channels]
}
