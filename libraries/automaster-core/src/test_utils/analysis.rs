//! Simple measurements for verifying processed audio

/// RMS level of all samples
pub fn calculate_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// Absolute maximum sample value
pub fn calculate_peak(samples: &[f32]) -> f64 {
    samples
        .iter()
        .map(|s| f64::from(s.abs()))
        .fold(0.0, f64::max)
}

/// Total energy (sum of squares)
pub fn energy(samples: &[f32]) -> f64 {
    samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum()
}

/// Extract one channel from interleaved samples
pub fn channel(samples: &[f32], channels: usize, index: usize) -> Vec<f32> {
    samples
        .chunks_exact(channels)
        .map(|frame| frame[index])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_full_scale_square() {
        let samples = [1.0, -1.0, 1.0, -1.0];
        assert!((calculate_rms(&samples) - 1.0).abs() < 1e-12);
        assert_eq!(calculate_peak(&samples), 1.0);
        assert_eq!(energy(&samples), 4.0);
    }

    #[test]
    fn channel_extraction() {
        let samples = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(channel(&samples, 2, 1), vec![2.0, 4.0]);
    }
}
