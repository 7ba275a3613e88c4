//! Input sanitizing
//!
//! Non-finite samples (NaN, infinities) would poison every recursive filter
//! downstream, so they are replaced with silence before any processing.

/// Replace non-finite samples with zero, returning how many were replaced
#[inline]
pub fn sanitize_in_place(samples: &mut [f32]) -> usize {
    let mut replaced = 0;
    for sample in samples.iter_mut() {
        if !sample.is_finite() {
            *sample = 0.0;
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_non_finite_samples() {
        let mut samples = [0.5, f32::NAN, -1.0, f32::INFINITY, f32::NEG_INFINITY, 2.0];
        assert_eq!(sanitize_in_place(&mut samples), 3);
        assert_eq!(samples, [0.5, 0.0, -1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn clean_input_is_untouched() {
        let mut samples = [0.1, -0.2, 0.3];
        assert_eq!(sanitize_in_place(&mut samples), 0);
        assert_eq!(samples, [0.1, -0.2, 0.3]);
    }
}
