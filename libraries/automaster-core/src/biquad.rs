//! Inspectable second-order IIR section
//!
//! All filtering in the mastering chain (K-weighting, crossovers, all-pass
//! compensation) is built from this one primitive. Coefficients are plain
//! data so they can be logged, compared and tested; state is f64 in
//! transposed direct form II.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Butterworth Q for a second-order section
pub const BUTTERWORTH_Q: f64 = FRAC_1_SQRT_2;

/// Normalized biquad coefficients (a0 == 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoefficients {
    /// Pass-through section
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Normalize raw coefficients by `a0`
    pub fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// RBJ low pass
    pub fn lowpass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let (cos_w, alpha) = rbj_terms(sample_rate, frequency, q);
        let b1 = 1.0 - cos_w;
        Self::from_raw(
            b1 / 2.0,
            b1,
            b1 / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    /// RBJ high pass
    pub fn highpass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let (cos_w, alpha) = rbj_terms(sample_rate, frequency, q);
        let b1 = -(1.0 + cos_w);
        Self::from_raw(
            -b1 / 2.0,
            b1,
            -b1 / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    /// RBJ second-order all pass
    ///
    /// With Butterworth Q this equals the sum of a 4th-order Linkwitz-Riley
    /// low/high pass pair at the same frequency.
    pub fn allpass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let (cos_w, alpha) = rbj_terms(sample_rate, frequency, q);
        Self::from_raw(
            1.0 - alpha,
            -2.0 * cos_w,
            1.0 + alpha,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    /// Magnitude response at `frequency`, linear
    pub fn magnitude_at(&self, sample_rate: f64, frequency: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        // H(e^jw) = (b0 + b1 e^-jw + b2 e^-2jw) / (1 + a1 e^-jw + a2 e^-2jw)
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }

    /// True when both poles lie inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

fn rbj_terms(sample_rate: f64, frequency: f64, q: f64) -> (f64, f64) {
    let omega = 2.0 * PI * frequency / sample_rate;
    (omega.cos(), omega.sin() / (2.0 * q))
}

/// Single-channel biquad section
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coeffs: BiquadCoefficients,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Create a section with cleared state
    pub fn new(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Process one sample
    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let c = &self.coeffs;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y
    }

    /// Current coefficients
    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coeffs
    }

    /// Clear the delay line
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 48_000.0;

    fn to_db(x: f64) -> f64 {
        20.0 * x.log10()
    }

    #[test]
    fn identity_passes_samples_through() {
        let mut filter = Biquad::default();
        for x in [0.5, -0.25, 1.0, 0.0] {
            assert_eq!(filter.process(x), x);
        }
    }

    #[test]
    fn butterworth_lowpass_is_3db_down_at_cutoff() {
        let lp = BiquadCoefficients::lowpass(FS, 1_000.0, BUTTERWORTH_Q);
        assert!((to_db(lp.magnitude_at(FS, 1_000.0)) + 3.01).abs() < 0.05);
        assert!((lp.magnitude_at(FS, 10.0) - 1.0).abs() < 1e-3);
        assert!(lp.magnitude_at(FS, 15_000.0) < 0.01);
        assert!(lp.is_stable());
    }

    #[test]
    fn highpass_mirrors_lowpass() {
        let hp = BiquadCoefficients::highpass(FS, 1_000.0, BUTTERWORTH_Q);
        assert!((to_db(hp.magnitude_at(FS, 1_000.0)) + 3.01).abs() < 0.05);
        assert!((hp.magnitude_at(FS, 20_000.0) - 1.0).abs() < 1e-2);
        assert!(hp.magnitude_at(FS, 20.0) < 0.001);
    }

    #[test]
    fn allpass_has_unit_magnitude() {
        let ap = BiquadCoefficients::allpass(FS, 2_000.0, BUTTERWORTH_Q);
        for f in [20.0, 200.0, 2_000.0, 8_000.0, 20_000.0] {
            assert!((ap.magnitude_at(FS, f) - 1.0).abs() < 1e-9, "f = {f}");
        }
    }

    #[test]
    fn dc_step_settles_to_dc_gain() {
        let mut lp = Biquad::new(BiquadCoefficients::lowpass(FS, 500.0, BUTTERWORTH_Q));
        let mut y = 0.0;
        for _ in 0..10_000 {
            y = lp.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-6);

        lp.reset();
        assert!(lp.process(0.0).abs() < f64::EPSILON);
    }
}
