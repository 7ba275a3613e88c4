//! Level conversion helpers

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Zero (or negative) amplitude maps to negative infinity.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Convert a power (mean square) to decibels
#[inline]
pub fn power_to_db(power: f64) -> f64 {
    if power > 0.0 {
        10.0 * power.log10()
    } else {
        f64::NEG_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert!((db_to_linear(-6.0) - 0.501187).abs() < 1e-6);
        assert!((linear_to_db(0.5) + 6.0206).abs() < 1e-4);
        assert!((power_to_db(0.5) + 3.0103).abs() < 1e-4);
        assert_eq!(linear_to_db(0.0), f64::NEG_INFINITY);
        assert_eq!(power_to_db(-1.0), f64::NEG_INFINITY);
    }

    proptest! {
        #[test]
        fn db_linear_inverse(db in -120.0f64..24.0) {
            prop_assert!((linear_to_db(db_to_linear(db)) - db).abs() < 1e-9);
        }
    }
}
