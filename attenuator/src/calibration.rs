//! Conversion between attenuation and servo position.
//!
//! The fitted constants live in the 0-1 attenuation fraction domain:
//! `fraction = slope * position + intercept`. The public API speaks percent.

use serde::{Deserialize, Serialize};

/// Servo position in device units (quarter-microseconds for a Maestro).
pub type ServoPosition = i32;

pub const DEFAULT_SLOPE: f64 = 7.20779e-04;
pub const DEFAULT_INTERCEPT: f64 = -3.83299;

pub const CALIBRATED_MIN_PERCENT: f64 = 0.095255 * 100.0;
pub const CALIBRATED_MAX_PERCENT: f64 = 0.888113 * 100.0;

/// Diagnostic override that lets the whole -100..100 span through.
pub const FULL_RANGE_MIN_PERCENT: f64 = -100.0;
pub const FULL_RANGE_MAX_PERCENT: f64 = 100.0;

/// Empirical position used for a requested attenuation of exactly zero.
/// The linear fit is unreliable at that extreme, so it is not derived from it.
pub const NEAR_ZERO_SERVO_POSITION: ServoPosition = 5100;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CalibrationConstants {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            slope: DEFAULT_SLOPE,
            intercept: DEFAULT_INTERCEPT,
        }
    }
}

impl CalibrationConstants {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    pub fn is_invertible(&self) -> bool {
        self.slope != 0.0 && self.slope.is_finite() && self.intercept.is_finite()
    }
}

/// Inclusive bounds, in percent, inside which the fit is trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LinearityRange {
    pub min_percent: f64,
    pub max_percent: f64,
}

impl Default for LinearityRange {
    fn default() -> Self {
        Self::calibrated()
    }
}

impl LinearityRange {
    pub fn new(min_percent: f64, max_percent: f64) -> Self {
        Self {
            min_percent,
            max_percent,
        }
    }

    pub fn calibrated() -> Self {
        Self::new(CALIBRATED_MIN_PERCENT, CALIBRATED_MAX_PERCENT)
    }

    pub fn full() -> Self {
        Self::new(FULL_RANGE_MIN_PERCENT, FULL_RANGE_MAX_PERCENT)
    }

    /// False for NaN.
    pub fn contains(&self, attenuation_percent: f64) -> bool {
        (self.min_percent..=self.max_percent).contains(&attenuation_percent)
    }
}

pub fn servo_from_attenuation(
    attenuation_percent: f64,
    constants: &CalibrationConstants,
) -> ServoPosition {
    ((attenuation_percent / 100.0 - constants.intercept) / constants.slope).round() as ServoPosition
}

/// Returns a 0-1 fraction, not percent.
pub fn attenuation_from_servo(position: ServoPosition, constants: &CalibrationConstants) -> f64 {
    constants.slope * f64::from(position) + constants.intercept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_one_unit_over_linear_domain() {
        let constants = CalibrationConstants::default();
        let range = LinearityRange::calibrated();
        let low = servo_from_attenuation(range.min_percent, &constants);
        let high = servo_from_attenuation(range.max_percent, &constants);

        for position in low..=high {
            let percent = attenuation_from_servo(position, &constants) * 100.0;
            let back = servo_from_attenuation(percent, &constants);
            assert!(
                (back - position).abs() <= 1,
                "{position} -> {percent}% -> {back}"
            );
        }
    }

    #[test]
    fn attenuation_is_strictly_monotonic() {
        for constants in [
            CalibrationConstants::default(),
            CalibrationConstants::new(-2.5e-4, 1.7),
        ] {
            let increasing = constants.slope > 0.0;
            let mut previous = attenuation_from_servo(3000, &constants);
            for position in 3001..9000 {
                let current = attenuation_from_servo(position, &constants);
                if increasing {
                    assert!(current > previous);
                } else {
                    assert!(current < previous);
                }
                previous = current;
            }
        }
    }

    #[test]
    fn default_constants_map_midpoint() {
        let constants = CalibrationConstants::default();
        // (0.5 + 3.83299) / 7.20779e-4 = 6011.54
        assert_eq!(servo_from_attenuation(50.0, &constants), 6012);
    }

    #[test]
    fn servo_position_is_rounded_not_truncated() {
        let constants = CalibrationConstants::new(0.001, 0.0);
        assert_eq!(servo_from_attenuation(0.049, &constants), 0);
        assert_eq!(servo_from_attenuation(0.051, &constants), 1);
        assert_eq!(servo_from_attenuation(0.149, &constants), 1);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = LinearityRange::new(5.0, 95.0);
        assert!(range.contains(5.0));
        assert!(range.contains(95.0));
        assert!(!range.contains(4.999));
        assert!(!range.contains(150.0));
        assert!(!range.contains(f64::NAN));
        assert!(LinearityRange::full().contains(-100.0));
    }

    #[test]
    fn zero_slope_is_not_invertible() {
        assert!(!CalibrationConstants::new(0.0, 0.1).is_invertible());
        assert!(!CalibrationConstants::new(f64::NAN, 0.1).is_invertible());
        assert!(CalibrationConstants::default().is_invertible());
    }
}
