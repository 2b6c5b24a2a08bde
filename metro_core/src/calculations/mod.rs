//! # Calibration Calculations
//!
//! Pure, stateless calculation functions. Each call is independent; nothing
//! here holds mutable state, so calls can run in parallel freely.
//!
//! ## Available Calculations
//!
//! - [`tolerance`] - EMA lookup per accuracy class, suggested points
//! - [`uncertainty`] - Repeatability statistics and expanded uncertainty
//! - [`wear`] - Reference-weight wear extrapolation
//! - [`verification`] - Session planning, per-point and eccentricity evaluation
//!
//! ## Rounding
//!
//! Published values are rounded half away from zero to a fixed number of
//! decimals: EMA 6, repeatability mean 4, deviations and uncertainties 6,
//! wear percentage 2, `multiples_of_e` 2.

pub mod tolerance;
pub mod uncertainty;
pub mod verification;
pub mod wear;

// Re-export commonly used types
pub use tolerance::{
    AccuracyClass, PointTolerance, SuggestedPoint, ToleranceBreakpoint, VerificationType,
};
pub use uncertainty::{RepeatabilityStats, UncertaintyBudget};
pub use verification::{EccentricityEvaluation, PointEvaluation, SessionPlan};
pub use wear::{WearInput, WearObservation, WearPrediction};

/// Significant digits kept before rounding, matching what a decimal
/// printout of an `f64` can carry
const SIGNIFICANT_DIGITS: usize = 15;

/// Round half away from zero to `decimals` places.
///
/// Rounding works on the value's 15-significant-digit decimal form, so a
/// tie written as `1.005` rounds up even though its binary value sits just
/// below the tie.
///
/// ```rust
/// use metro_core::calculations::round_to;
///
/// assert_eq!(round_to(0.00577350269, 6), 0.005774);
/// assert_eq!(round_to(1.005, 2), 1.01);
/// assert_eq!(round_to(-2.345, 1), -2.3);
/// ```
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    if value == 0.0 {
        return 0.0;
    }

    // d.dddddddddddddde<exp>
    let repr = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value.abs());
    let Some((mantissa, exponent)) = repr.split_once('e') else {
        return value;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value;
    };

    let mut digits: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();

    // digits[i] has place value 10^(exponent - i)
    let keep = exponent + 1 + decimals;
    if keep < 0 {
        return 0.0;
    }
    let keep = keep as usize;
    let next = digits.get(keep).copied().unwrap_or(0);
    digits.truncate(keep);
    let last_place = exponent + 1 - digits.len() as i32;

    if next >= 5 {
        increment_digits(&mut digits);
    }
    if digits.iter().all(|&d| d == 0) {
        return 0.0;
    }

    let integer: String = digits.iter().map(|&d| char::from(b'0' + d)).collect();
    let magnitude: f64 = match format!("{integer}e{last_place}").parse() {
        Ok(magnitude) => magnitude,
        Err(_) => return value,
    };

    if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// Add one unit in the last place, carrying into a new leading digit.
fn increment_digits(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == 9 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, 1);
}
