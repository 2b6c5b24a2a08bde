//! # Wear Prediction
//!
//! Linear extrapolation of mass loss for reference weights. Given a nominal
//! mass, its maximum permissible error (MPE) and a series of historical
//! verification masses, estimates how much of the tolerance has been consumed
//! and when the weight will leave tolerance.
//!
//! ## Algorithm
//!
//! ```text
//! days_passed     = latest.date - first.date
//! daily_wear_rate = (first.mass - latest.mass) / days_passed
//! current_error   = nominal - latest.mass
//! wear_percentage = current_error / MPE * 100
//! days_to_failure = (MPE - current_error) / daily_wear_rate   (rate > 0 only)
//! ```
//!
//! The observation source is the caller's concern; this module only
//! extrapolates.

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use super::round_to;

/// One verification of a reference weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WearObservation {
    pub date: NaiveDate,
    pub measured_mass: f64,
}

/// Inputs for a wear prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearInput {
    /// Nominal (conventional) mass of the weight
    pub nominal_mass: f64,
    /// Maximum permissible error for the weight, same unit as the masses
    pub mpe: f64,
    /// Historical verifications, at least two
    pub observations: Vec<WearObservation>,
}

/// Result of a wear extrapolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WearPrediction {
    /// Share of the MPE already consumed (2 dp)
    pub wear_rate_percentage: f64,
    /// Mass lost per day between first and latest observation
    pub daily_wear_rate: f64,
    /// Days between first and latest observation
    pub days_passed: i64,
    /// Days from `today` until the weight leaves tolerance
    pub days_to_failure: Option<f64>,
    /// `None` when no wear is measurable
    pub expected_failure_date: Option<NaiveDate>,
}

/// MPE as a fixed fraction of nominal mass.
pub fn mpe_from_fraction(nominal_mass: f64, fraction: f64) -> f64 {
    nominal_mass * fraction
}

/// Extrapolate wear from the earliest and most recent observations.
///
/// Returns `None` (no prediction) when fewer than two observations are given,
/// the elapsed time is not positive, or the MPE is not positive.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use metro_core::calculations::wear::{predict, WearInput, WearObservation};
///
/// let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
/// let input = WearInput {
///     nominal_mass: 1000.0,
///     mpe: 1.0,
///     observations: vec![
///         WearObservation { date: d(2024, 1, 1), measured_mass: 1000.0 },
///         WearObservation { date: d(2024, 1, 5), measured_mass: 999.75 },
///     ],
/// };
/// let prediction = predict(&input, d(2024, 1, 5)).unwrap();
/// assert_eq!(prediction.wear_rate_percentage, 25.0);
/// assert_eq!(prediction.expected_failure_date, Some(d(2024, 1, 17)));
/// ```
pub fn predict(input: &WearInput, today: NaiveDate) -> Option<WearPrediction> {
    if input.observations.len() < 2 {
        tracing::warn!(
            observations = input.observations.len(),
            "wear prediction needs at least two observations"
        );
        return None;
    }
    if input.mpe <= 0.0 {
        tracing::warn!(mpe = input.mpe, "wear prediction needs a positive MPE");
        return None;
    }

    let first = input.observations.iter().min_by_key(|o| o.date)?;
    let latest = input.observations.iter().max_by_key(|o| o.date)?;

    let days_passed = (latest.date - first.date).num_days();
    if days_passed <= 0 {
        tracing::warn!(days_passed, "no elapsed time between observations");
        return None;
    }

    let mass_loss = first.measured_mass - latest.measured_mass;
    let daily_wear_rate = mass_loss / days_passed as f64;

    let current_error = input.nominal_mass - latest.measured_mass;
    let wear_rate_percentage = round_to(current_error / input.mpe * 100.0, 2);
    let remaining_tolerance = input.mpe - current_error;

    let (days_to_failure, expected_failure_date) = if daily_wear_rate > 0.0 {
        let days = remaining_tolerance / daily_wear_rate;
        (Some(days), add_whole_days(today, days))
    } else {
        (None, None)
    };

    tracing::debug!(
        days_passed,
        daily_wear_rate,
        wear_rate_percentage,
        ?expected_failure_date,
        "wear prediction"
    );

    Some(WearPrediction {
        wear_rate_percentage,
        daily_wear_rate,
        days_passed,
        days_to_failure,
        expected_failure_date,
    })
}

// Truncates toward zero; out-of-range results give no date.
fn add_whole_days(today: NaiveDate, days: f64) -> Option<NaiveDate> {
    let whole = days.trunc();
    if !whole.is_finite() || whole.abs() > i32::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_days(whole as i64)?;
    today.checked_add_signed(delta)
}
