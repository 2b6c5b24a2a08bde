//! # Tolerance Table (EMA)
//!
//! Maximum Permissible Error (EMA) lookup for non-automatic weighing
//! instruments, per accuracy class, in multiples of the verification division `e`.
//!
//! ## Breakpoint Tables
//!
//! | Class | ≤ 0.5e    | ≤ 1.0e     | 1.5e      |
//! |-------|-----------|------------|-----------|
//! | I     | 50 000    | 200 000    | above     |
//! | II    | 5 000     | 20 000     | above     |
//! | III   | 500       | 2 000      | above     |
//! | IIII  | 50        | 200        | above     |
//!
//! Upper bounds are inclusive. In-use (supervision) tolerances are twice the
//! initial/subsequent verification tolerances.
//!
//! ## Example
//!
//! ```rust
//! use metro_core::calculations::tolerance::{calculate, AccuracyClass, VerificationType};
//!
//! let class: AccuracyClass = " iii ".parse().unwrap();
//! // 5 kg at e = 0.01 kg is exactly 500e, the inclusive end of the 0.5e band
//! let ema = calculate(class, 0.01, 5.0, VerificationType::Initial).unwrap();
//! assert_eq!(ema, 0.005);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::round_to;
use crate::errors::{CalcError, CalcResult};

/// Regulatory accuracy class of a weighing instrument.
///
/// Serializes as its Roman numeral. Deserialization goes through the same
/// case-insensitive parser as [`FromStr`], so `"iii"` and `" III "` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccuracyClass {
    /// Special accuracy
    I,
    /// High accuracy
    II,
    /// Medium accuracy
    III,
    /// Ordinary accuracy
    IIII,
}

/// One row of a tolerance table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBreakpoint {
    /// Inclusive upper bound of the band, in multiples of `e`
    pub upper_bound: f64,
    /// EMA for loads in this band, in multiples of `e`
    pub ema_multiple: f64,
}

const fn bp(upper_bound: f64, ema_multiple: f64) -> ToleranceBreakpoint {
    ToleranceBreakpoint {
        upper_bound,
        ema_multiple,
    }
}

const CLASS_I_TABLE: [ToleranceBreakpoint; 3] = [
    bp(50_000.0, 0.5),
    bp(200_000.0, 1.0),
    bp(f64::INFINITY, 1.5),
];

const CLASS_II_TABLE: [ToleranceBreakpoint; 3] = [
    bp(5_000.0, 0.5),
    bp(20_000.0, 1.0),
    bp(f64::INFINITY, 1.5),
];

const CLASS_III_TABLE: [ToleranceBreakpoint; 3] = [
    bp(500.0, 0.5),
    bp(2_000.0, 1.0),
    bp(f64::INFINITY, 1.5),
];

const CLASS_IIII_TABLE: [ToleranceBreakpoint; 3] = [
    bp(50.0, 0.5),
    bp(200.0, 1.0),
    bp(f64::INFINITY, 1.5),
];

impl AccuracyClass {
    /// All classes, finest first
    pub const ALL: [AccuracyClass; 4] = [
        AccuracyClass::I,
        AccuracyClass::II,
        AccuracyClass::III,
        AccuracyClass::IIII,
    ];

    /// Ordered breakpoint table for this class. The last entry is unbounded.
    pub fn breakpoints(&self) -> &'static [ToleranceBreakpoint] {
        match self {
            AccuracyClass::I => &CLASS_I_TABLE,
            AccuracyClass::II => &CLASS_II_TABLE,
            AccuracyClass::III => &CLASS_III_TABLE,
            AccuracyClass::IIII => &CLASS_IIII_TABLE,
        }
    }

    /// Roman-numeral label
    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyClass::I => "I",
            AccuracyClass::II => "II",
            AccuracyClass::III => "III",
            AccuracyClass::IIII => "IIII",
        }
    }

    /// EMA multiple for a load expressed in multiples of `e`.
    ///
    /// First breakpoint whose upper bound is at or above `multiples_of_e` wins.
    pub fn ema_multiple(&self, multiples_of_e: f64) -> f64 {
        let table = self.breakpoints();
        table
            .iter()
            .find(|bp| multiples_of_e <= bp.upper_bound)
            .or_else(|| table.last())
            .map(|bp| bp.ema_multiple)
            .unwrap_or(1.5)
    }
}

impl fmt::Display for AccuracyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccuracyClass {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "I" => Ok(AccuracyClass::I),
            "II" => Ok(AccuracyClass::II),
            "III" => Ok(AccuracyClass::III),
            "IIII" => Ok(AccuracyClass::IIII),
            _ => Err(CalcError::invalid_class(s)),
        }
    }
}

impl TryFrom<String> for AccuracyClass {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccuracyClass> for String {
    fn from(class: AccuracyClass) -> Self {
        class.as_str().to_string()
    }
}

/// Kind of verification being performed.
///
/// Only `InUse` changes the tolerance (doubled). Labels other than the known
/// ones are treated as initial verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerificationType {
    /// First verification of a new or repaired instrument
    #[default]
    Initial,
    /// Periodic re-verification
    Subsequent,
    /// Supervision of an instrument in service
    InUse,
}

impl VerificationType {
    /// Parse a host-system label. Never fails.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "in_use" | "in-use" | "inuse" | "supervision" => VerificationType::InUse,
            "subsequent" | "periodic" => VerificationType::Subsequent,
            _ => VerificationType::Initial,
        }
    }

    /// Canonical snake_case label
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationType::Initial => "initial",
            VerificationType::Subsequent => "subsequent",
            VerificationType::InUse => "in_use",
        }
    }

    /// Multiplier applied to the tabulated EMA
    pub fn tolerance_factor(&self) -> f64 {
        match self {
            VerificationType::InUse => 2.0,
            VerificationType::Initial | VerificationType::Subsequent => 1.0,
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for VerificationType {
    fn from(value: String) -> Self {
        VerificationType::from_label(&value)
    }
}

impl From<VerificationType> for String {
    fn from(vt: VerificationType) -> Self {
        vt.as_str().to_string()
    }
}

/// EMA evaluated at one load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointTolerance {
    /// Applied load
    pub load: f64,
    /// Maximum permissible error at this load (6 dp)
    pub ema: f64,
    /// Load in multiples of `e`, for display (2 dp)
    pub multiples_of_e: f64,
}

/// A suggested calibration point as a share of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestedPoint {
    /// Share of maximum capacity (0, 25, 50, 75, 100)
    pub percentage: u8,
    /// Load to apply
    pub load: f64,
    /// EMA at that load (0.0 for the zero point)
    pub ema: f64,
}

/// Capacity shares used for the suggested calibration points
pub const SUGGESTED_PERCENTAGES: [u8; 5] = [0, 25, 50, 75, 100];

fn validate_division(e: f64) -> CalcResult<()> {
    if e > 0.0 {
        Ok(())
    } else {
        Err(CalcError::invalid_division(e))
    }
}

/// Calculate the EMA for a load.
///
/// # Errors
///
/// * `CalcError::InvalidDivision` if `e <= 0` (or NaN)
pub fn calculate(
    class: AccuracyClass,
    e: f64,
    load: f64,
    verification_type: VerificationType,
) -> CalcResult<f64> {
    validate_division(e)?;

    let multiples_of_e = load / e;
    let multiple = class.ema_multiple(multiples_of_e);
    let ema = multiple * e * verification_type.tolerance_factor();

    tracing::debug!(
        class = %class,
        e,
        load,
        multiples_of_e,
        multiple,
        verification_type = %verification_type,
        ema,
        "selected tolerance breakpoint"
    );

    Ok(round_to(ema, 6))
}

/// String-tagged entry point for callers holding raw class labels.
///
/// # Errors
///
/// * `CalcError::InvalidClass` if `class` is not I, II, III or IIII
/// * `CalcError::InvalidDivision` if `e <= 0`
pub fn calculate_for_label(
    class: &str,
    e: f64,
    load: f64,
    verification_type: &str,
) -> CalcResult<f64> {
    let class: AccuracyClass = class.parse()?;
    calculate(class, e, load, VerificationType::from_label(verification_type))
}

/// Apply [`calculate`] to each load.
pub fn calculate_for_points(
    class: AccuracyClass,
    e: f64,
    loads: &[f64],
    verification_type: VerificationType,
) -> CalcResult<Vec<PointTolerance>> {
    loads
        .iter()
        .map(|&load| {
            Ok(PointTolerance {
                load,
                ema: calculate(class, e, load, verification_type)?,
                multiples_of_e: round_to(load / e, 2),
            })
        })
        .collect()
}

/// Five calibration points at 0/25/50/75/100 % of capacity.
///
/// The zero point carries an EMA of 0.0 rather than a computed value.
pub fn suggest_points(
    class: AccuracyClass,
    e: f64,
    max_capacity: f64,
    verification_type: VerificationType,
) -> CalcResult<Vec<SuggestedPoint>> {
    validate_division(e)?;

    SUGGESTED_PERCENTAGES
        .iter()
        .map(|&percentage| {
            let load = max_capacity * f64::from(percentage) / 100.0;
            let ema = if percentage == 0 {
                0.0
            } else {
                calculate(class, e, load, verification_type)?
            };
            Ok(SuggestedPoint {
                percentage,
                load,
                ema,
            })
        })
        .collect()
}

/// Eccentricity test load: one third of capacity
pub fn suggest_eccentricity_load(max_capacity: f64) -> f64 {
    max_capacity / 3.0
}

/// Repeatability test load: half of capacity
pub fn suggest_repeatability_load(max_capacity: f64) -> f64 {
    max_capacity * 0.5
}

/// An error conforms when its magnitude does not exceed the EMA magnitude.
pub fn is_conforming(error: f64, ema: f64) -> bool {
    error.abs() <= ema.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_parsing_is_case_insensitive_and_trimmed() {
        assert_eq!("iii".parse::<AccuracyClass>().unwrap(), AccuracyClass::III);
        assert_eq!("  II ".parse::<AccuracyClass>().unwrap(), AccuracyClass::II);
        assert_eq!("IiIi".parse::<AccuracyClass>().unwrap(), AccuracyClass::IIII);
    }

    #[test]
    fn test_invalid_class_rejected() {
        for label in ["IV", "", "V", "3", "I I"] {
            let err = label.parse::<AccuracyClass>().unwrap_err();
            assert_eq!(err.error_code(), "INVALID_CLASS");
        }
        let err = calculate_for_label("X", 0.01, 1.0, "initial").unwrap_err();
        assert_eq!(err, CalcError::invalid_class("X"));
    }

    #[test]
    fn test_invalid_division_rejected() {
        assert_eq!(
            calculate(AccuracyClass::III, 0.0, 1.0, VerificationType::Initial).unwrap_err(),
            CalcError::invalid_division(0.0)
        );
        assert!(calculate(AccuracyClass::III, -0.01, 1.0, VerificationType::Initial).is_err());
        assert!(calculate(AccuracyClass::III, f64::NAN, 1.0, VerificationType::Initial).is_err());
        assert!(suggest_points(AccuracyClass::III, 0.0, 100.0, VerificationType::Initial).is_err());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        // 5 kg / 0.01 kg = 500e, end of the 0.5e band
        let ema = calculate(AccuracyClass::III, 0.01, 5.0, VerificationType::Initial).unwrap();
        assert_eq!(ema, 0.005);

        // Just past the boundary moves to 1.0e
        let ema = calculate(AccuracyClass::III, 0.01, 5.01, VerificationType::Initial).unwrap();
        assert_eq!(ema, 0.01);

        // 2000e is still 1.0e, beyond is 1.5e
        let ema = calculate(AccuracyClass::III, 0.01, 20.0, VerificationType::Initial).unwrap();
        assert_eq!(ema, 0.01);
        let ema = calculate(AccuracyClass::III, 0.01, 30.0, VerificationType::Initial).unwrap();
        assert_eq!(ema, 0.015);
    }

    #[test]
    fn test_canonical_tables() {
        let cases = [
            (AccuracyClass::I, 50_000.0, 200_000.0),
            (AccuracyClass::II, 5_000.0, 20_000.0),
            (AccuracyClass::III, 500.0, 2_000.0),
            (AccuracyClass::IIII, 50.0, 200.0),
        ];
        for (class, first, second) in cases {
            assert_eq!(class.ema_multiple(first), 0.5);
            assert_eq!(class.ema_multiple(first + 1.0), 1.0);
            assert_eq!(class.ema_multiple(second), 1.0);
            assert_eq!(class.ema_multiple(second + 1.0), 1.5);
            assert_eq!(class.ema_multiple(f64::MAX), 1.5);
            assert!(class.breakpoints().last().unwrap().upper_bound.is_infinite());
        }
    }

    #[test]
    fn test_ema_non_decreasing_in_load() {
        for class in AccuracyClass::ALL {
            let e = 0.1;
            let mut previous = 0.0;
            for step in 0..2_000 {
                let load = step as f64 * 17.3;
                let ema = calculate(class, e, load, VerificationType::Initial).unwrap();
                assert!(ema >= previous, "{class} at load {load}");
                previous = ema;
            }
        }
    }

    #[test]
    fn test_in_use_doubles_tolerance() {
        for class in AccuracyClass::ALL {
            for load in [1.0, 4.0, 25.0, 400.0, 60_000.0] {
                let initial = calculate(class, 0.02, load, VerificationType::Initial).unwrap();
                let subsequent =
                    calculate(class, 0.02, load, VerificationType::Subsequent).unwrap();
                let in_use = calculate(class, 0.02, load, VerificationType::InUse).unwrap();
                assert_eq!(initial, subsequent);
                assert!((in_use - 2.0 * initial).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_ema_rounded_to_six_decimals() {
        let ema =
            calculate(AccuracyClass::II, 0.000_000_3, 0.0001, VerificationType::Initial).unwrap();
        // 333.3e -> 0.5e = 1.5e-7, rounds to 0.0
        assert_eq!(ema, 0.0);
        let ema =
            calculate(AccuracyClass::II, 0.000_004, 0.0001, VerificationType::Initial).unwrap();
        assert_eq!(ema, 0.000_002);
    }

    #[test]
    fn test_calculate_for_points() {
        let points = calculate_for_points(
            AccuracyClass::III,
            0.05,
            &[1.0, 10.0, 150.0],
            VerificationType::Initial,
        )
        .unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].multiples_of_e, 20.0);
        assert_eq!(points[0].ema, 0.025);
        assert_eq!(points[1].multiples_of_e, 200.0);
        assert_eq!(points[1].ema, 0.025);
        assert_eq!(points[2].multiples_of_e, 3000.0);
        assert_eq!(points[2].ema, 0.075);
        assert_eq!(points[2].load, 150.0);
    }

    #[test]
    fn test_suggest_points() {
        let points =
            suggest_points(AccuracyClass::III, 0.01, 30.0, VerificationType::Initial).unwrap();
        let percentages: Vec<u8> = points.iter().map(|p| p.percentage).collect();
        assert_eq!(percentages, vec![0, 25, 50, 75, 100]);
        assert_eq!(points[0].load, 0.0);
        assert_eq!(points[0].ema, 0.0);
        assert_eq!(points[1].load, 7.5);
        assert_eq!(points[1].ema, 0.01);
        assert_eq!(points[4].load, 30.0);
        assert_eq!(points[4].ema, 0.015);
    }

    #[test]
    fn test_load_heuristics() {
        assert!((suggest_eccentricity_load(30.0) - 10.0).abs() < 1e-12);
        assert_eq!(suggest_repeatability_load(30.0), 15.0);
    }

    #[test]
    fn test_is_conforming() {
        assert!(is_conforming(0.004, 0.005));
        assert!(is_conforming(-0.005, 0.005));
        assert!(!is_conforming(0.006, 0.005));
        assert!(!is_conforming(-0.006, 0.005));
    }

    #[test]
    fn test_verification_type_labels() {
        assert_eq!(VerificationType::from_label("in_use"), VerificationType::InUse);
        assert_eq!(VerificationType::from_label(" IN_USE "), VerificationType::InUse);
        assert_eq!(VerificationType::from_label("subsequent"), VerificationType::Subsequent);
        assert_eq!(VerificationType::from_label("initial"), VerificationType::Initial);
        assert_eq!(VerificationType::from_label("whatever"), VerificationType::Initial);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&AccuracyClass::IIII).unwrap();
        assert_eq!(json, "\"IIII\"");
        let class: AccuracyClass = serde_json::from_str("\"ii\"").unwrap();
        assert_eq!(class, AccuracyClass::II);
        assert!(serde_json::from_str::<AccuracyClass>("\"IV\"").is_err());

        let vt: VerificationType = serde_json::from_str("\"in_use\"").unwrap();
        assert_eq!(vt, VerificationType::InUse);
        assert_eq!(serde_json::to_string(&vt).unwrap(), "\"in_use\"");
    }
}
