//! # Verification Session Helpers
//!
//! Builds on the tolerance table to plan a verification session and to
//! evaluate what the technician recorded: per-point errors against the EMA and
//! eccentricity deviations relative to the center position.

use serde::{Deserialize, Serialize};

use super::tolerance::{
    self, is_conforming, suggest_eccentricity_load, suggest_repeatability_load, AccuracyClass,
    SuggestedPoint, VerificationType,
};
use crate::errors::CalcResult;
use crate::record::{EccentricityTest, MeasurementPoint};
use crate::settings::EngineSettings;

/// Everything the technician needs to start a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub points: Vec<SuggestedPoint>,
    pub eccentricity_load: f64,
    pub eccentricity_positions: Vec<String>,
    pub repeatability_load: f64,
    pub repeatability_sample_count: usize,
}

/// Suggested points plus eccentricity and repeatability setup.
pub fn suggest_session_plan(
    class: AccuracyClass,
    e: f64,
    max_capacity: f64,
    verification_type: VerificationType,
    settings: &EngineSettings,
) -> CalcResult<SessionPlan> {
    let points = tolerance::suggest_points(class, e, max_capacity, verification_type)?;

    Ok(SessionPlan {
        points,
        eccentricity_load: suggest_eccentricity_load(max_capacity),
        eccentricity_positions: settings.eccentricity_positions.clone(),
        repeatability_load: suggest_repeatability_load(max_capacity),
        repeatability_sample_count: settings.repeatability_sample_count,
    })
}

/// Error, EMA and conformity of one recorded point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointEvaluation {
    pub reference_value: f64,
    pub error: Option<f64>,
    pub hysteresis: Option<f64>,
    /// Absent for non-positive reference values
    pub ema: Option<f64>,
    /// Absent unless both error and EMA are known
    pub conforming: Option<bool>,
}

/// Evaluate recorded points against the class tolerance.
pub fn evaluate_points(
    class: AccuracyClass,
    e: f64,
    verification_type: VerificationType,
    points: &[MeasurementPoint],
) -> CalcResult<Vec<PointEvaluation>> {
    points
        .iter()
        .map(|point| {
            let error = point.error();
            let ema = if point.reference_value > 0.0 {
                Some(tolerance::calculate(class, e, point.reference_value, verification_type)?)
            } else {
                None
            };
            let conforming = match (error, ema) {
                (Some(err), Some(ema)) => Some(is_conforming(err, ema)),
                _ => None,
            };
            Ok(PointEvaluation {
                reference_value: point.reference_value,
                error,
                hysteresis: point.hysteresis(),
                ema,
                conforming,
            })
        })
        .collect()
}

/// Deviation of one position from the reference (first) position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDeviation {
    pub position: String,
    /// `None` for the reference position or a missing indication
    pub deviation: Option<f64>,
}

/// Summary of an eccentricity test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EccentricityEvaluation {
    pub deviations: Vec<PositionDeviation>,
    /// Largest absolute deviation, if any position could be compared
    pub max_deviation: Option<f64>,
    pub conforming: Option<bool>,
}

/// Compare each position's indication to the first position's.
pub fn evaluate_eccentricity(tests: &[EccentricityTest], ema: f64) -> EccentricityEvaluation {
    let reference = tests.first().and_then(|t| t.indication);

    let deviations: Vec<PositionDeviation> = tests
        .iter()
        .enumerate()
        .map(|(idx, test)| {
            let deviation = match (idx, reference, test.indication) {
                (0, _, _) => None,
                (_, Some(center), Some(ind)) => Some(ind - center),
                _ => None,
            };
            PositionDeviation {
                position: test.position.clone(),
                deviation,
            }
        })
        .collect();

    let max_deviation = deviations
        .iter()
        .filter_map(|d| d.deviation)
        .map(f64::abs)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |m| m.max(d))));

    EccentricityEvaluation {
        conforming: max_deviation.map(|d| is_conforming(d, ema)),
        deviations,
        max_deviation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ecc(position: &str, indication: Option<f64>) -> EccentricityTest {
        EccentricityTest {
            position: position.to_string(),
            load_applied: 10.0,
            indication,
        }
    }

    #[test]
    fn test_session_plan() {
        let settings = EngineSettings::default();
        let plan = suggest_session_plan(
            AccuracyClass::III,
            0.01,
            30.0,
            VerificationType::Initial,
            &settings,
        )
        .unwrap();
        assert_eq!(plan.points.len(), 5);
        assert!((plan.eccentricity_load - 10.0).abs() < 1e-12);
        assert_eq!(plan.repeatability_load, 15.0);
        assert_eq!(plan.repeatability_sample_count, 10);
        assert_eq!(plan.eccentricity_positions, settings.eccentricity_positions);
    }

    #[test]
    fn test_session_plan_rejects_bad_division() {
        let settings = EngineSettings::default();
        let err = suggest_session_plan(
            AccuracyClass::III,
            0.0,
            30.0,
            VerificationType::Initial,
            &settings,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DIVISION");
    }

    #[test]
    fn test_evaluate_points() {
        let points = vec![
            MeasurementPoint::new(0.0, "kg").with_indication(0.0),
            MeasurementPoint::new(5.0, "kg").with_indication(5.0).with_decreasing_indication(5.0),
            MeasurementPoint::new(20.0, "kg").with_indication(20.5),
            MeasurementPoint::new(10.0, "kg"),
        ];
        let evals =
            evaluate_points(AccuracyClass::III, 0.01, VerificationType::Initial, &points).unwrap();

        assert_eq!(evals[0].ema, None);
        assert_eq!(evals[0].conforming, None);

        assert_eq!(evals[1].error, Some(0.0));
        assert_eq!(evals[1].hysteresis, Some(0.0));
        assert_eq!(evals[1].ema, Some(0.005));
        assert_eq!(evals[1].conforming, Some(true));

        assert_eq!(evals[2].error, Some(0.5));
        assert_eq!(evals[2].conforming, Some(false));

        assert_eq!(evals[3].error, None);
        assert_eq!(evals[3].ema, Some(0.01));
        assert_eq!(evals[3].conforming, None);
    }

    #[test]
    fn test_eccentricity_relative_to_center() {
        let tests = vec![
            ecc("Center", Some(10.0)),
            ecc("Front", Some(10.25)),
            ecc("Back", Some(9.5)),
            ecc("Left", None),
            ecc("Right", Some(10.0)),
        ];
        let result = evaluate_eccentricity(&tests, 1.0);
        assert_eq!(result.deviations[0].deviation, None);
        assert_eq!(result.deviations[1].deviation, Some(0.25));
        assert_eq!(result.deviations[2].deviation, Some(-0.5));
        assert_eq!(result.deviations[3].deviation, None);
        assert_eq!(result.deviations[4].deviation, Some(0.0));
        assert_eq!(result.max_deviation, Some(0.5));
        assert_eq!(result.conforming, Some(true));

        let strict = evaluate_eccentricity(&tests, 0.25);
        assert_eq!(strict.conforming, Some(false));
    }

    #[test]
    fn test_eccentricity_without_center_reading() {
        let tests = vec![ecc("Center", None), ecc("Front", Some(10.0))];
        let result = evaluate_eccentricity(&tests, 1.0);
        assert!(result.deviations.iter().all(|d| d.deviation.is_none()));
        assert_eq!(result.max_deviation, None);
        assert_eq!(result.conforming, None);

        let empty = evaluate_eccentricity(&[], 1.0);
        assert!(empty.deviations.is_empty());
    }
}
