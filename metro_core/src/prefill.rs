//! # Calibration Prefill
//!
//! Builds a carry-forward template for a new calibration session from the most
//! recent certified calibration of the same equipment.
//!
//! The template carries **structure**, never regulated values: measurement
//! points keep their reference value, unit and k-factor but not their
//! indications; eccentricity keeps the load and position labels but not the
//! readings; repeatability keeps the load and sample count but not the
//! measurements. Those must be measured again.
//!
//! ## Example
//!
//! ```rust
//! use metro_core::prefill::build_prefill;
//! use metro_core::record::{CalibrationHistoryStore, CalibrationRecord, MeasurementPoint};
//!
//! let mut prior = CalibrationRecord::new(1, 42);
//! prior.certificate_number = Some("CERT-001".to_string());
//! prior.readings.push(MeasurementPoint::new(10.0, "kg").with_indication(10.002));
//!
//! let mut store = CalibrationHistoryStore::new();
//! store.push(prior);
//!
//! let template = build_prefill(&store, 42).unwrap().expect("certified prior");
//! assert_eq!(template.reading_structure[0].reference_value, 10.0);
//!
//! // First-time calibration: nothing to carry forward
//! assert!(build_prefill(&store, 7).unwrap().is_none());
//! ```

use std::convert::Infallible;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calculations::tolerance::VerificationType;
use crate::record::{CalibrationHistoryStore, CalibrationRecord, StandardWeight};

/// Lookup of past calibrations, provided by the host application.
///
/// Implementations return the most recent record (by calibration date) for the
/// equipment that carries a certificate number, with readings, eccentricity
/// tests, standard weights and repeatability tests attached. Retry and timeout
/// policy belong to the implementation.
pub trait CalibrationHistory {
    type Error;

    fn latest_certified(&self, equipment_id: u64) -> Result<Option<CalibrationRecord>, Self::Error>;
}

impl CalibrationHistory for CalibrationHistoryStore {
    type Error = Infallible;

    fn latest_certified(
        &self,
        equipment_id: u64,
    ) -> Result<Option<CalibrationRecord>, Self::Error> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.equipment_id == equipment_id && r.is_certified())
            .max_by_key(|r| (r.calibration_date, r.id))
            .cloned())
    }
}

/// Descriptive metadata of a reference weight used last time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardWeightSummary {
    pub id: u64,
    pub code: String,
    pub nominal_value: f64,
    pub unit: String,
    pub precision_class: Option<String>,
    pub certificate_number: Option<String>,
    pub certificate_expiry: Option<NaiveDate>,
}

impl From<&StandardWeight> for StandardWeightSummary {
    fn from(w: &StandardWeight) -> Self {
        StandardWeightSummary {
            id: w.id,
            code: w.code.clone(),
            nominal_value: w.nominal_value,
            unit: w.unit.clone(),
            precision_class: w.precision_class.clone(),
            certificate_number: w.certificate_number.clone(),
            certificate_expiry: w.certificate_expiry,
        }
    }
}

/// A measurement point without its indications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStructure {
    pub reference_value: f64,
    pub unit: String,
    pub k_factor: f64,
}

/// Eccentricity setup without readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EccentricityStructure {
    pub load: f64,
    pub positions: Vec<String>,
}

/// Repeatability setup without measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatabilityStructure {
    pub load: f64,
    /// Readings actually taken last time; blank cells are not counted
    pub sample_count: usize,
}

/// Carry-forward template for a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefillTemplate {
    // === Source ===
    pub source_calibration_id: u64,
    pub source_certificate_number: Option<String>,
    pub source_calibration_date: Option<NaiveDate>,

    // === Environment ===
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,

    // === Session setup ===
    pub calibration_location: Option<String>,
    pub calibration_location_type: Option<String>,
    pub calibration_method: Option<String>,
    pub calibration_type: Option<String>,
    pub laboratory_name: Option<String>,
    pub mass_unit: Option<String>,
    pub verification_type: Option<VerificationType>,
    pub verification_division: Option<f64>,

    // === Standards ===
    pub weight_ids: Vec<u64>,
    pub standard_weights: Vec<StandardWeightSummary>,

    // === Structure only ===
    pub reading_structure: Vec<PointStructure>,
    pub eccentricity_structure: Option<EccentricityStructure>,
    pub repeatability_structure: Option<RepeatabilityStructure>,
}

impl PrefillTemplate {
    /// Derive the template from a prior certified record.
    pub fn from_record(record: &CalibrationRecord) -> Self {
        let reading_structure = record
            .readings
            .iter()
            .map(|r| PointStructure {
                reference_value: r.reference_value,
                unit: r.unit.clone(),
                k_factor: r.k_factor,
            })
            .collect();

        let eccentricity_structure = record
            .eccentricity_tests
            .first()
            .map(|first| EccentricityStructure {
                load: first.load_applied,
                positions: record
                    .eccentricity_tests
                    .iter()
                    .map(|t| t.position.clone())
                    .collect(),
            });

        let repeatability_structure = record
            .repeatability_tests
            .first()
            .map(|t| RepeatabilityStructure {
                load: t.load,
                sample_count: t.measurements.iter().flatten().count(),
            });

        PrefillTemplate {
            source_calibration_id: record.id,
            source_certificate_number: record.certificate_number.clone(),
            source_calibration_date: record.calibration_date,
            temperature: record.temperature,
            humidity: record.humidity,
            pressure: record.pressure,
            calibration_location: record.calibration_location.clone(),
            calibration_location_type: record.calibration_location_type.clone(),
            calibration_method: record.calibration_method.clone(),
            calibration_type: record.calibration_type.clone(),
            laboratory_name: record.laboratory_name.clone(),
            mass_unit: record.mass_unit.clone(),
            verification_type: record.verification_type,
            verification_division: record.verification_division,
            weight_ids: record.standard_weights.iter().map(|w| w.id).collect(),
            standard_weights: record
                .standard_weights
                .iter()
                .map(StandardWeightSummary::from)
                .collect(),
            reading_structure,
            eccentricity_structure,
            repeatability_structure,
        }
    }
}

/// Build a prefill template for `equipment_id`.
///
/// Returns `Ok(None)` when the equipment has no certified prior calibration.
/// Errors come only from the history lookup.
pub fn build_prefill<H>(history: &H, equipment_id: u64) -> Result<Option<PrefillTemplate>, H::Error>
where
    H: CalibrationHistory + ?Sized,
{
    let Some(prior) = history.latest_certified(equipment_id)? else {
        tracing::info!(equipment_id, "no certified prior calibration to carry forward");
        return Ok(None);
    };

    tracing::debug!(
        equipment_id,
        source_calibration_id = prior.id,
        readings = prior.readings.len(),
        "building prefill template"
    );

    Ok(Some(PrefillTemplate::from_record(&prior)))
}
