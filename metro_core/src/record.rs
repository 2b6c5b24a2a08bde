//! # Calibration Record Data Structures
//!
//! The host application's view of a calibration session, as handed to the
//! engine. The engine never persists these; they arrive fully assembled
//! (readings, eccentricity tests, standard weights and repeatability tests
//! already attached).
//!
//! ## Structure
//!
//! ```text
//! CalibrationHistoryStore
//! ├── version: schema version of the document
//! └── records: Vec<CalibrationRecord>
//!     ├── certificate / laboratory / client metadata
//!     ├── environmental conditions
//!     ├── readings: Vec<MeasurementPoint>
//!     ├── eccentricity_tests: Vec<EccentricityTest>
//!     ├── standard_weights: Vec<StandardWeight>
//!     └── repeatability_tests: Vec<RepeatabilityTest>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use metro_core::record::{CalibrationRecord, MeasurementPoint};
//!
//! let mut record = CalibrationRecord::new(1, 42);
//! record.readings.push(MeasurementPoint::new(10.0, "kg").with_indication(10.002));
//!
//! let json = serde_json::to_string_pretty(&record).unwrap();
//! let back: CalibrationRecord = serde_json::from_str(&json).unwrap();
//! assert_eq!(back.readings[0].error(), record.readings[0].error());
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calculations::tolerance::{AccuracyClass, VerificationType};

/// Current schema version for history documents
pub const SCHEMA_VERSION: &str = "0.1.0";

/// One calibration point as recorded by the technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    /// Conventional value of the applied reference load
    pub reference_value: f64,

    /// Indication with increasing loads
    #[serde(default)]
    pub indication_increasing: Option<f64>,

    /// Indication with decreasing loads
    #[serde(default)]
    pub indication_decreasing: Option<f64>,

    /// Coverage factor used for this point
    #[serde(default = "default_k_factor")]
    pub k_factor: f64,

    /// Unit label (not converted)
    pub unit: String,

    /// Expanded uncertainty, once computed
    #[serde(default)]
    pub expanded_uncertainty: Option<f64>,
}

fn default_k_factor() -> f64 {
    crate::calculations::uncertainty::DEFAULT_COVERAGE_FACTOR
}

impl MeasurementPoint {
    /// Create a point with no indications yet
    pub fn new(reference_value: f64, unit: impl Into<String>) -> Self {
        MeasurementPoint {
            reference_value,
            indication_increasing: None,
            indication_decreasing: None,
            k_factor: default_k_factor(),
            unit: unit.into(),
            expanded_uncertainty: None,
        }
    }

    /// Set the increasing-load indication
    pub fn with_indication(mut self, indication: f64) -> Self {
        self.indication_increasing = Some(indication);
        self
    }

    /// Set the decreasing-load indication
    pub fn with_decreasing_indication(mut self, indication: f64) -> Self {
        self.indication_decreasing = Some(indication);
        self
    }

    /// Set the expanded uncertainty
    pub fn with_expanded_uncertainty(mut self, expanded: f64) -> Self {
        self.expanded_uncertainty = Some(expanded);
        self
    }

    /// Indication error: increasing indication minus reference
    pub fn error(&self) -> Option<f64> {
        self.indication_increasing.map(|ind| ind - self.reference_value)
    }

    /// Hysteresis: decreasing minus increasing indication
    pub fn hysteresis(&self) -> Option<f64> {
        match (self.indication_increasing, self.indication_decreasing) {
            (Some(up), Some(down)) => Some(down - up),
            _ => None,
        }
    }
}

/// Indication at one platform position during the eccentricity test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EccentricityTest {
    /// Position label ("Center", "Front", ...)
    pub position: String,
    pub load_applied: f64,
    #[serde(default)]
    pub indication: Option<f64>,
}

/// A reference weight used during calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardWeight {
    pub id: u64,
    /// Inventory code
    pub code: String,
    pub nominal_value: f64,
    pub unit: String,
    /// OIML weight class (E1, E2, F1, F2, M1, ...)
    #[serde(default)]
    pub precision_class: Option<String>,
    #[serde(default)]
    pub certificate_number: Option<String>,
    #[serde(default)]
    pub certificate_expiry: Option<NaiveDate>,
}

/// A repeatability series at one fixed load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatabilityTest {
    pub load: f64,
    /// Readings; blank cells are `None`
    #[serde(default)]
    pub measurements: Vec<Option<f64>>,
}

/// Assembled calibration record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationRecord {
    pub id: u64,
    pub equipment_id: u64,

    // === Certificate ===
    /// Present only once the certificate has been issued
    pub certificate_number: Option<String>,
    pub calibration_date: Option<NaiveDate>,
    pub laboratory_name: Option<String>,
    pub client_name: Option<String>,
    /// Person who authorized the certificate
    pub approved_by: Option<String>,

    // === Item identification ===
    pub serial_number: Option<String>,
    pub internal_code: Option<String>,
    pub accuracy_class: Option<AccuracyClass>,

    // === Session setup ===
    pub calibration_location: Option<String>,
    /// "laboratory", "field", ...
    pub calibration_location_type: Option<String>,
    pub calibration_method: Option<String>,
    pub calibration_type: Option<String>,
    pub mass_unit: Option<String>,
    pub verification_type: Option<VerificationType>,
    /// Verification division `e`
    pub verification_division: Option<f64>,

    // === Environment ===
    /// °C
    pub temperature: Option<f64>,
    /// %RH
    pub humidity: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,

    // === Conformity ===
    pub conformity_declared: bool,
    pub max_permissible_error: Option<f64>,

    // === Measurements ===
    pub readings: Vec<MeasurementPoint>,
    pub eccentricity_tests: Vec<EccentricityTest>,
    pub standard_weights: Vec<StandardWeight>,
    pub repeatability_tests: Vec<RepeatabilityTest>,
}

impl CalibrationRecord {
    /// Create an empty record for an equipment
    pub fn new(id: u64, equipment_id: u64) -> Self {
        CalibrationRecord {
            id,
            equipment_id,
            ..Default::default()
        }
    }

    /// True when a non-blank certificate number has been issued
    pub fn is_certified(&self) -> bool {
        has_text(&self.certificate_number)
    }
}

/// Collection of past calibration records, serialized as a versioned document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationHistoryStore {
    /// Schema version (for migration compatibility)
    pub version: String,
    #[serde(default)]
    pub records: Vec<CalibrationRecord>,
}

impl CalibrationHistoryStore {
    /// Create an empty store at the current schema version
    pub fn new() -> Self {
        CalibrationHistoryStore {
            version: SCHEMA_VERSION.to_string(),
            records: Vec::new(),
        }
    }

    /// Add a record
    pub fn push(&mut self, record: CalibrationRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for CalibrationHistoryStore {
    fn default() -> Self {
        CalibrationHistoryStore::new()
    }
}

/// True for `Some` with non-whitespace content
pub(crate) fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_error_and_hysteresis() {
        let point = MeasurementPoint::new(10.0, "kg")
            .with_indication(10.5)
            .with_decreasing_indication(10.75);
        assert_eq!(point.error(), Some(0.5));
        assert_eq!(point.hysteresis(), Some(0.25));

        let empty = MeasurementPoint::new(10.0, "kg");
        assert!(empty.error().is_none());
        assert!(empty.hysteresis().is_none());
    }

    #[test]
    fn test_point_defaults_when_deserializing() {
        let point: MeasurementPoint =
            serde_json::from_str(r#"{ "reference_value": 5.0, "unit": "kg" }"#).unwrap();
        assert_eq!(point.k_factor, 2.0);
        assert!(point.indication_increasing.is_none());
    }

    #[test]
    fn test_record_accepts_partial_json() {
        let json = r#"{
            "id": 7,
            "equipment_id": 3,
            "accuracy_class": "iii",
            "verification_type": "in_use"
        }"#;
        let record: CalibrationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.accuracy_class, Some(AccuracyClass::III));
        assert_eq!(record.verification_type, Some(VerificationType::InUse));
        assert!(record.readings.is_empty());
        assert!(!record.is_certified());
    }

    #[test]
    fn test_blank_certificate_is_not_certified() {
        let mut record = CalibrationRecord::new(1, 1);
        record.certificate_number = Some("   ".to_string());
        assert!(!record.is_certified());
        record.certificate_number = Some("CERT-001".to_string());
        assert!(record.is_certified());
    }

    #[test]
    fn test_store_starts_at_current_version() {
        let mut store = CalibrationHistoryStore::new();
        assert_eq!(store.version, SCHEMA_VERSION);
        assert!(store.is_empty());
        store.push(CalibrationRecord::new(1, 1));
        assert_eq!(store.len(), 1);
    }
}
