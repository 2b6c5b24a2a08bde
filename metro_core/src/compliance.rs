//! # Certificate Completeness (ISO/IEC 17025 §7.8)
//!
//! Runs the fixed 16-item checklist of mandatory certificate content against an
//! assembled [`CalibrationRecord`]. The validator never fails: anything absent
//! simply lands in `missing`.
//!
//! Four checks are always satisfied because the certificate template supplies
//! them as fixed text: title, scope declaration, traceability declaration and
//! the before/after-adjustment note.
//!
//! ## Example
//!
//! ```rust
//! use metro_core::compliance::{validate, ComplianceCheck};
//! use metro_core::record::CalibrationRecord;
//!
//! let report = validate(&CalibrationRecord::new(1, 1));
//! assert!(!report.valid);
//! assert_eq!(report.total, 16);
//! assert!(report.missing.contains(&ComplianceCheck::CertificateNumber));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{has_text, CalibrationRecord};

/// One mandatory certificate element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCheck {
    Title,
    LaboratoryName,
    CalibrationLocation,
    CertificateNumber,
    ClientName,
    CalibrationMethod,
    ItemIdentification,
    CalibrationDate,
    ScopeDeclaration,
    MeasurementResults,
    Authorizer,
    MeasurementUncertainty,
    EnvironmentalConditions,
    Traceability,
    AdjustmentNote,
    ConformityDeclaration,
}

impl ComplianceCheck {
    /// All checks in certificate order
    pub const ALL: [ComplianceCheck; 16] = [
        ComplianceCheck::Title,
        ComplianceCheck::LaboratoryName,
        ComplianceCheck::CalibrationLocation,
        ComplianceCheck::CertificateNumber,
        ComplianceCheck::ClientName,
        ComplianceCheck::CalibrationMethod,
        ComplianceCheck::ItemIdentification,
        ComplianceCheck::CalibrationDate,
        ComplianceCheck::ScopeDeclaration,
        ComplianceCheck::MeasurementResults,
        ComplianceCheck::Authorizer,
        ComplianceCheck::MeasurementUncertainty,
        ComplianceCheck::EnvironmentalConditions,
        ComplianceCheck::Traceability,
        ComplianceCheck::AdjustmentNote,
        ComplianceCheck::ConformityDeclaration,
    ];

    /// Stable snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            ComplianceCheck::Title => "title",
            ComplianceCheck::LaboratoryName => "laboratory_name",
            ComplianceCheck::CalibrationLocation => "calibration_location",
            ComplianceCheck::CertificateNumber => "certificate_number",
            ComplianceCheck::ClientName => "client_name",
            ComplianceCheck::CalibrationMethod => "calibration_method",
            ComplianceCheck::ItemIdentification => "item_identification",
            ComplianceCheck::CalibrationDate => "calibration_date",
            ComplianceCheck::ScopeDeclaration => "scope_declaration",
            ComplianceCheck::MeasurementResults => "measurement_results",
            ComplianceCheck::Authorizer => "authorizer",
            ComplianceCheck::MeasurementUncertainty => "measurement_uncertainty",
            ComplianceCheck::EnvironmentalConditions => "environmental_conditions",
            ComplianceCheck::Traceability => "traceability",
            ComplianceCheck::AdjustmentNote => "adjustment_note",
            ComplianceCheck::ConformityDeclaration => "conformity_declaration",
        }
    }

    /// Whether `record` satisfies this check
    pub fn is_satisfied(&self, record: &CalibrationRecord) -> bool {
        match self {
            ComplianceCheck::Title
            | ComplianceCheck::ScopeDeclaration
            | ComplianceCheck::Traceability
            | ComplianceCheck::AdjustmentNote => true,
            ComplianceCheck::LaboratoryName => has_text(&record.laboratory_name),
            ComplianceCheck::CalibrationLocation => {
                has_text(&record.calibration_location)
                    || has_text(&record.calibration_location_type)
            }
            ComplianceCheck::CertificateNumber => has_text(&record.certificate_number),
            ComplianceCheck::ClientName => has_text(&record.client_name),
            ComplianceCheck::CalibrationMethod => has_text(&record.calibration_method),
            ComplianceCheck::ItemIdentification => {
                has_text(&record.serial_number) || has_text(&record.internal_code)
            }
            ComplianceCheck::CalibrationDate => record.calibration_date.is_some(),
            ComplianceCheck::MeasurementResults => !record.readings.is_empty(),
            ComplianceCheck::Authorizer => has_text(&record.approved_by),
            ComplianceCheck::MeasurementUncertainty => record
                .readings
                .iter()
                .any(|r| r.expanded_uncertainty.is_some()),
            ComplianceCheck::EnvironmentalConditions => {
                record.temperature.is_some() || record.humidity.is_some()
            }
            ComplianceCheck::ConformityDeclaration => {
                record.conformity_declared || record.max_permissible_error.is_some()
            }
        }
    }
}

impl fmt::Display for ComplianceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of the checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// True only when every check passes
    pub valid: bool,
    pub total: usize,
    pub filled_count: usize,
    pub missing: Vec<ComplianceCheck>,
    pub filled: Vec<ComplianceCheck>,
}

impl ComplianceReport {
    /// Share of checks filled, 0-100
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        crate::calculations::round_to(self.filled_count as f64 / self.total as f64 * 100.0, 1)
    }
}

/// Run the checklist against a record.
pub fn validate(record: &CalibrationRecord) -> ComplianceReport {
    let (filled, missing): (Vec<ComplianceCheck>, Vec<ComplianceCheck>) = ComplianceCheck::ALL
        .into_iter()
        .partition(|check| check.is_satisfied(record));

    if !missing.is_empty() {
        tracing::debug!(
            record_id = record.id,
            missing = ?missing.iter().map(ComplianceCheck::name).collect::<Vec<_>>(),
            "certificate incomplete"
        );
    }

    ComplianceReport {
        valid: missing.is_empty(),
        total: ComplianceCheck::ALL.len(),
        filled_count: filled.len(),
        missing,
        filled,
    }
}
