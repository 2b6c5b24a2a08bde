//! # Engine Settings
//!
//! Tunable defaults for the calibration workflow. None of these change the
//! regulatory tables; they only fill in values a caller did not supply.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "default_coverage_factor": 2.0,
//!   "repeatability_sample_count": 10,
//!   "minimum_repeatability_samples": 6,
//!   "eccentricity_positions": ["Center", "Front", "Back", "Left", "Right"],
//!   "wear_mpe_fraction": 0.0001
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::calculations::uncertainty::DEFAULT_COVERAGE_FACTOR;
use crate::errors::{CalcError, CalcResult};

/// Engine-wide defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Coverage factor when the caller gives none
    pub default_coverage_factor: f64,

    /// Number of repeatability readings to request
    pub repeatability_sample_count: usize,

    /// Fewest repeatability readings worth reporting
    pub minimum_repeatability_samples: usize,

    /// Platform positions for the eccentricity test; the first is the reference
    pub eccentricity_positions: Vec<String>,

    /// Reference-weight MPE as a fraction of nominal mass, when none is supplied
    pub wear_mpe_fraction: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            default_coverage_factor: DEFAULT_COVERAGE_FACTOR,
            repeatability_sample_count: 10,
            minimum_repeatability_samples: 6,
            eccentricity_positions: ["Center", "Front", "Back", "Left", "Right"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            wear_mpe_fraction: 0.0001,
        }
    }
}

impl EngineSettings {
    /// Validate settings values.
    pub fn validate(&self) -> CalcResult<()> {
        if !(self.default_coverage_factor > 0.0) {
            return Err(CalcError::invalid_input(
                "default_coverage_factor",
                self.default_coverage_factor.to_string(),
                "Coverage factor must be positive",
            ));
        }
        if self.repeatability_sample_count < 2 {
            return Err(CalcError::invalid_input(
                "repeatability_sample_count",
                self.repeatability_sample_count.to_string(),
                "At least two readings are needed for a standard deviation",
            ));
        }
        if self.minimum_repeatability_samples > self.repeatability_sample_count {
            return Err(CalcError::invalid_input(
                "minimum_repeatability_samples",
                self.minimum_repeatability_samples.to_string(),
                "Minimum cannot exceed the requested sample count",
            ));
        }
        if self.eccentricity_positions.is_empty() {
            return Err(CalcError::invalid_input(
                "eccentricity_positions",
                "[]",
                "At least one position is required",
            ));
        }
        if !(self.wear_mpe_fraction > 0.0) {
            return Err(CalcError::invalid_input(
                "wear_mpe_fraction",
                self.wear_mpe_fraction.to_string(),
                "MPE fraction must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EngineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.default_coverage_factor, 2.0);
        assert_eq!(settings.eccentricity_positions.len(), 5);
        assert_eq!(settings.eccentricity_positions[0], "Center");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{ "repeatability_sample_count": 6 }"#).unwrap();
        assert_eq!(settings.repeatability_sample_count, 6);
        assert_eq!(settings.default_coverage_factor, 2.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = EngineSettings::default();
        settings.default_coverage_factor = 0.0;
        let err = settings.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let mut settings = EngineSettings::default();
        settings.repeatability_sample_count = 1;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.eccentricity_positions.clear();
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.wear_mpe_fraction = f64::NAN;
        assert!(settings.validate().is_err());
    }
}
