//! # Uncertainty Engine
//!
//! Repeatability statistics (Type A) and the combined/expanded uncertainty
//! budget for a calibration point.
//!
//! ## Formulas
//!
//! - Sample standard deviation: `s = √(Σ(x - x̄)² / (n - 1))`
//! - Type A (standard error of the mean): `u_A = s / √n`
//! - Type B from resolution (rectangular): `u_res = d / (2√3)`
//! - Combined (independent contributions): `u_c = √(u_A² + u_res² + u_w²)`
//! - Expanded: `U = k · u_c`
//!
//! ## Example
//!
//! ```rust
//! use metro_core::calculations::uncertainty::{
//!     calculate_expanded_uncertainty, calculate_repeatability,
//! };
//!
//! let stats = calculate_repeatability(&[Some(9.0), None, Some(10.0), Some(11.0)]);
//! assert_eq!(stats.n, 3);
//! assert_eq!(stats.mean, Some(10.0));
//!
//! let budget = calculate_expanded_uncertainty(0.01, 0.02, 0.0, 2.0);
//! assert_eq!(budget.expanded_uncertainty, 0.023094);
//! ```

use serde::{Deserialize, Serialize};

use super::round_to;

/// Default coverage factor (≈95 % confidence)
pub const DEFAULT_COVERAGE_FACTOR: f64 = 2.0;

/// Summary statistics for one repeatability series.
///
/// Fields are `None` when undefined for the number of valid samples:
/// no samples gives no mean; a single sample gives no spread.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RepeatabilityStats {
    /// Arithmetic mean (4 dp)
    pub mean: Option<f64>,
    /// Bessel-corrected sample standard deviation (6 dp)
    pub std_deviation: Option<f64>,
    /// Standard error of the mean (6 dp)
    pub uncertainty_type_a: Option<f64>,
    /// Number of valid samples used
    pub n: usize,
}

/// Uncertainty budget for one measurement. Recomputed on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBudget {
    pub uncertainty_type_a: f64,
    /// Type B contribution from indicator resolution
    pub uncertainty_type_b_resolution: f64,
    /// Contribution of the reference weights
    pub uncertainty_weight: f64,
    pub combined_uncertainty: f64,
    /// Coverage factor, passed through unrounded
    pub k_factor: f64,
    pub expanded_uncertainty: f64,
}

impl UncertaintyBudget {
    /// Certificate statement such as `"10.0000 ± 0.0231 kg (k=2)"`.
    pub fn statement(&self, mean: f64, unit: &str) -> String {
        format_measurement_result(mean, self.expanded_uncertainty, unit, self.k_factor)
    }
}

/// Parse free-form entries, mapping blank or non-numeric cells to `None`.
pub fn parse_measurements<S: AsRef<str>>(entries: &[S]) -> Vec<Option<f64>> {
    entries
        .iter()
        .map(|entry| {
            let trimmed = entry.as_ref().trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.replace(',', ".").parse::<f64>().ok()
            }
        })
        .collect()
}

/// Compute repeatability statistics, skipping missing and non-finite entries.
pub fn calculate_repeatability(measurements: &[Option<f64>]) -> RepeatabilityStats {
    let values: Vec<f64> = measurements
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    let n = values.len();

    if n == 0 {
        return RepeatabilityStats::default();
    }

    let mean = values.iter().sum::<f64>() / n as f64;

    if n == 1 {
        return RepeatabilityStats {
            mean: Some(round_to(mean, 4)),
            std_deviation: None,
            uncertainty_type_a: None,
            n,
        };
    }

    let sum_sq: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    let std_deviation = (sum_sq / (n - 1) as f64).sqrt();
    let uncertainty_type_a = std_deviation / (n as f64).sqrt();

    tracing::debug!(n, mean, std_deviation, uncertainty_type_a, "repeatability statistics");

    RepeatabilityStats {
        mean: Some(round_to(mean, 4)),
        std_deviation: Some(round_to(std_deviation, 6)),
        uncertainty_type_a: Some(round_to(uncertainty_type_a, 6)),
        n,
    }
}

/// Standard uncertainty of a resolution `d`, modelled as a rectangular
/// distribution of half-width `d/2`.
pub fn resolution_uncertainty(resolution: f64) -> f64 {
    resolution / (2.0 * 3.0_f64.sqrt())
}

/// Combine Type A, resolution and weight contributions into an expanded uncertainty.
///
/// Inputs are taken as-is; callers supply non-negative magnitudes.
pub fn calculate_expanded_uncertainty(
    uncertainty_a: f64,
    resolution: f64,
    weight_uncertainty: f64,
    k: f64,
) -> UncertaintyBudget {
    let u_res = resolution_uncertainty(resolution);
    let combined = (uncertainty_a.powi(2) + u_res.powi(2) + weight_uncertainty.powi(2)).sqrt();
    let expanded = k * combined;

    tracing::debug!(
        uncertainty_a,
        u_res,
        weight_uncertainty,
        combined,
        k,
        expanded,
        "uncertainty budget"
    );

    UncertaintyBudget {
        uncertainty_type_a: round_to(uncertainty_a, 6),
        uncertainty_type_b_resolution: round_to(u_res, 6),
        uncertainty_weight: round_to(weight_uncertainty, 6),
        combined_uncertainty: round_to(combined, 6),
        k_factor: k,
        expanded_uncertainty: round_to(expanded, 6),
    }
}

/// Format a result as `"<mean> ± <U> <unit> (k=<k>)"`, both values to 4 dp.
pub fn format_measurement_result(mean: f64, expanded: f64, unit: &str, k: f64) -> String {
    format!("{:.4} ± {:.4} {} (k={})", mean, expanded, unit, k)
}
