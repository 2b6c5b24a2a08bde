//! # metro_core - Calibration Calculation Engine
//!
//! `metro_core` computes the regulated numbers on a weighing-instrument
//! calibration certificate: tolerance limits (EMA), repeatability statistics,
//! uncertainty budgets, reference-weight wear, and the certificate
//! completeness checklist. It also builds carry-forward templates from a
//! previous calibration.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Two hard errors**: only an unknown accuracy class or a non-positive
//!   verification division fail; everything else degrades to `None`/partial results
//! - **Fixed rounding**: published values are rounded exactly as certificates require
//!
//! ## Quick Start
//!
//! ```rust
//! use metro_core::calculations::tolerance::{
//!     calculate, is_conforming, AccuracyClass, VerificationType,
//! };
//!
//! let class: AccuracyClass = "III".parse()?;
//! let ema = calculate(class, 0.01, 5.0, VerificationType::Initial)?;
//! assert_eq!(ema, 0.005);
//! assert!(is_conforming(0.004, ema));
//! # Ok::<(), metro_core::errors::CalcError>(())
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - Tolerance, uncertainty, wear and session evaluation
//! - [`compliance`] - ISO/IEC 17025 §7.8 certificate checklist
//! - [`prefill`] - Carry-forward template from the last certified calibration
//! - [`record`] - Calibration record and history data structures
//! - [`settings`] - Engine defaults
//! - [`errors`] - Structured error types
//! - [`file_io`] - JSON file adapters with atomic saves and locking

pub mod calculations;
pub mod compliance;
pub mod errors;
pub mod file_io;
pub mod prefill;
pub mod record;
pub mod settings;

// Re-export commonly used types at crate root for convenience
pub use calculations::{AccuracyClass, VerificationType};
pub use compliance::{ComplianceCheck, ComplianceReport};
pub use errors::{CalcError, CalcResult};
pub use file_io::{load_history, save_history};
pub use prefill::{build_prefill, CalibrationHistory, PrefillTemplate};
pub use record::{CalibrationHistoryStore, CalibrationRecord, MeasurementPoint};
pub use settings::EngineSettings;
