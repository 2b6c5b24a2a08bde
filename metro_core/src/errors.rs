//! # Error Types
//!
//! Structured error types for metro_core. The calculation engine itself only
//! ever fails for two reasons, both caller input-validation problems:
//!
//! - [`CalcError::InvalidClass`] - the accuracy class is not I, II, III or IIII
//! - [`CalcError::InvalidDivision`] - the verification division `e` is not positive
//!
//! Every other edge case (too few samples, no prior calibration, no measurable
//! wear) produces a degraded result instead of an error. The remaining variants
//! belong to the file adapters and settings validation.
//!
//! ## Example
//!
//! ```rust
//! use metro_core::errors::{CalcError, CalcResult};
//!
//! fn check_division(e: f64) -> CalcResult<()> {
//!     if e <= 0.0 {
//!         return Err(CalcError::invalid_division(e));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(check_division(0.0).unwrap_err().error_code(), "INVALID_DIVISION");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for metro_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculation operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// Accuracy class is not one of I, II, III, IIII
    #[error("Invalid accuracy class '{value}': expected one of I, II, III, IIII")]
    InvalidClass { value: String },

    /// Verification division must be strictly positive
    #[error("Invalid verification division e = {value}: must be greater than zero")]
    InvalidDivision { value: f64 },

    /// A settings or adapter input value is invalid
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is exclusively locked by another process
    #[error("File locked: '{path}' is being written by another process")]
    FileLocked { path: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CalcError {
    /// Create an InvalidClass error
    pub fn invalid_class(value: impl Into<String>) -> Self {
        CalcError::InvalidClass {
            value: value.into(),
        }
    }

    /// Create an InvalidDivision error
    pub fn invalid_division(value: f64) -> Self {
        CalcError::InvalidDivision { value }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>) -> Self {
        CalcError::FileLocked { path: path.into() }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidClass { .. } => "INVALID_CLASS",
            CalcError::InvalidDivision { .. } => "INVALID_DIVISION",
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
