//! Library error type
//!
//! Two error classes exist in the reserving core: validation failures
//! (returned as a list of human-readable violations before any computation
//! starts) and infrastructure errors from loading triangle data. Numerical
//! degeneracies inside a calculation are never errors; they are handled with
//! documented fallbacks and surfaced as warnings on the result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReservingError {
    /// Input failed validation; calculation refused to proceed.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A method identifier was not found in the catalog.
    #[error("unknown method id: {0}")]
    UnknownMethod(String),

    /// Triangle data could not be read.
    #[error("triangle load error: {0}")]
    Load(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ReservingError {
    /// The violation list for validation errors, empty otherwise.
    pub fn violations(&self) -> &[String] {
        match self {
            ReservingError::Validation(v) => v,
            _ => &[],
        }
    }
}
