//! Error types for the sounding-convection crate.
//!
//! Only whole-call problems are errors. A level that does not exist for one sounding in a batch
//! is reported as `NaN` in that row of the output, never as an `Err`.
use thiserror::Error;

/// Error type for the crate.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The inputs could not be reconciled into a canonical `(N, Z)` batch.
    #[error("Shapes cannot be broadcast to a common (N, Z) layout: {0}")]
    ShapeMismatch(String),
    /// The caller requested an option that has no implementation.
    #[error("Option not implemented: {0}")]
    NotImplemented(&'static str),
    /// Not enough data available for analysis.
    #[error("Not enough data available for analysis.")]
    NotEnoughData,
    /// Bad or invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Shorthand for results.
pub type Result<T> = std::result::Result<T, AnalysisError>;
