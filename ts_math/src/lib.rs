//! # TS Math
//!
//! Numerical building blocks shared by the forecasting models.
//! This crate provides differencing and lag-polynomial algebra, a bounded
//! Nelder-Mead optimiser, penalised least squares and the summary statistics
//! used for residual diagnostics.

use thiserror::Error;

pub mod differencing;
pub mod optimize;
pub mod regression;
pub mod stats;

/// Errors that can occur in numerical routines
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Singular system: {0}")]
    SingularSystem(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;
