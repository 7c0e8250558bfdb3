//! Error types for the price_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;
use ts_math::MathError;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The optimiser did not settle on a parameter estimate
    #[error("Model failed to converge: {0}")]
    ConvergenceFailure(String),

    /// Not enough observations for the requested model or split
    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error reading a spreadsheet workbook
    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(String),

    /// Error parsing a cell or value
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<calamine::Error> for ForecastError {
    fn from(err: calamine::Error) -> Self {
        ForecastError::SpreadsheetError(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for ForecastError {
    fn from(err: std::num::ParseFloatError) -> Self {
        ForecastError::ParseError(err.to_string())
    }
}

impl From<chrono::ParseError> for ForecastError {
    fn from(err: chrono::ParseError) -> Self {
        ForecastError::ParseError(err.to_string())
    }
}
