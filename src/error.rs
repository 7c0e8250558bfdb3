//! Error types for the analysis pipeline

use price_forecast::ForecastError;
use supply_plan::PlanError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    /// No candidate model produced a forecast
    #[error("No model could be evaluated: {0}")]
    NoUsableModel(String),

    #[error("Plot error: {0}")]
    Plot(String),
}

impl AnalysisError {
    /// A short hint printed after the error by the binaries
    pub fn hint(&self) -> &'static str {
        match self {
            AnalysisError::Forecast(ForecastError::DataError(_))
            | AnalysisError::Forecast(ForecastError::SpreadsheetError(_))
            | AnalysisError::Forecast(ForecastError::PolarsError(_))
            | AnalysisError::Plan(PlanError::DataError(_))
            | AnalysisError::Plan(PlanError::Csv(_)) => "Check column names and input file paths.",
            AnalysisError::Forecast(ForecastError::IoError(_))
            | AnalysisError::Plan(PlanError::Io(_))
            | AnalysisError::Io(_) => "Check that the input files exist and are readable.",
            AnalysisError::Forecast(ForecastError::InsufficientData { .. }) => {
                "Provide a longer price series or reduce the forecast horizon."
            }
            AnalysisError::Plan(PlanError::Infeasible { .. }) => {
                "Total supplier capacity must cover every warehouse's demand."
            }
            AnalysisError::Config(_) | AnalysisError::Json(_) => "Check the configuration file.",
            _ => "Run with RUST_LOG=debug for details.",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
