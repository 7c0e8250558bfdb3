//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error, in percent
    pub smape: f64,
}

impl ErrorMetrics {
    /// Value of the given ranking metric
    pub fn get(&self, metric: RankingMetric) -> f64 {
        match metric {
            RankingMetric::Rmse => self.rmse,
            RankingMetric::Mae => self.mae,
            RankingMetric::Mape => self.mape,
        }
    }
}

impl fmt::Display for ErrorMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

/// Metric used to rank models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingMetric {
    #[default]
    Rmse,
    Mae,
    Mape,
}

impl RankingMetric {
    /// All metrics in tie-break order
    pub const ALL: [RankingMetric; 3] = [RankingMetric::Rmse, RankingMetric::Mae, RankingMetric::Mape];

    /// Short upper-case label
    pub fn label(&self) -> &'static str {
        match self {
            RankingMetric::Rmse => "RMSE",
            RankingMetric::Mae => "MAE",
            RankingMetric::Mape => "MAPE",
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RankingMetric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rmse" => Ok(RankingMetric::Rmse),
            "mae" => Ok(RankingMetric::Mae),
            "mape" => Ok(RankingMetric::Mape),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown ranking metric '{}'",
                other
            ))),
        }
    }
}

/// Evaluate forecast accuracy against actual values
pub fn evaluate_forecast(forecast: &[f64], actual: &[f64]) -> Result<ErrorMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(format!(
            "Forecast ({}) and actual ({}) values must have the same non-zero length",
            forecast.len(),
            actual.len()
        )));
    }
    if forecast.iter().chain(actual.iter()).any(|v| !v.is_finite()) {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must be finite".to_string(),
        ));
    }

    let mse = mean_squared_error(actual, forecast);
    Ok(ErrorMetrics {
        mae: mean_absolute_error(actual, forecast),
        mse,
        rmse: mse.sqrt(),
        mape: mean_absolute_percentage_error(actual, forecast),
        smape: symmetric_mean_absolute_percentage_error(actual, forecast),
    })
}

fn paired(actual: &[f64], predicted: &[f64]) -> bool {
    !actual.is_empty() && actual.len() == predicted.len()
}

/// Mean absolute error; NaN for empty or mismatched input
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !paired(actual, predicted) {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Mean squared error; NaN for empty or mismatched input
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !paired(actual, predicted) {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Root mean squared error; NaN for empty or mismatched input
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_squared_error(actual, predicted).sqrt()
}

/// Mean absolute percentage error in percent.
///
/// Zero actuals are skipped; NaN when nothing is left to average.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !paired(actual, predicted) {
        return f64::NAN;
    }
    let terms: Vec<f64> = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs() * 100.0)
        .collect();
    if terms.is_empty() {
        return f64::NAN;
    }
    terms.iter().sum::<f64>() / terms.len() as f64
}

/// Symmetric mean absolute percentage error in percent
pub fn symmetric_mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !paired(actual, predicted) {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(&a, &p)| {
            let denominator = a.abs() + p.abs();
            if denominator == 0.0 {
                0.0
            } else {
                200.0 * (a - p).abs() / denominator
            }
        })
        .sum::<f64>()
        / actual.len() as f64
}
