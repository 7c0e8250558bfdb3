//! Forecasting models for monthly price series

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use ts_math::optimize::NelderMeadConfig;

pub mod holt_winters;
pub mod prophet;
pub mod sarimax;

use holt_winters::{HoltWinters, SeasonalType};
use prophet::{Prophet, ProphetSettings};
use sarimax::{ArimaOrder, Sarimax, SeasonalOrder};

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    /// Forecasted values
    values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
    /// Standard error of each forecast (optional)
    std_errors: Option<Vec<f64>>,
    /// Month of each forecast (optional)
    months: Option<Vec<NaiveDate>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self {
            values,
            horizons,
            std_errors: None,
            months: None,
        })
    }

    /// Create a new forecast result with per-step standard errors
    pub fn new_with_std_errors(
        values: Vec<f64>,
        horizons: usize,
        std_errors: Vec<f64>,
    ) -> Result<Self> {
        let mut result = Self::new(values, horizons)?;
        if std_errors.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match standard errors length ({})",
                horizons,
                std_errors.len()
            )));
        }
        result.std_errors = Some(std_errors);
        Ok(result)
    }

    /// Attach the month of each forecast
    pub fn with_months(mut self, months: Vec<NaiveDate>) -> Result<Self> {
        if months.len() != self.horizons {
            return Err(ForecastError::ValidationError(format!(
                "Got {} months for {} forecasts",
                months.len(),
                self.horizons
            )));
        }
        self.months = Some(months);
        Ok(self)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Get the standard errors, if available
    pub fn std_errors(&self) -> Option<&[f64]> {
        self.std_errors.as_deref()
    }

    /// Get the months, if available
    pub fn months(&self) -> Option<&[NaiveDate]> {
        self.months.as_deref()
    }

    /// Symmetric normal confidence intervals at `confidence_level`.
    ///
    /// Fails when the model did not provide standard errors.
    pub fn confidence_intervals(&self, confidence_level: f64) -> Result<Vec<(f64, f64)>> {
        if confidence_level <= 0.0 || confidence_level >= 1.0 {
            return Err(ForecastError::ValidationError(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }
        let std_errors = self.std_errors.as_ref().ok_or_else(|| {
            ForecastError::ForecastingError("Forecast has no standard errors".to_string())
        })?;

        let z = ts_math::stats::normal_quantile((1.0 + confidence_level) / 2.0)?;
        Ok(self
            .values
            .iter()
            .zip(std_errors.iter())
            .map(|(v, se)| (v - z * se, v + z * se))
            .collect())
    }

    /// Calculate mean absolute error between forecast and actual values
    pub fn mean_absolute_error(&self, actual: &[f64]) -> Result<f64> {
        Ok(crate::metrics::evaluate_forecast(&self.values, actual)?.mae)
    }

    /// Calculate mean squared error between forecast and actual values
    pub fn mean_squared_error(&self, actual: &[f64]) -> Result<f64> {
        Ok(crate::metrics::evaluate_forecast(&self.values, actual)?.mse)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ForecastError::ForecastingError(e.to_string()))
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Forecast `horizon` months past the training data.
    ///
    /// Models trained with a regressor need its next `horizon` values.
    fn forecast(&self, horizon: usize, future_exog: Option<&[f64]>) -> Result<ForecastResult>;

    /// Training observations
    fn observed(&self) -> &[f64];

    /// One-step-ahead in-sample predictions, NaN during warm-up
    fn fitted_values(&self) -> &[f64];

    /// Number of estimated parameters
    fn parameter_count(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;

    /// In-sample residuals, NaN during warm-up
    fn residuals(&self) -> Vec<f64> {
        self.observed()
            .iter()
            .zip(self.fitted_values().iter())
            .map(|(y, f)| y - f)
            .collect()
    }
}

/// Forecast model that can be trained on a monthly series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel + 'static;

    /// Train the model, optionally with a regressor aligned to `data`
    fn train(&self, data: &TimeSeriesData, exog: Option<&[f64]>) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Whether the model accepts a regressor
    fn supports_exogenous(&self) -> bool {
        false
    }
}

/// Model family of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    Arima,
    Sarima,
    HoltWinters,
    Prophet,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModelFamily::Arima => "ARIMA",
            ModelFamily::Sarima => "SARIMA",
            ModelFamily::HoltWinters => "Holt-Winters",
            ModelFamily::Prophet => "Prophet",
        };
        f.write_str(label)
    }
}

/// Configured candidate model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelSpec {
    Arima {
        p: usize,
        d: usize,
        q: usize,
    },
    Sarima {
        p: usize,
        d: usize,
        q: usize,
        seasonal_p: usize,
        seasonal_d: usize,
        seasonal_q: usize,
        period: usize,
    },
    HoltWinters {
        period: usize,
        #[serde(default)]
        seasonal: SeasonalType,
    },
    Prophet(ProphetSettings),
}

impl ModelSpec {
    /// ARIMA(1,1,1), SARIMA(1,1,1)(1,1,1,12), additive Holt-Winters and Prophet
    pub fn default_candidates() -> Vec<ModelSpec> {
        vec![
            ModelSpec::Arima { p: 1, d: 1, q: 1 },
            ModelSpec::Sarima {
                p: 1,
                d: 1,
                q: 1,
                seasonal_p: 1,
                seasonal_d: 1,
                seasonal_q: 1,
                period: 12,
            },
            ModelSpec::HoltWinters {
                period: 12,
                seasonal: SeasonalType::Additive,
            },
            ModelSpec::Prophet(ProphetSettings::default()),
        ]
    }

    /// Family of this candidate
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelSpec::Arima { .. } => ModelFamily::Arima,
            ModelSpec::Sarima { .. } => ModelFamily::Sarima,
            ModelSpec::HoltWinters { .. } => ModelFamily::HoltWinters,
            ModelSpec::Prophet(_) => ModelFamily::Prophet,
        }
    }

    /// Whether the family accepts a regressor
    pub fn supports_exogenous(&self) -> bool {
        !matches!(self, ModelSpec::HoltWinters { .. })
    }

    /// Display label, e.g. `ARIMAX(1,1,1)` when a regressor is used
    pub fn label(&self, exogenous: bool) -> String {
        match self {
            ModelSpec::Arima { p, d, q } => sarimax::label(
                ArimaOrder::new(*p, *d, *q),
                SeasonalOrder::none(),
                exogenous,
            ),
            ModelSpec::Sarima {
                p,
                d,
                q,
                seasonal_p,
                seasonal_d,
                seasonal_q,
                period,
            } => sarimax::label(
                ArimaOrder::new(*p, *d, *q),
                SeasonalOrder::new(*seasonal_p, *seasonal_d, *seasonal_q, *period),
                exogenous,
            ),
            ModelSpec::HoltWinters { period, seasonal } => {
                holt_winters::label(*period, *seasonal)
            }
            ModelSpec::Prophet(_) => prophet::label(exogenous),
        }
    }

    /// Build the concrete model and train it
    pub fn train(
        &self,
        data: &TimeSeriesData,
        exog: Option<&[f64]>,
        optimizer: &NelderMeadConfig,
    ) -> Result<Box<dyn TrainedForecastModel>> {
        match self {
            ModelSpec::Arima { p, d, q } => {
                let model = Sarimax::arima(*p, *d, *q)?.with_optimizer(optimizer.clone());
                boxed(&model, data, exog)
            }
            ModelSpec::Sarima {
                p,
                d,
                q,
                seasonal_p,
                seasonal_d,
                seasonal_q,
                period,
            } => {
                let model = Sarimax::sarima(
                    ArimaOrder::new(*p, *d, *q),
                    SeasonalOrder::new(*seasonal_p, *seasonal_d, *seasonal_q, *period),
                )?
                .with_optimizer(optimizer.clone());
                boxed(&model, data, exog)
            }
            ModelSpec::HoltWinters { period, seasonal } => {
                let model = HoltWinters::new(*period, *seasonal)?.with_optimizer(optimizer.clone());
                boxed(&model, data, exog)
            }
            ModelSpec::Prophet(settings) => {
                let model = Prophet::new(settings.clone())?;
                boxed(&model, data, exog)
            }
        }
    }
}

fn boxed<M: ForecastModel>(
    model: &M,
    data: &TimeSeriesData,
    exog: Option<&[f64]>,
) -> Result<Box<dyn TrainedForecastModel>> {
    Ok(Box::new(model.train(data, exog)?))
}

/// Check a regressor against the series it should accompany
pub(crate) fn check_regressor(exog: Option<&[f64]>, expected: usize) -> Result<()> {
    if let Some(x) = exog {
        if x.len() != expected {
            return Err(ForecastError::ValidationError(format!(
                "Regressor has {} values for {} observations",
                x.len(),
                expected
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ValidationError(
                "Regressor contains non-finite values".to_string(),
            ));
        }
    }
    Ok(())
}

/// Take the first `horizon` future regressor values, or fail when missing
pub(crate) fn future_regressor<'a>(
    future_exog: Option<&'a [f64]>,
    horizon: usize,
) -> Result<&'a [f64]> {
    match future_exog {
        Some(x) if x.len() >= horizon => {
            if x[..horizon].iter().any(|v| !v.is_finite()) {
                return Err(ForecastError::ValidationError(
                    "Future regressor contains non-finite values".to_string(),
                ));
            }
            Ok(&x[..horizon])
        }
        Some(x) => Err(ForecastError::ValidationError(format!(
            "Need {} future regressor values, got {}",
            horizon,
            x.len()
        ))),
        None => Err(ForecastError::ValidationError(
            "Model was trained with a regressor; future values are required".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn forecast_result_length_checks() {
        assert!(ForecastResult::new(vec![1.0, 2.0], 3).is_err());
        assert!(ForecastResult::new_with_std_errors(vec![1.0], 1, vec![]).is_err());
        let result = ForecastResult::new(vec![1.0], 1).unwrap();
        assert!(result.with_months(vec![]).is_err());
    }

    #[test]
    fn confidence_intervals_use_normal_quantile() {
        let result = ForecastResult::new_with_std_errors(vec![10.0, 20.0], 2, vec![1.0, 2.0]).unwrap();
        let intervals = result.confidence_intervals(0.95).unwrap();
        assert_relative_eq!(intervals[0].0, 10.0 - 1.959964, epsilon = 1e-5);
        assert_relative_eq!(intervals[1].1, 20.0 + 2.0 * 1.959964, epsilon = 1e-5);
        assert!(result.confidence_intervals(1.0).is_err());
    }

    #[test]
    fn intervals_need_std_errors() {
        let result = ForecastResult::new(vec![1.0], 1).unwrap();
        assert!(result.confidence_intervals(0.9).is_err());
    }

    #[test]
    fn labels() {
        let specs = ModelSpec::default_candidates();
        assert_eq!(specs[0].label(false), "ARIMA(1,1,1)");
        assert_eq!(specs[0].label(true), "ARIMAX(1,1,1)");
        assert_eq!(specs[1].label(true), "SARIMAX(1,1,1)(1,1,1,12)");
        assert_eq!(specs[2].label(false), "Holt-Winters(additive,12)");
        assert_eq!(specs[3].label(true), "Prophet+regressor");
        assert!(!specs[2].supports_exogenous());
    }

    #[test]
    fn spec_from_json() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"family":"arima","p":2,"d":1,"q":0}"#).unwrap();
        assert_eq!(spec, ModelSpec::Arima { p: 2, d: 1, q: 0 });

        let spec: ModelSpec = serde_json::from_str(r#"{"family":"prophet"}"#).unwrap();
        assert_eq!(spec.family(), ModelFamily::Prophet);

        let spec: ModelSpec =
            serde_json::from_str(r#"{"family":"holt_winters","period":4}"#).unwrap();
        assert_eq!(
            spec,
            ModelSpec::HoltWinters {
                period: 4,
                seasonal: SeasonalType::Additive
            }
        );
    }

    #[test]
    fn regressor_checks() {
        assert!(check_regressor(Some(&[1.0, 2.0][..]), 3).is_err());
        assert!(check_regressor(Some(&[1.0, f64::NAN][..]), 2).is_err());
        assert!(check_regressor(None, 2).is_ok());
        assert!(future_regressor(None, 1).is_err());
        assert_eq!(future_regressor(Some(&[1.0, 2.0, 3.0][..]), 2).unwrap(), &[1.0, 2.0]);
    }
}
