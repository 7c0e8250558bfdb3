//! Holdout evaluation of every candidate model and the final forecast

use crate::comparison::{EvaluationStatus, ModelComparison, ModelEvaluation, ModelFit};
use crate::data::TimeSeriesData;
use crate::diagnostics::ResidualDiagnostics;
use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_forecast, RankingMetric};
use crate::models::{ForecastResult, ModelSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_math::optimize::NelderMeadConfig;

/// Settings for a forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Months held out for scoring, and months forecast past the data
    pub horizon: usize,
    pub ranking_metric: RankingMetric,
    /// Also evaluate the regressor variants when a fuel series is given
    pub use_exogenous: bool,
    /// Coverage of the future forecast's interval
    pub interval_level: f64,
    /// Autocorrelation lags for residual diagnostics
    pub diagnostic_lags: usize,
    /// Minimum training observations left after the holdout
    pub min_train_len: usize,
    pub models: Vec<ModelSpec>,
    pub optimizer: NelderMeadConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 12,
            ranking_metric: RankingMetric::Rmse,
            use_exogenous: true,
            interval_level: 0.95,
            diagnostic_lags: 12,
            min_train_len: 24,
            models: ModelSpec::default_candidates(),
            optimizer: NelderMeadConfig::default(),
        }
    }
}

/// Everything known about the winning model
#[derive(Debug, Clone)]
pub struct BestModel {
    pub label: String,
    pub spec: ModelSpec,
    pub exogenous: bool,
    /// In-sample predictions over the training window
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Forecast of the holdout window
    pub test_forecast: ForecastResult,
    pub diagnostics: Option<ResidualDiagnostics>,
    /// Forecast past the last observation from a refit on the full series
    pub future_forecast: Option<ForecastResult>,
    pub future_intervals: Option<Vec<(f64, f64)>>,
}

/// Output of [`ForecastRunner::run`]
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub series: TimeSeriesData,
    /// Fuel values aligned to the series' months, when used
    pub exogenous: Option<Vec<f64>>,
    pub train_len: usize,
    pub horizon: usize,
    pub interval_level: f64,
    pub comparison: ModelComparison,
    /// Absent when no candidate could be evaluated
    pub best: Option<BestModel>,
}

impl ForecastRun {
    /// Holdout actuals
    pub fn test_values(&self) -> &[f64] {
        &self.series.values()[self.train_len..]
    }
}

/// Evaluates candidate models on a holdout and forecasts with the best
#[derive(Debug, Clone)]
pub struct ForecastRunner {
    config: ForecastConfig,
}

impl ForecastRunner {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        if config.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        if !(config.interval_level > 0.0 && config.interval_level < 1.0) {
            return Err(ForecastError::InvalidParameter(
                "interval_level must be between 0 and 1".to_string(),
            ));
        }
        if config.models.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one model must be configured".to_string(),
            ));
        }
        if config.diagnostic_lags == 0 {
            return Err(ForecastError::InvalidParameter(
                "diagnostic_lags must be at least 1".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Score every candidate on the last `horizon` months and forecast ahead
    pub fn run(&self, price: &TimeSeriesData, fuel: Option<&TimeSeriesData>) -> Result<ForecastRun> {
        let horizon = self.config.horizon;
        let needed = horizon + self.config.min_train_len.max(1);
        if price.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: price.len(),
            });
        }

        let exogenous = match fuel {
            Some(fuel) if self.config.use_exogenous => Some(fuel.align_to(price.months())?),
            Some(_) => {
                info!("regressor variants disabled by configuration");
                None
            }
            None => None,
        };

        let (train, test) = price.split_holdout(horizon)?;
        let split = exogenous.as_ref().map(|x| x.split_at(train.len()));
        info!(
            train = train.len(),
            test = test.len(),
            regressor = exogenous.is_some(),
            "evaluating candidate models"
        );

        let mut evaluations = Vec::new();
        for spec in &self.config.models {
            evaluations.push(self.evaluate(spec, &train, &test, None));
            if let Some(split) = split {
                if spec.supports_exogenous() {
                    evaluations.push(self.evaluate(spec, &train, &test, Some(split)));
                }
            }
        }

        let comparison = ModelComparison::new(evaluations, self.config.ranking_metric);
        let best = match comparison.best() {
            Some(best) => {
                info!(model = %best.label, metric = %self.config.ranking_metric, "selected best model");
                self.finish_best(best, price, exogenous.as_deref())
            }
            None => {
                warn!("no candidate model could be evaluated");
                None
            }
        };

        Ok(ForecastRun {
            series: price.clone(),
            exogenous,
            train_len: train.len(),
            horizon,
            interval_level: self.config.interval_level,
            comparison,
            best,
        })
    }

    fn evaluate(
        &self,
        spec: &ModelSpec,
        train: &TimeSeriesData,
        test: &TimeSeriesData,
        exog: Option<(&[f64], &[f64])>,
    ) -> ModelEvaluation {
        let exogenous = exog.is_some();
        let label = spec.label(exogenous);
        let status = match self.fit_candidate(spec, train, test, exog) {
            Ok(fit) => {
                info!(
                    model = %label,
                    rmse = fit.metrics.rmse,
                    mae = fit.metrics.mae,
                    mape = fit.metrics.mape,
                    "model evaluated"
                );
                EvaluationStatus::Evaluated(Box::new(fit))
            }
            Err(err) => {
                warn!(model = %label, error = %err, "model excluded from ranking");
                EvaluationStatus::Failed(err.to_string())
            }
        };

        ModelEvaluation {
            label,
            spec: spec.clone(),
            exogenous,
            status,
        }
    }

    fn fit_candidate(
        &self,
        spec: &ModelSpec,
        train: &TimeSeriesData,
        test: &TimeSeriesData,
        exog: Option<(&[f64], &[f64])>,
    ) -> Result<ModelFit> {
        let trained = spec.train(train, exog.map(|(x, _)| x), &self.config.optimizer)?;
        let forecast = trained
            .forecast(test.len(), exog.map(|(_, x)| x))?
            .with_months(test.months().to_vec())?;
        if forecast.values().iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastingError(
                "forecast contains non-finite values".to_string(),
            ));
        }

        let metrics = evaluate_forecast(forecast.values(), test.values())?;
        let residuals = trained.residuals();
        let diagnostics = match ResidualDiagnostics::from_residuals(
            &residuals,
            self.config.diagnostic_lags,
            trained.parameter_count(),
        ) {
            Ok(diagnostics) => Some(diagnostics),
            Err(err) => {
                debug!(model = trained.name(), error = %err, "residual diagnostics skipped");
                None
            }
        };

        Ok(ModelFit {
            metrics,
            forecast,
            fitted: trained.fitted_values().to_vec(),
            residuals,
            diagnostics,
            parameter_count: trained.parameter_count(),
        })
    }

    /// Refit the winner on the full series and forecast past the data
    fn finish_best(
        &self,
        best: &ModelEvaluation,
        price: &TimeSeriesData,
        exogenous: Option<&[f64]>,
    ) -> Option<BestModel> {
        let fit = best.fit()?;
        let horizon = self.config.horizon;
        let regressor = if best.exogenous { exogenous } else { None };

        let future = regressor.map(|x| {
            let last = x.last().copied().unwrap_or(f64::NAN);
            vec![last; horizon]
        });

        let future_forecast = best
            .spec
            .train(price, regressor, &self.config.optimizer)
            .and_then(|trained| trained.forecast(horizon, future.as_deref()))
            .and_then(|forecast| forecast.with_months(price.future_months(horizon)));
        let future_forecast = match future_forecast {
            Ok(forecast) => Some(forecast),
            Err(err) => {
                warn!(model = %best.label, error = %err, "refit on the full series failed");
                None
            }
        };
        let future_intervals = future_forecast
            .as_ref()
            .and_then(|f| f.confidence_intervals(self.config.interval_level).ok());

        Some(BestModel {
            label: best.label.clone(),
            spec: best.spec.clone(),
            exogenous: best.exogenous,
            fitted: fit.fitted.clone(),
            residuals: fit.residuals.clone(),
            test_forecast: fit.forecast.clone(),
            diagnostics: fit.diagnostics.clone(),
            future_forecast,
            future_intervals,
        })
    }
}
