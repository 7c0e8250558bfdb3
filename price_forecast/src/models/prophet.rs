//! Additive trend-plus-seasonality regression in the style of Prophet.
//!
//! The series is decomposed as a piecewise-linear trend with hinge
//! changepoints, a yearly Fourier seasonality and an optional linear
//! regressor. Coefficients are fitted by penalised least squares, where
//! each prior scale `τ` becomes a ridge penalty `σ̂² / τ²` and `σ̂²` is the
//! residual variance of a first fit without changepoints.

use crate::data::{months_after, TimeSeriesData};
use crate::error::{ForecastError, Result};
use crate::models::{
    check_regressor, future_regressor, ForecastModel, ForecastResult, TrainedForecastModel,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;
use ts_math::regression::ridge_regression;
use ts_math::stats::{mean, std_dev, variance};

const YEAR_DAYS: f64 = 365.25;
const DEFAULT_CHANGEPOINTS: usize = 25;
/// Floor on every penalty so that near-collinear columns stay solvable
const MIN_PENALTY: f64 = 1e-8;

/// Display label, `Prophet+regressor` when a regressor is used
pub fn label(exogenous: bool) -> String {
    if exogenous {
        "Prophet+regressor".to_string()
    } else {
        "Prophet".to_string()
    }
}

/// Prophet-style model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphetSettings {
    /// Number of trend changepoints; 25 capped by the data when absent
    pub n_changepoints: Option<usize>,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    /// Prior scale of the changepoint rate adjustments
    pub changepoint_prior_scale: f64,
    /// Number of yearly Fourier pairs
    pub yearly_order: usize,
    /// Prior scale of the seasonal coefficients
    pub seasonality_prior_scale: f64,
    /// Prior scale of the regressor coefficient
    pub regressor_prior_scale: f64,
}

impl Default for ProphetSettings {
    fn default() -> Self {
        Self {
            n_changepoints: None,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            yearly_order: 5,
            seasonality_prior_scale: 10.0,
            regressor_prior_scale: 10.0,
        }
    }
}

/// Prophet-style decomposable regression
#[derive(Debug, Clone, Default)]
pub struct Prophet {
    settings: ProphetSettings,
}

impl Prophet {
    pub fn new(settings: ProphetSettings) -> Result<Self> {
        if !(settings.changepoint_range > 0.0 && settings.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "changepoint_range must be in (0, 1]".to_string(),
            ));
        }
        let scales = [
            settings.changepoint_prior_scale,
            settings.seasonality_prior_scale,
            settings.regressor_prior_scale,
        ];
        if scales.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ForecastError::InvalidParameter(
                "Prior scales must be positive".to_string(),
            ));
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ProphetSettings {
        &self.settings
    }
}

/// Column layout and scaling fixed at training time
#[derive(Debug, Clone)]
struct Design {
    start: NaiveDate,
    span_days: f64,
    /// Changepoint locations on the scaled time axis
    changepoints: Vec<f64>,
    yearly_order: usize,
    /// Mean and standard deviation used to standardise the regressor
    regressor: Option<(f64, f64)>,
}

impl Design {
    fn columns(&self) -> usize {
        2 + self.changepoints.len() + 2 * self.yearly_order + usize::from(self.regressor.is_some())
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn row(&self, date: NaiveDate, x: Option<f64>) -> Vec<f64> {
        let t = self.scaled_time(date);
        let mut row = Vec::with_capacity(self.columns());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|&c| (t - c).max(0.0)));

        let days = date.num_days_from_ce() as f64;
        for k in 1..=self.yearly_order {
            let angle = 2.0 * PI * k as f64 * days / YEAR_DAYS;
            row.push(angle.sin());
            row.push(angle.cos());
        }

        if let (Some((centre, scale)), Some(x)) = (self.regressor, x) {
            row.push((x - centre) / scale);
        }
        row
    }

    fn rows(&self, months: &[NaiveDate], exog: Option<&[f64]>) -> Vec<Vec<f64>> {
        months
            .iter()
            .enumerate()
            .map(|(i, &date)| self.row(date, exog.map(|x| x[i])))
            .collect()
    }

    /// Ridge penalties: none on the base trend, the prior scales elsewhere
    fn penalties(&self, sigma2: f64, settings: &ProphetSettings) -> Vec<f64> {
        let penalty = |scale: f64| (sigma2 / (scale * scale)).max(MIN_PENALTY);
        let mut penalties = vec![MIN_PENALTY, MIN_PENALTY];
        penalties.extend(
            std::iter::repeat(penalty(settings.changepoint_prior_scale))
                .take(self.changepoints.len()),
        );
        penalties.extend(
            std::iter::repeat(penalty(settings.seasonality_prior_scale)).take(2 * self.yearly_order),
        );
        if self.regressor.is_some() {
            penalties.push(penalty(settings.regressor_prior_scale));
        }
        penalties
    }
}

fn predict(rows: &[Vec<f64>], coefficients: &[f64]) -> Vec<f64> {
    rows.iter()
        .map(|row| row.iter().zip(coefficients.iter()).map(|(x, b)| x * b).sum())
        .collect()
}

/// Changepoints spread evenly over the first `range` of the history
fn changepoint_locations(scaled: &[f64], requested: Option<usize>, range: f64) -> Vec<f64> {
    let history = ((scaled.len() as f64) * range).floor() as usize;
    let count = requested
        .unwrap_or(DEFAULT_CHANGEPOINTS)
        .min(history.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }
    (1..=count)
        .map(|i| {
            let index = ((i * (history - 1)) as f64 / count as f64).round() as usize;
            scaled[index]
        })
        .collect()
}

impl ForecastModel for Prophet {
    type Trained = TrainedProphet;

    fn train(&self, data: &TimeSeriesData, exog: Option<&[f64]>) -> Result<TrainedProphet> {
        let values = data.values();
        let months = data.months();
        let n = values.len();
        check_regressor(exog, n)?;

        let needed = 2 * self.settings.yearly_order + 5 + usize::from(exog.is_some());
        if n < needed {
            return Err(ForecastError::InsufficientData { needed, got: n });
        }

        let start = months[0];
        let span_days = (months[n - 1] - start).num_days() as f64;
        let regressor = match exog {
            Some(x) => {
                let scale = std_dev(x);
                if scale < 1e-12 {
                    return Err(ForecastError::InvalidParameter(
                        "Regressor is constant".to_string(),
                    ));
                }
                Some((mean(x), scale))
            }
            None => None,
        };
        let y_scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let target: Vec<f64> = values.iter().map(|v| v / y_scale).collect();

        let mut design = Design {
            start,
            span_days,
            changepoints: Vec::new(),
            yearly_order: self.settings.yearly_order,
            regressor,
        };

        // First pass without changepoints estimates the noise level
        let rows = design.rows(months, exog);
        let penalties = vec![MIN_PENALTY; design.columns()];
        let coefficients = ridge_regression(&rows, &target, &penalties)?;
        let residuals: Vec<f64> = target
            .iter()
            .zip(predict(&rows, &coefficients))
            .map(|(y, f)| y - f)
            .collect();
        let sigma2 = variance(&residuals);

        let scaled: Vec<f64> = months.iter().map(|&m| design.scaled_time(m)).collect();
        design.changepoints = changepoint_locations(
            &scaled,
            self.settings.n_changepoints,
            self.settings.changepoint_range,
        );

        let rows = design.rows(months, exog);
        let penalties = design.penalties(sigma2, &self.settings);
        let coefficients = ridge_regression(&rows, &target, &penalties)?;
        let fitted: Vec<f64> = predict(&rows, &coefficients)
            .into_iter()
            .map(|f| f * y_scale)
            .collect();
        let residuals: Vec<f64> = values.iter().zip(fitted.iter()).map(|(y, f)| y - f).collect();
        let sigma = std_dev(&residuals);

        debug!(
            model = %label(exog.is_some()),
            changepoints = design.changepoints.len(),
            sigma,
            "fitted penalised trend and seasonality"
        );

        Ok(TrainedProphet {
            name: label(exog.is_some()),
            design,
            coefficients,
            y_scale,
            last_month: months[n - 1],
            observed: values.to_vec(),
            fitted,
            sigma,
        })
    }

    fn name(&self) -> &str {
        "Prophet"
    }

    fn supports_exogenous(&self) -> bool {
        true
    }
}

/// Trained Prophet-style model
#[derive(Debug, Clone)]
pub struct TrainedProphet {
    name: String,
    design: Design,
    coefficients: Vec<f64>,
    y_scale: f64,
    last_month: NaiveDate,
    observed: Vec<f64>,
    fitted: Vec<f64>,
    sigma: f64,
}

impl TrainedProphet {
    /// Trend slope at the start of the history, per month
    pub fn base_growth(&self) -> f64 {
        self.coefficients[1] * self.y_scale / self.design.span_days * (YEAR_DAYS / 12.0)
    }

    /// Fitted changepoint rate adjustments on the scaled axis
    pub fn changepoint_deltas(&self) -> &[f64] {
        &self.coefficients[2..2 + self.design.changepoints.len()]
    }

    /// Regressor effect per unit of the raw regressor
    pub fn regressor_coefficient(&self) -> Option<f64> {
        self.design
            .regressor
            .map(|(_, scale)| self.coefficients[self.coefficients.len() - 1] * self.y_scale / scale)
    }
}

impl TrainedForecastModel for TrainedProphet {
    fn forecast(&self, horizon: usize, future_exog: Option<&[f64]>) -> Result<ForecastResult> {
        let future_x = match self.design.regressor {
            Some(_) => Some(future_regressor(future_exog, horizon)?),
            None => None,
        };

        let months = months_after(self.last_month, horizon);
        let rows = self.design.rows(&months, future_x);
        let values = predict(&rows, &self.coefficients)
            .into_iter()
            .map(|v| v * self.y_scale)
            .collect();

        // Residual spread only; trend uncertainty is not simulated
        let std_errors = vec![self.sigma; horizon];
        ForecastResult::new_with_std_errors(values, horizon, std_errors)?.with_months(months)
    }

    fn observed(&self) -> &[f64] {
        &self.observed
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    fn parameter_count(&self) -> usize {
        self.coefficients.len()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
