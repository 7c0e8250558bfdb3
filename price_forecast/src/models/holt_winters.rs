//! Holt-Winters exponential smoothing with additive trend

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use ts_math::optimize::{nelder_mead, NelderMeadConfig};

const PARAMETER_BOUNDS: (f64, f64) = (0.0001, 0.9999);
const INITIAL_PARAMETERS: [f64; 3] = [0.3, 0.1, 0.1];

/// How the seasonal component combines with level and trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalType {
    #[default]
    Additive,
    Multiplicative,
}

impl fmt::Display for SeasonalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonalType::Additive => f.write_str("additive"),
            SeasonalType::Multiplicative => f.write_str("multiplicative"),
        }
    }
}

/// Display label such as `Holt-Winters(additive,12)`
pub fn label(period: usize, seasonal_type: SeasonalType) -> String {
    format!("Holt-Winters({},{})", seasonal_type, period)
}

/// Holt-Winters triple exponential smoothing
#[derive(Debug, Clone)]
pub struct HoltWinters {
    name: String,
    period: usize,
    seasonal_type: SeasonalType,
    /// Fixed (alpha, beta, gamma); estimated when absent
    smoothing: Option<[f64; 3]>,
    optimizer: NelderMeadConfig,
}

#[derive(Debug, Clone)]
struct State {
    level: f64,
    trend: f64,
    /// Seasonal factor for each position `t % period`
    seasonals: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Pass {
    sse: f64,
    fitted: Vec<f64>,
    state: State,
}

impl HoltWinters {
    /// Create a model whose smoothing parameters are estimated
    pub fn new(period: usize, seasonal_type: SeasonalType) -> Result<Self> {
        if period < 2 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be at least 2".to_string(),
            ));
        }
        Ok(Self {
            name: label(period, seasonal_type),
            period,
            seasonal_type,
            smoothing: None,
            optimizer: NelderMeadConfig::default(),
        })
    }

    /// Fix the smoothing parameters instead of estimating them
    pub fn with_smoothing(mut self, alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if value <= 0.0 || value >= 1.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be between 0 and 1 exclusive",
                    name
                )));
            }
        }
        self.smoothing = Some([alpha, beta, gamma]);
        Ok(self)
    }

    /// Replace the optimiser settings
    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn seasonal_type(&self) -> SeasonalType {
        self.seasonal_type
    }

    /// Initial state from the first two seasons.
    ///
    /// The trend is the change in seasonal means per period and the
    /// seasonal factors are measured against that line.
    fn initial_state(&self, values: &[f64]) -> Result<State> {
        let m = self.period;
        let first = &values[..m];
        let second = &values[m..2 * m];
        let first_mean = first.iter().sum::<f64>() / m as f64;
        let second_mean = second.iter().sum::<f64>() / m as f64;
        let trend = (second_mean - first_mean) / m as f64;
        let centre = (m as f64 - 1.0) / 2.0;

        let mut seasonals = Vec::with_capacity(m);
        for (i, &y) in first.iter().enumerate() {
            let base = first_mean + (i as f64 - centre) * trend;
            let factor = match self.seasonal_type {
                SeasonalType::Additive => y - base,
                SeasonalType::Multiplicative => {
                    if base <= 0.0 {
                        return Err(ForecastError::DataError(
                            "Multiplicative seasonality needs a positive baseline".to_string(),
                        ));
                    }
                    y / base
                }
            };
            seasonals.push(factor);
        }

        Ok(State {
            level: first_mean + centre * trend,
            trend,
            seasonals,
        })
    }

    /// Run the recursions from the end of the first season
    fn smooth(&self, values: &[f64], initial: &State, params: &[f64]) -> Pass {
        let (alpha, beta, gamma) = (params[0], params[1], params[2]);
        let m = self.period;
        let mut state = initial.clone();
        let mut fitted = vec![f64::NAN; values.len()];
        let mut sse = 0.0;

        for (t, &y) in values.iter().enumerate().skip(m) {
            let position = t % m;
            let seasonal = state.seasonals[position];
            let base = state.level + state.trend;
            let prediction = match self.seasonal_type {
                SeasonalType::Additive => base + seasonal,
                SeasonalType::Multiplicative => base * seasonal,
            };
            fitted[t] = prediction;
            sse += (y - prediction).powi(2);

            let previous_level = state.level;
            match self.seasonal_type {
                SeasonalType::Additive => {
                    state.level = alpha * (y - seasonal) + (1.0 - alpha) * base;
                    state.trend = beta * (state.level - previous_level) + (1.0 - beta) * state.trend;
                    state.seasonals[position] =
                        gamma * (y - state.level) + (1.0 - gamma) * seasonal;
                }
                SeasonalType::Multiplicative => {
                    state.level = alpha * (y / seasonal) + (1.0 - alpha) * base;
                    state.trend = beta * (state.level - previous_level) + (1.0 - beta) * state.trend;
                    state.seasonals[position] =
                        gamma * (y / state.level) + (1.0 - gamma) * seasonal;
                }
            }
        }

        Pass { sse, fitted, state }
    }
}

impl ForecastModel for HoltWinters {
    type Trained = TrainedHoltWinters;

    fn train(&self, data: &TimeSeriesData, exog: Option<&[f64]>) -> Result<TrainedHoltWinters> {
        if exog.is_some() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} does not accept a regressor",
                self.name
            )));
        }

        let values = data.values();
        let needed = 2 * self.period;
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }
        if self.seasonal_type == SeasonalType::Multiplicative && values.iter().any(|&v| v <= 0.0) {
            return Err(ForecastError::DataError(
                "Multiplicative seasonality requires strictly positive data".to_string(),
            ));
        }

        let initial = self.initial_state(values)?;
        let params = match self.smoothing {
            Some(params) => params,
            None => {
                let bounds = [PARAMETER_BOUNDS; 3];
                let result = nelder_mead(
                    |p| self.smooth(values, &initial, p).sse,
                    &INITIAL_PARAMETERS,
                    Some(bounds.as_slice()),
                    &self.optimizer,
                );
                if !result.converged || !result.optimal_value.is_finite() {
                    return Err(ForecastError::ConvergenceFailure(format!(
                        "{} stopped after {} iterations without converging",
                        self.name, result.iterations
                    )));
                }
                [
                    result.optimal_point[0],
                    result.optimal_point[1],
                    result.optimal_point[2],
                ]
            }
        };

        let pass = self.smooth(values, &initial, &params);
        let sigma2 = pass.sse / (values.len() - self.period) as f64;
        debug!(
            model = %self.name,
            alpha = params[0],
            beta = params[1],
            gamma = params[2],
            sigma2,
            "smoothing parameters selected"
        );

        Ok(TrainedHoltWinters {
            name: self.name.clone(),
            period: self.period,
            seasonal_type: self.seasonal_type,
            alpha: params[0],
            beta: params[1],
            gamma: params[2],
            state: pass.state,
            observed: values.to_vec(),
            fitted: pass.fitted,
            sigma2,
            estimated: self.smoothing.is_none(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Trained Holt-Winters model
#[derive(Debug, Clone)]
pub struct TrainedHoltWinters {
    name: String,
    period: usize,
    seasonal_type: SeasonalType,
    alpha: f64,
    beta: f64,
    gamma: f64,
    state: State,
    observed: Vec<f64>,
    fitted: Vec<f64>,
    sigma2: f64,
    estimated: bool,
}

impl TrainedHoltWinters {
    /// Smoothing parameters (alpha, beta, gamma)
    pub fn smoothing_parameters(&self) -> (f64, f64, f64) {
        (self.alpha, self.beta, self.gamma)
    }

    pub fn level(&self) -> f64 {
        self.state.level
    }

    pub fn trend(&self) -> f64 {
        self.state.trend
    }
}

impl TrainedForecastModel for TrainedHoltWinters {
    fn forecast(&self, horizon: usize, _future_exog: Option<&[f64]>) -> Result<ForecastResult> {
        let n = self.observed.len();
        let m = self.period;

        let values = (1..=horizon)
            .map(|h| {
                let seasonal = self.state.seasonals[(n - 1 + h) % m];
                let base = self.state.level + h as f64 * self.state.trend;
                match self.seasonal_type {
                    SeasonalType::Additive => base + seasonal,
                    SeasonalType::Multiplicative => base * seasonal,
                }
            })
            .collect();

        // Additive-error variance formula, used for both seasonal types
        let mut cumulative = 1.0;
        let std_errors = (1..=horizon)
            .map(|h| {
                if h > 1 {
                    let j = (h - 1) as f64;
                    let seasonal_hit = if (h - 1) % m == 0 { self.gamma } else { 0.0 };
                    cumulative += (self.alpha * (1.0 + j * self.beta) + seasonal_hit).powi(2);
                }
                (self.sigma2 * cumulative).sqrt()
            })
            .collect();

        ForecastResult::new_with_std_errors(values, horizon, std_errors)
    }

    fn observed(&self) -> &[f64] {
        &self.observed
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    fn parameter_count(&self) -> usize {
        let smoothing = if self.estimated { 3 } else { 0 };
        smoothing + 2 + self.period
    }

    fn name(&self) -> &str {
        &self.name
    }
}
