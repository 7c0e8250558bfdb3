//! Seasonal ARIMA with an optional exogenous regressor.
//!
//! The model is a regression with ARMA errors on the differenced scale:
//!
//! ```text
//! Δ(B) y_t = c + β Δ(B) x_t + z_t
//! φ(B) Φ(B^s) z_t = θ(B) Θ(B^s) e_t
//! ```
//!
//! where `Δ(B) = (1 - B)^d (1 - B^s)^D`. Parameters are estimated by
//! conditional sum of squares with a bounded Nelder-Mead search, which keeps
//! every AR and MA coefficient inside `(-0.99, 0.99)`.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{
    check_regressor, future_regressor, ForecastModel, ForecastResult, TrainedForecastModel,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_math::differencing::{
    apply_polynomial, differencing_polynomial, integrate, lag_polynomial, multiply_polynomials,
};
use ts_math::optimize::{nelder_mead, NelderMeadConfig};
use ts_math::regression::simple_linear_regression;
use ts_math::stats::{mean, std_dev};

const COEFFICIENT_BOUND: f64 = 0.99;
const MAX_ORDER: usize = 5;
const MAX_DIFFERENCING: usize = 2;

/// Non-seasonal order (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

/// Seasonal order (P, D, Q, s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    /// No seasonal component
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether any seasonal term is present
    pub fn is_seasonal(&self) -> bool {
        self.p + self.d + self.q > 0
    }
}

/// Display label such as `SARIMAX(1,1,1)(1,1,1,12)`
pub fn label(order: ArimaOrder, seasonal: SeasonalOrder, exogenous: bool) -> String {
    let suffix = if exogenous { "X" } else { "" };
    if seasonal.is_seasonal() {
        format!(
            "SARIMA{}({},{},{})({},{},{},{})",
            suffix, order.p, order.d, order.q, seasonal.p, seasonal.d, seasonal.q, seasonal.period
        )
    } else {
        format!("ARIMA{}({},{},{})", suffix, order.p, order.d, order.q)
    }
}

/// Seasonal ARIMA model, with or without a regressor
#[derive(Debug, Clone)]
pub struct Sarimax {
    name: String,
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    optimizer: NelderMeadConfig,
}

impl Sarimax {
    /// Non-seasonal ARIMA(p, d, q)
    pub fn arima(p: usize, d: usize, q: usize) -> Result<Self> {
        Self::sarima(ArimaOrder::new(p, d, q), SeasonalOrder::none())
    }

    /// SARIMA(p, d, q)(P, D, Q, s)
    pub fn sarima(order: ArimaOrder, seasonal: SeasonalOrder) -> Result<Self> {
        if order.p > MAX_ORDER || order.q > MAX_ORDER || seasonal.p > MAX_ORDER || seasonal.q > MAX_ORDER
        {
            return Err(ForecastError::InvalidParameter(format!(
                "AR and MA orders must not exceed {}",
                MAX_ORDER
            )));
        }
        if order.d > MAX_DIFFERENCING || seasonal.d > MAX_DIFFERENCING {
            return Err(ForecastError::InvalidParameter(format!(
                "Differencing orders must not exceed {}",
                MAX_DIFFERENCING
            )));
        }
        if seasonal.is_seasonal() && seasonal.period < 2 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be at least 2".to_string(),
            ));
        }

        Ok(Self {
            name: label(order, seasonal, false),
            order,
            seasonal,
            optimizer: NelderMeadConfig::default(),
        })
    }

    /// Replace the optimiser settings
    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    fn period(&self) -> usize {
        if self.seasonal.is_seasonal() {
            self.seasonal.period
        } else {
            1
        }
    }

    fn layout(&self, exogenous: bool) -> Layout {
        Layout {
            exogenous,
            p: self.order.p,
            seasonal_p: self.seasonal.p,
            q: self.order.q,
            seasonal_q: self.seasonal.q,
            period: self.period(),
        }
    }

    fn differencing(&self) -> Vec<f64> {
        differencing_polynomial(self.order.d, self.seasonal.d, self.period())
    }
}

/// Position of each estimated coefficient in the optimiser's vector
#[derive(Debug, Clone, Copy)]
struct Layout {
    exogenous: bool,
    p: usize,
    seasonal_p: usize,
    q: usize,
    seasonal_q: usize,
    period: usize,
}

/// Unpacked coefficients
#[derive(Debug, Clone)]
struct Coefficients {
    intercept: f64,
    beta: Option<f64>,
    ar: Vec<f64>,
    seasonal_ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl Layout {
    fn arma_start(&self) -> usize {
        if self.exogenous {
            2
        } else {
            1
        }
    }

    fn len(&self) -> usize {
        self.arma_start() + self.p + self.seasonal_p + self.q + self.seasonal_q
    }

    fn ar_lags(&self) -> usize {
        self.p + self.seasonal_p * self.period
    }

    fn ma_lags(&self) -> usize {
        self.q + self.seasonal_q * self.period
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY); self.arma_start()];
        bounds.resize(self.len(), (-COEFFICIENT_BOUND, COEFFICIENT_BOUND));
        bounds
    }

    fn unpack(&self, params: &[f64]) -> Coefficients {
        let mut offset = self.arma_start();
        let mut take = |count: usize| {
            let slice = params[offset..offset + count].to_vec();
            offset += count;
            slice
        };
        let ar = take(self.p);
        let seasonal_ar = take(self.seasonal_p);
        let ma = take(self.q);
        let seasonal_ma = take(self.seasonal_q);

        Coefficients {
            intercept: params[0],
            beta: if self.exogenous { Some(params[1]) } else { None },
            ar,
            seasonal_ar,
            ma,
            seasonal_ma,
        }
    }
}

impl Coefficients {
    /// `φ(B)Φ(B^s)` as a coefficient vector starting at lag 0
    fn ar_polynomial(&self, period: usize) -> Vec<f64> {
        multiply_polynomials(
            &lag_polynomial(&self.ar, -1.0, 1),
            &lag_polynomial(&self.seasonal_ar, -1.0, period),
        )
    }

    /// `θ(B)Θ(B^s)` as a coefficient vector starting at lag 0
    fn ma_polynomial(&self, period: usize) -> Vec<f64> {
        multiply_polynomials(
            &lag_polynomial(&self.ma, 1.0, 1),
            &lag_polynomial(&self.seasonal_ma, 1.0, period),
        )
    }

    /// Regression errors `z_t = w_t - c - β wx_t`
    fn errors(&self, differenced: &[f64], differenced_exog: Option<&[f64]>) -> Vec<f64> {
        match (self.beta, differenced_exog) {
            (Some(beta), Some(wx)) => differenced
                .iter()
                .zip(wx.iter())
                .map(|(w, x)| w - self.intercept - beta * x)
                .collect(),
            _ => differenced.iter().map(|w| w - self.intercept).collect(),
        }
    }
}

/// One-step ARMA prediction of `z[t]` from its past and past innovations
fn arma_step(z: &[f64], innovations: &[f64], t: usize, ar_poly: &[f64], ma_poly: &[f64]) -> f64 {
    let mut prediction = 0.0;
    for (k, &c) in ar_poly.iter().enumerate().skip(1) {
        prediction -= c * z[t - k];
    }
    for (k, &c) in ma_poly.iter().enumerate().skip(1) {
        if t >= k {
            prediction += c * innovations[t - k];
        }
    }
    prediction
}

/// Conditional innovations; the first `ar_poly.len() - 1` are zero.
fn innovations(z: &[f64], ar_poly: &[f64], ma_poly: &[f64]) -> Vec<f64> {
    let start = ar_poly.len() - 1;
    let mut e = vec![0.0; z.len()];
    for t in start..z.len() {
        e[t] = z[t] - arma_step(z, &e, t, ar_poly, ma_poly);
    }
    e
}

impl ForecastModel for Sarimax {
    type Trained = TrainedSarimax;

    fn train(&self, data: &TimeSeriesData, exog: Option<&[f64]>) -> Result<TrainedSarimax> {
        let values = data.values();
        let n = values.len();
        check_regressor(exog, n)?;

        let layout = self.layout(exog.is_some());
        let name = label(self.order, self.seasonal, exog.is_some());
        let diff_poly = self.differencing();
        let diff_lags = diff_poly.len() - 1;
        let needed = diff_lags + layout.ar_lags().max(layout.ma_lags()) + layout.len() + 2;
        if n < needed {
            return Err(ForecastError::InsufficientData { needed, got: n });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Series contains non-finite values".to_string(),
            ));
        }

        let differenced = apply_polynomial(values, &diff_poly);
        let differenced_exog = exog.map(|x| apply_polynomial(x, &diff_poly));
        if let Some(wx) = differenced_exog.as_deref() {
            // β is not identified next to the intercept
            if std_dev(wx) < 1e-12 {
                return Err(ForecastError::InvalidParameter(
                    "Regressor is constant after differencing".to_string(),
                ));
            }
        }

        let mut initial = vec![0.0; layout.len()];
        match differenced_exog.as_deref() {
            Some(wx) => {
                let (slope, intercept) =
                    simple_linear_regression(wx, &differenced).unwrap_or((0.0, mean(&differenced)));
                initial[0] = intercept;
                initial[1] = slope;
            }
            None => initial[0] = mean(&differenced),
        }
        for value in initial.iter_mut().skip(layout.arma_start()) {
            *value = 0.1;
        }

        let period = layout.period;
        let ar_start = layout.ar_lags();
        let objective = |params: &[f64]| {
            let coefficients = layout.unpack(params);
            let z = coefficients.errors(&differenced, differenced_exog.as_deref());
            let e = innovations(
                &z,
                &coefficients.ar_polynomial(period),
                &coefficients.ma_polynomial(period),
            );
            e[ar_start..].iter().map(|v| v * v).sum::<f64>()
        };

        let bounds = layout.bounds();
        let result = nelder_mead(objective, &initial, Some(bounds.as_slice()), &self.optimizer);
        if !result.optimal_value.is_finite() {
            return Err(ForecastError::ConvergenceFailure(format!(
                "{}: objective is not finite",
                name
            )));
        }
        if !result.converged {
            return Err(ForecastError::ConvergenceFailure(format!(
                "{} stopped after {} iterations without converging",
                name, result.iterations
            )));
        }

        let coefficients = layout.unpack(&result.optimal_point);
        let ar_poly = coefficients.ar_polynomial(period);
        let ma_poly = coefficients.ma_polynomial(period);
        let z = coefficients.errors(&differenced, differenced_exog.as_deref());
        let e = innovations(&z, &ar_poly, &ma_poly);

        let effective = (z.len() - ar_start) as f64;
        let sse = result.optimal_value;
        let sigma2 = sse / effective;
        let aic = effective * sigma2.max(f64::MIN_POSITIVE).ln() + 2.0 * layout.len() as f64;

        // y_t - e_t is the one-step prediction on the original scale
        let mut fitted = vec![f64::NAN; n];
        for (i, innovation) in e.iter().enumerate().skip(ar_start) {
            let t = i + diff_lags;
            fitted[t] = values[t] - innovation;
        }

        debug!(
            model = %name,
            iterations = result.iterations,
            sigma2,
            aic,
            "fitted by conditional sum of squares"
        );

        Ok(TrainedSarimax {
            name,
            order: self.order,
            seasonal: self.seasonal,
            intercept: coefficients.intercept,
            exog_coefficient: coefficients.beta,
            ar: coefficients.ar,
            seasonal_ar: coefficients.seasonal_ar,
            ma: coefficients.ma,
            seasonal_ma: coefficients.seasonal_ma,
            ar_poly,
            ma_poly,
            diff_poly,
            history: values.to_vec(),
            history_exog: exog.map(|x| x.to_vec()),
            errors: z,
            innovations: e,
            fitted,
            sigma2,
            aic,
            parameter_count: layout.len(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn supports_exogenous(&self) -> bool {
        true
    }
}

/// Trained seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedSarimax {
    name: String,
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    intercept: f64,
    exog_coefficient: Option<f64>,
    ar: Vec<f64>,
    seasonal_ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ma: Vec<f64>,
    ar_poly: Vec<f64>,
    ma_poly: Vec<f64>,
    diff_poly: Vec<f64>,
    history: Vec<f64>,
    history_exog: Option<Vec<f64>>,
    errors: Vec<f64>,
    innovations: Vec<f64>,
    fitted: Vec<f64>,
    sigma2: f64,
    aic: f64,
    parameter_count: usize,
}

impl TrainedSarimax {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    /// Constant on the differenced scale
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Regressor coefficient, when trained with one
    pub fn exog_coefficient(&self) -> Option<f64> {
        self.exog_coefficient
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.seasonal_ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.seasonal_ma
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Akaike information criterion of the conditional fit
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// ψ-weights of the integrated process, `ψ_0 = 1`
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        let full_ar = multiply_polynomials(&self.ar_poly, &self.diff_poly);
        let mut psi = vec![0.0; count];
        if count == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..count {
            let mut value = self.ma_poly.get(j).copied().unwrap_or(0.0);
            for (k, &c) in full_ar.iter().enumerate().skip(1).take(j) {
                value -= c * psi[j - k];
            }
            psi[j] = value;
        }
        psi
    }
}

impl TrainedForecastModel for TrainedSarimax {
    fn forecast(&self, horizon: usize, future_exog: Option<&[f64]>) -> Result<ForecastResult> {
        let future_x = match self.history_exog {
            Some(_) => Some(future_regressor(future_exog, horizon)?),
            None => None,
        };

        let mut z = self.errors.clone();
        let mut e = self.innovations.clone();
        for _ in 0..horizon {
            let t = z.len();
            let prediction = arma_step(&z, &e, t, &self.ar_poly, &self.ma_poly);
            z.push(prediction);
            e.push(0.0);
        }
        let future_z = &z[z.len() - horizon..];

        let differenced: Vec<f64> = match (&self.history_exog, future_x, self.exog_coefficient) {
            (Some(history_x), Some(future_x), Some(beta)) => {
                let mut x = history_x.clone();
                x.extend_from_slice(future_x);
                let wx = apply_polynomial(&x, &self.diff_poly);
                let future_wx = &wx[wx.len() - horizon..];
                future_z
                    .iter()
                    .zip(future_wx.iter())
                    .map(|(z, x)| z + self.intercept + beta * x)
                    .collect()
            }
            _ => future_z.iter().map(|z| z + self.intercept).collect(),
        };

        let values = integrate(&self.history, &differenced, &self.diff_poly);

        let psi = self.psi_weights(horizon);
        let mut cumulative = 0.0;
        let std_errors = psi
            .iter()
            .map(|w| {
                cumulative += w * w;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect();

        ForecastResult::new_with_std_errors(values, horizon, std_errors)
    }

    fn observed(&self) -> &[f64] {
        &self.history
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    fn name(&self) -> &str {
        &self.name
    }
}
