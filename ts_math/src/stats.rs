//! Summary statistics and residual tests

use crate::{MathError, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

/// Arithmetic mean, NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance, NaN for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Sample autocorrelation at `lag`.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag >= n {
        return 0.0;
    }
    let m = mean(values);
    let denominator: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denominator == 0.0 {
        return 0.0;
    }
    let numerator: f64 = (lag..n)
        .map(|t| (values[t] - m) * (values[t - lag] - m))
        .sum();
    numerator / denominator
}

/// Autocorrelations for lags `1..=max_lag`.
pub fn acf(values: &[f64], max_lag: usize) -> Vec<f64> {
    (1..=max_lag).map(|lag| autocorrelation(values, lag)).collect()
}

/// Ljung-Box portmanteau test result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LjungBox {
    /// Q statistic
    pub statistic: f64,
    /// Upper-tail χ² probability
    pub p_value: f64,
    /// Degrees of freedom used for the χ² reference
    pub degrees_of_freedom: usize,
}

/// Ljung-Box test over `lags` autocorrelations.
///
/// `fitted_params` is subtracted from the degrees of freedom (never below 1).
pub fn ljung_box(residuals: &[f64], lags: usize, fitted_params: usize) -> Result<LjungBox> {
    let n = residuals.len();
    if lags == 0 {
        return Err(MathError::InvalidInput("Ljung-Box needs at least one lag".to_string()));
    }
    if n <= lags + 1 {
        return Err(MathError::InsufficientData(format!(
            "Ljung-Box with {} lags needs more than {} residuals, got {}",
            lags,
            lags + 1,
            n
        )));
    }

    let nf = n as f64;
    let statistic = nf
        * (nf + 2.0)
        * (1..=lags)
            .map(|k| autocorrelation(residuals, k).powi(2) / (nf - k as f64))
            .sum::<f64>();

    let degrees_of_freedom = lags.saturating_sub(fitted_params).max(1);
    let chi2 = ChiSquared::new(degrees_of_freedom as f64)
        .map_err(|e| MathError::CalculationError(e.to_string()))?;
    let p_value = 1.0 - chi2.cdf(statistic);

    Ok(LjungBox {
        statistic,
        p_value,
        degrees_of_freedom,
    })
}

/// Standard normal quantile.
pub fn normal_quantile(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Probability must be in (0, 1), got {}",
            p
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| MathError::CalculationError(e.to_string()))?;
    Ok(normal.inverse_cdf(p))
}
