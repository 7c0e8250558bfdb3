//! Residual diagnostics for fitted models

use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::fmt;
use ts_math::stats::{acf, ljung_box, mean, std_dev};

/// Portmanteau test summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LjungBoxSummary {
    pub lags: usize,
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
}

/// Summary of in-sample residual behaviour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualDiagnostics {
    /// Residuals used, warm-up excluded
    pub observations: usize,
    pub mean: f64,
    pub std_dev: f64,
    /// Autocorrelations at lags `1..=acf.len()`
    pub acf: Vec<f64>,
    /// Absent when the residual sample is too short for the test
    pub ljung_box: Option<LjungBoxSummary>,
}

impl ResidualDiagnostics {
    /// Diagnose the finite entries of `residuals`.
    ///
    /// `lags` is capped at half the sample so the test stays meaningful.
    pub fn from_residuals(residuals: &[f64], lags: usize, fitted_params: usize) -> Result<Self> {
        let clean: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
        if clean.len() < 3 {
            return Err(ForecastError::InsufficientData {
                needed: 3,
                got: clean.len(),
            });
        }

        let lags = lags.min(clean.len() / 2).max(1);
        let ljung_box = ljung_box(&clean, lags, fitted_params)
            .ok()
            .map(|test| LjungBoxSummary {
                lags,
                statistic: test.statistic,
                p_value: test.p_value,
                degrees_of_freedom: test.degrees_of_freedom,
            });

        Ok(Self {
            observations: clean.len(),
            mean: mean(&clean),
            std_dev: std_dev(&clean),
            acf: acf(&clean, lags),
            ljung_box,
        })
    }

    /// Approximate 95% bound for a single autocorrelation under white noise
    pub fn acf_bound(&self) -> f64 {
        1.96 / (self.observations as f64).sqrt()
    }

    /// Lags whose autocorrelation exceeds [`Self::acf_bound`]
    pub fn significant_lags(&self) -> Vec<usize> {
        let bound = self.acf_bound();
        self.acf
            .iter()
            .enumerate()
            .filter(|(_, r)| r.abs() > bound)
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Whether the Ljung-Box test fails to reject white noise at `alpha`
    pub fn looks_like_white_noise(&self, alpha: f64) -> Option<bool> {
        self.ljung_box.map(|test| test.p_value > alpha)
    }
}

impl fmt::Display for ResidualDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Residual diagnostics ({} observations):", self.observations)?;
        writeln!(f, "  Mean:    {:.4}", self.mean)?;
        writeln!(f, "  Std dev: {:.4}", self.std_dev)?;
        match &self.ljung_box {
            Some(test) => writeln!(
                f,
                "  Ljung-Box Q({}) = {:.3}, p = {:.4}",
                test.lags, test.statistic, test.p_value
            )?,
            None => writeln!(f, "  Ljung-Box: not enough residuals")?,
        }
        let significant = self.significant_lags();
        if significant.is_empty() {
            writeln!(f, "  No autocorrelation outside ±{:.3}", self.acf_bound())?;
        } else {
            writeln!(f, "  Significant ACF lags: {:?}", significant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn warm_up_entries_are_skipped() {
        let residuals = [f64::NAN, f64::NAN, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let diagnostics = ResidualDiagnostics::from_residuals(&residuals, 12, 0).unwrap();
        assert_eq!(diagnostics.observations, 6);
        assert_relative_eq!(diagnostics.mean, 0.0);
        assert_eq!(diagnostics.acf.len(), 3);
        assert!(diagnostics.acf[0] < -0.5);
    }

    #[test]
    fn too_few_residuals() {
        assert!(ResidualDiagnostics::from_residuals(&[f64::NAN, 1.0, 2.0], 4, 0).is_err());
    }

    #[test]
    fn gaussian_noise_passes() {
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let residuals: Vec<f64> = (0..200).map(|_| normal.sample(&mut rng)).collect();
        let diagnostics = ResidualDiagnostics::from_residuals(&residuals, 12, 2).unwrap();
        assert_eq!(diagnostics.looks_like_white_noise(0.01), Some(true));
    }

    #[test]
    fn trending_residuals_fail() {
        let residuals: Vec<f64> = (0..100).map(|t| t as f64).collect();
        let diagnostics = ResidualDiagnostics::from_residuals(&residuals, 10, 0).unwrap();
        assert_eq!(diagnostics.looks_like_white_noise(0.05), Some(false));
        assert!(diagnostics.significant_lags().contains(&1));
        assert!(diagnostics.to_string().contains("Ljung-Box Q(10)"));
    }
}
