//! Seeded synthetic monthly series for demos, tests and benchmarks

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// Trend + yearly seasonality + Gaussian noise generator
#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    pub start: NaiveDate,
    pub months: usize,
    pub base: f64,
    /// Change per month
    pub slope: f64,
    /// Amplitude of the 12-month cycle
    pub amplitude: f64,
    pub noise_sd: f64,
    pub seed: u64,
}

impl SyntheticSeries {
    pub fn new(start: NaiveDate, months: usize) -> Self {
        Self {
            start,
            months,
            base: 100.0,
            slope: 0.5,
            amplitude: 5.0,
            noise_sd: 1.0,
            seed: 42,
        }
    }

    pub fn with_trend(mut self, base: f64, slope: f64) -> Self {
        self.base = base;
        self.slope = slope;
        self
    }

    pub fn with_seasonality(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_noise(mut self, noise_sd: f64, seed: u64) -> Self {
        self.noise_sd = noise_sd;
        self.seed = seed;
        self
    }

    /// Noise-free value at month `t`
    pub fn signal(&self, t: usize) -> f64 {
        let t = t as f64;
        self.base + self.slope * t + self.amplitude * (2.0 * PI * t / 12.0).sin()
    }

    /// Generate the series
    pub fn generate(&self, name: &str) -> Result<TimeSeriesData> {
        let values = self.values(None, 0.0)?;
        TimeSeriesData::new(name, self.start, values)
    }

    /// Generate the series with `coefficient * regressor[t]` added
    pub fn generate_with_regressor(
        &self,
        name: &str,
        regressor: &[f64],
        coefficient: f64,
    ) -> Result<TimeSeriesData> {
        let values = self.values(Some(regressor), coefficient)?;
        TimeSeriesData::new(name, self.start, values)
    }

    fn values(&self, regressor: Option<&[f64]>, coefficient: f64) -> Result<Vec<f64>> {
        if let Some(x) = regressor {
            if x.len() < self.months {
                return Err(ForecastError::ValidationError(format!(
                    "Regressor has {} values for {} months",
                    x.len(),
                    self.months
                )));
            }
        }
        let normal = Normal::new(0.0, self.noise_sd)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        Ok((0..self.months)
            .map(|t| {
                let effect = regressor.map(|x| coefficient * x[t]).unwrap_or(0.0);
                self.signal(t) + effect + normal.sample(&mut rng)
            })
            .collect())
    }
}

/// A fuel-like price: a seeded random walk around `level`, floored at 10% of it
pub fn random_walk(
    start: NaiveDate,
    months: usize,
    level: f64,
    step_sd: f64,
    seed: u64,
) -> Result<TimeSeriesData> {
    let normal =
        Normal::new(0.0, step_sd).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let floor = 0.1 * level;

    let mut current = level;
    let values = (0..months)
        .map(|_| {
            current = (current + normal.sample(&mut rng)).max(floor);
            current
        })
        .collect();
    TimeSeriesData::new("fuel_price", start, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
    }

    #[test]
    fn same_seed_same_series() {
        let a = SyntheticSeries::new(start(), 36).generate("a").unwrap();
        let b = SyntheticSeries::new(start(), 36).generate("b").unwrap();
        assert_eq!(a.values(), b.values());

        let c = SyntheticSeries::new(start(), 36)
            .with_noise(1.0, 7)
            .generate("c")
            .unwrap();
        assert_ne!(a.values(), c.values());
    }

    #[test]
    fn noise_free_matches_signal() {
        let generator = SyntheticSeries::new(start(), 24)
            .with_trend(10.0, 1.0)
            .with_noise(0.0, 1);
        let series = generator.generate("s").unwrap();
        assert_relative_eq!(series.values()[6], generator.signal(6), epsilon = 1e-12);
        assert!(series.is_gap_free());
    }

    #[test]
    fn regressor_is_added() {
        let fuel = vec![2.0; 12];
        let series = SyntheticSeries::new(start(), 12)
            .with_seasonality(0.0)
            .with_noise(0.0, 1)
            .with_trend(0.0, 0.0)
            .generate_with_regressor("s", &fuel, 1.5)
            .unwrap();
        assert!(series.values().iter().all(|v| (*v - 3.0).abs() < 1e-12));
        assert!(SyntheticSeries::new(start(), 13)
            .generate_with_regressor("s", &fuel, 1.0)
            .is_err());
    }

    #[test]
    fn random_walk_stays_positive() {
        let fuel = random_walk(start(), 120, 3.0, 0.5, 9).unwrap();
        assert_eq!(fuel.len(), 120);
        assert!(fuel.values().iter().all(|v| *v >= 0.3));
    }
}
