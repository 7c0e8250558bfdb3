//! # Price Forecast
//!
//! Monthly retail price forecasting with model comparison on a holdout window.
//!
//! ## Features
//!
//! - Monthly series loading from CSV or spreadsheets, with gap interpolation
//! - Seasonal ARIMA with an optional exogenous regressor (ARIMA, SARIMA, ARIMAX, SARIMAX)
//! - Holt-Winters exponential smoothing (additive or multiplicative seasonality)
//! - Prophet-style trend, changepoint and Fourier seasonality regression
//! - RMSE/MAE/MAPE scoring, deterministic ranking and residual diagnostics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use price_forecast::data::{DataLoader, SeriesColumns};
//! use price_forecast::runner::{ForecastConfig, ForecastRunner};
//!
//! # fn main() -> price_forecast::error::Result<()> {
//! // Load data
//! let price = DataLoader::from_path("data/price_dataset.xlsx", &SeriesColumns::default())?;
//! let fuel = DataLoader::from_path("data/fuel_price.xlsx", &SeriesColumns::default())?;
//!
//! // Evaluate every candidate on the last 12 months
//! let runner = ForecastRunner::new(ForecastConfig::default())?;
//! let run = runner.run(&price, Some(&fuel))?;
//!
//! println!("{}", run.comparison);
//! if let Some(best) = &run.best {
//!     println!("Best model: {}", best.label);
//! }
//! # Ok(())
//! # }
//! ```

pub mod comparison;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod synthetic;

// Re-export commonly used types
pub use crate::comparison::{ModelComparison, ModelEvaluation};
pub use crate::data::{DataLoader, SeriesColumns, TimeSeriesData};
pub use crate::error::ForecastError;
pub use crate::metrics::{ErrorMetrics, RankingMetric};
pub use crate::models::{ForecastModel, ForecastResult, ModelSpec, TrainedForecastModel};
pub use crate::runner::{ForecastConfig, ForecastRun, ForecastRunner};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
