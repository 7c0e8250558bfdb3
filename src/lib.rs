//! # Retail Insight
//!
//! Batch analysis of a monthly retail price series and a supply-chain table.
//!
//! - [`pipeline::run_forecast`] scores ARIMA, SARIMA, Holt-Winters and
//!   Prophet-style models on a holdout window, optionally with fuel prices as
//!   a regressor, and forecasts ahead with the best one.
//! - [`pipeline::run_optimisation`] solves the minimum-cost shipment plan.
//! - [`pipeline::run_analysis`] runs both and writes a markdown report.
//!
//! ```rust,no_run
//! use retail_insight::{pipeline, AnalysisConfig};
//!
//! # fn main() -> retail_insight::Result<()> {
//! let config = AnalysisConfig::default();
//! let outcome = pipeline::run_analysis(&config)?;
//! println!("report written to {}", outcome.report.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod report;

pub use crate::config::AnalysisConfig;
pub use crate::error::{AnalysisError, Result};

/// Install the `tracing` subscriber used by the binaries.
///
/// Defaults to `info`; `RUST_LOG` overrides it.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

/// Print an error the way the binaries report failures
pub fn report_failure(err: &AnalysisError) {
    eprintln!("Error: {err}");
    eprintln!("{}", err.hint());
}
