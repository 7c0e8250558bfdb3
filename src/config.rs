//! Analysis settings, loaded from an optional JSON file

use crate::error::{AnalysisError, Result};
use price_forecast::{ForecastConfig, SeriesColumns};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use supply_plan::SupplyColumns;
use tracing::info;

pub const FORECAST_RESULTS_FILE: &str = "forecast_results.csv";
pub const MODEL_COMPARISON_FILE: &str = "model_comparison.csv";
pub const FORECAST_PLOT_FILE: &str = "forecast_plot.svg";
pub const RESIDUAL_PLOT_FILE: &str = "residual_diagnostics.svg";
pub const SHIPMENT_PLAN_FILE: &str = "shipment_plan.csv";
pub const OPTIMISATION_SUMMARY_FILE: &str = "optimisation_summary.txt";
pub const REPORT_FILE: &str = "report.md";

/// Input locations, column overrides and model settings.
///
/// Every field has a default, so a JSON file only needs the fields it changes:
///
/// ```json
/// { "price_path": "data/prices.csv", "forecast": { "horizon": 6 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub price_path: PathBuf,
    /// Skipped when `None` or when the file does not exist
    pub fuel_path: Option<PathBuf>,
    pub supply_path: PathBuf,
    pub output_dir: PathBuf,
    pub price_columns: SeriesColumns,
    pub fuel_columns: SeriesColumns,
    pub supply_columns: SupplyColumns,
    pub forecast: ForecastConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            price_path: PathBuf::from("data/price_dataset.xlsx"),
            fuel_path: Some(PathBuf::from("data/fuel_price.xlsx")),
            supply_path: PathBuf::from("data/supply_chain_data.csv"),
            output_dir: PathBuf::from("outputs"),
            price_columns: SeriesColumns::default(),
            fuel_columns: SeriesColumns::default(),
            supply_columns: SupplyColumns::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => {
                info!("no configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Resolve from the first command-line argument
    pub fn from_args() -> Result<Self> {
        let arg = std::env::args_os().nth(1).map(PathBuf::from);
        Self::load(arg.as_deref())
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(AnalysisError::Config(
                "output_dir must not be empty".to_string(),
            ));
        }
        // Forecast settings are checked by the runner itself
        price_forecast::ForecastRunner::new(self.forecast.clone())?;
        Ok(())
    }

    /// Path of an output file inside `output_dir`
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// The fuel file, if configured and present
    pub fn existing_fuel_path(&self) -> Option<&Path> {
        self.fuel_path
            .as_deref()
            .filter(|path| path.exists())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use price_forecast::RankingMetric;
    use std::io::Write;

    #[test]
    fn defaults_match_fixed_inputs() {
        let config = AnalysisConfig::default();
        assert_eq!(config.price_path, PathBuf::from("data/price_dataset.xlsx"));
        assert_eq!(config.supply_path, PathBuf::from("data/supply_chain_data.csv"));
        assert_eq!(config.forecast.horizon, 12);
        assert_eq!(
            config.output_path(REPORT_FILE),
            PathBuf::from("outputs/report.md")
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"output_dir": "out", "forecast": {{"horizon": 6, "ranking_metric": "mae"}},
                "supply_columns": {{"cost": "unit_cost"}}}}"#
        )
        .unwrap();

        let config = AnalysisConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.forecast.horizon, 6);
        assert_eq!(config.forecast.ranking_metric, RankingMetric::Mae);
        assert_eq!(config.forecast.models.len(), 4);
        assert_eq!(config.supply_columns.cost, "unit_cost");
        assert_eq!(config.supply_columns.supplier, "supplier");
        assert_eq!(config.price_path, AnalysisConfig::default().price_path);
    }

    #[test]
    fn json_round_trip() {
        let config = AnalysisConfig::default();
        let back: AnalysisConfig = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"forecast": {{"horizon": 0}}}}"#).unwrap();
        assert!(AnalysisConfig::from_json_file(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AnalysisConfig::from_json_file(file.path()),
            Err(AnalysisError::Json(_))
        ));
        assert!(matches!(
            AnalysisConfig::load(Some(Path::new("missing/config.json"))),
            Err(AnalysisError::Config(_))
        ));
    }
}
