//! Reproducible synthetic inputs for running the analysis without real data

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use price_forecast::synthetic::{random_walk, SyntheticSeries};
use price_forecast::TimeSeriesData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Shape of the generated inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub start: NaiveDate,
    pub months: usize,
    pub suppliers: usize,
    pub warehouses: usize,
    /// Price change per unit of fuel price
    pub fuel_effect: f64,
    pub seed: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN),
            months: 96,
            suppliers: 4,
            warehouses: 6,
            fuel_effect: 4.0,
            seed: 2024,
        }
    }
}

/// Files written by [`write_demo_inputs`]
#[derive(Debug, Clone)]
pub struct DemoFiles {
    pub price: PathBuf,
    pub fuel: PathBuf,
    pub supply: PathBuf,
    /// Configuration pointing at the three inputs
    pub config: PathBuf,
}

fn write_series(path: &Path, series: &TimeSeriesData, value_column: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["date", value_column])?;
    for (month, value) in series.months().iter().zip(series.values()) {
        writer.write_record([month.format("%Y-%m-%d").to_string(), format!("{:.4}", value)])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_supply_table(path: &Path, settings: &DemoSettings) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let demands: Vec<f64> = (0..settings.warehouses)
        .map(|_| rng.gen_range(50..=150) as f64)
        .collect();
    let total_demand: f64 = demands.iter().sum();
    // 30% slack over total demand, split evenly
    let capacity = (total_demand * 1.3 / settings.suppliers as f64).ceil();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["supplier", "warehouse", "cost", "capacity", "demand"])?;
    for s in 0..settings.suppliers {
        for (w, demand) in demands.iter().enumerate() {
            let cost: f64 = rng.gen_range(2.0..12.0);
            writer.write_record([
                format!("S{}", s + 1),
                format!("W{}", w + 1),
                format!("{:.2}", cost),
                format!("{}", capacity),
                format!("{}", demand),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write price, fuel and supply inputs plus a matching config into `dir`
pub fn write_demo_inputs<P: AsRef<Path>>(dir: P, settings: &DemoSettings) -> Result<DemoFiles> {
    if settings.months < 36 || settings.suppliers == 0 || settings.warehouses == 0 {
        return Err(AnalysisError::Config(
            "demo data needs at least 36 months, one supplier and one warehouse".to_string(),
        ));
    }
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let fuel = random_walk(settings.start, settings.months, 3.0, 0.08, settings.seed)?;
    let price = SyntheticSeries::new(settings.start, settings.months)
        .with_trend(120.0, 0.4)
        .with_seasonality(6.0)
        .with_noise(1.5, settings.seed.wrapping_add(1))
        .generate_with_regressor("price", fuel.values(), settings.fuel_effect)?;

    let files = DemoFiles {
        price: dir.join("price_dataset.csv"),
        fuel: dir.join("fuel_price.csv"),
        supply: dir.join("supply_chain_data.csv"),
        config: dir.join("analysis_config.json"),
    };
    write_series(&files.price, &price, "price")?;
    write_series(&files.fuel, &fuel, "fuel_price")?;
    write_supply_table(&files.supply, settings)?;

    let config = AnalysisConfig {
        price_path: files.price.clone(),
        fuel_path: Some(files.fuel.clone()),
        supply_path: files.supply.clone(),
        output_dir: dir.join("outputs"),
        ..AnalysisConfig::default()
    };
    std::fs::write(&files.config, config.to_json()?)?;

    info!(dir = %dir.display(), months = settings.months, "demo inputs written");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_forecast::{DataLoader, SeriesColumns};
    use supply_plan::{SupplyChainTable, SupplyColumns};

    #[test]
    fn inputs_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DemoSettings {
            months: 48,
            ..DemoSettings::default()
        };
        let files = write_demo_inputs(dir.path(), &settings).unwrap();

        let price = DataLoader::from_path(&files.price, &SeriesColumns::default()).unwrap();
        assert_eq!(price.len(), 48);
        assert!(price.is_gap_free());
        let fuel = DataLoader::from_path(&files.fuel, &SeriesColumns::default()).unwrap();
        assert_eq!(fuel.months(), price.months());

        let table = SupplyChainTable::from_csv(&files.supply, &SupplyColumns::default()).unwrap();
        assert_eq!(table.lanes().len(), 4 * 6);
        assert!(table.total_capacity() >= table.total_demand());

        let config = AnalysisConfig::from_json_file(&files.config).unwrap();
        assert_eq!(config.price_path, files.price);
    }

    #[test]
    fn same_seed_same_files() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let settings = DemoSettings::default();
        let fa = write_demo_inputs(a.path(), &settings).unwrap();
        let fb = write_demo_inputs(b.path(), &settings).unwrap();
        for (x, y) in [(&fa.price, &fb.price), (&fa.supply, &fb.supply)] {
            assert_eq!(
                std::fs::read_to_string(x).unwrap(),
                std::fs::read_to_string(y).unwrap()
            );
        }
    }

    #[test]
    fn rejects_short_series() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DemoSettings {
            months: 12,
            ..DemoSettings::default()
        };
        assert!(write_demo_inputs(dir.path(), &settings).is_err());
    }
}
