use chrono::NaiveDate;
use price_forecast::models::ModelFamily;
use price_forecast::synthetic::{random_walk, SyntheticSeries};
use price_forecast::{
    DataLoader, ForecastConfig, ForecastRunner, RankingMetric, SeriesColumns, TimeSeriesData,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()
}

fn write_series(series: &TimeSeriesData) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "date,{}", series.name()).unwrap();
    for (month, value) in series.months().iter().zip(series.values()) {
        writeln!(file, "{},{}", month.format("%Y-%m-%d"), value).unwrap();
    }
    file
}

fn ranking(config: &ForecastConfig, price: &TimeSeriesData, fuel: &TimeSeriesData) -> Vec<String> {
    let run = ForecastRunner::new(config.clone())
        .unwrap()
        .run(price, Some(fuel))
        .unwrap();
    run.comparison
        .ranked()
        .iter()
        .map(|e| format!("{}:{:.10}", e.label, e.metrics().unwrap().rmse))
        .collect()
}

#[test]
fn test_full_forecast_workflow() {
    let fuel = random_walk(start(), 72, 3.0, 0.2, 11).unwrap();
    let price = SyntheticSeries::new(start(), 72)
        .with_noise(0.5, 3)
        .generate_with_regressor("price", fuel.values(), 2.0)
        .unwrap();

    let price_file = write_series(&price);
    let fuel_file = write_series(&fuel);
    let price = DataLoader::from_path(price_file.path(), &SeriesColumns::default()).unwrap();
    let fuel = DataLoader::from_path(fuel_file.path(), &SeriesColumns::default()).unwrap();
    assert!(price.is_gap_free());
    assert_eq!(price.len(), 72);

    let runner = ForecastRunner::new(ForecastConfig::default()).unwrap();
    let run = runner.run(&price, Some(&fuel)).unwrap();

    // four plain candidates plus three regressor variants
    let total = run.comparison.ranked().len() + run.comparison.failures().len();
    assert_eq!(total, 7);
    assert_eq!(run.train_len, 60);
    assert_eq!(run.test_values().len(), 12);
    assert!(run
        .comparison
        .ranked()
        .iter()
        .any(|e| e.family() == ModelFamily::HoltWinters));

    let best = run.best.as_ref().unwrap();
    assert_eq!(best.test_forecast.values().len(), 12);
    assert_eq!(best.fitted.len(), 60);
    let future = best.future_forecast.as_ref().unwrap();
    assert_eq!(
        future.months().unwrap()[0],
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
    );
    assert!(run.comparison.to_string().contains("Model comparison"));
}

#[test]
fn test_ranking_is_stable_across_runs() {
    let fuel = random_walk(start(), 60, 3.0, 0.2, 5).unwrap();
    let price = SyntheticSeries::new(start(), 60)
        .with_noise(1.0, 8)
        .generate_with_regressor("price", fuel.values(), 1.0)
        .unwrap();
    let config = ForecastConfig {
        ranking_metric: RankingMetric::Mae,
        ..ForecastConfig::default()
    };

    let first = ranking(&config, &price, &fuel);
    let second = ranking(&config, &price, &fuel);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_regressor_variants_can_be_disabled() {
    let fuel = random_walk(start(), 48, 3.0, 0.2, 1).unwrap();
    let price = SyntheticSeries::new(start(), 48).generate("price").unwrap();
    let config = ForecastConfig {
        use_exogenous: false,
        ..ForecastConfig::default()
    };
    let run = ForecastRunner::new(config).unwrap().run(&price, Some(&fuel)).unwrap();

    assert!(run.exogenous.is_none());
    assert!(run
        .comparison
        .ranked()
        .iter()
        .chain(run.comparison.failures())
        .all(|e| !e.exogenous));
}
