use chrono::NaiveDate;
use price_forecast::metrics::evaluate_forecast;
use price_forecast::models::holt_winters::{HoltWinters, SeasonalType};
use price_forecast::models::prophet::ProphetSettings;
use price_forecast::models::sarimax::{ArimaOrder, Sarimax, SeasonalOrder};
use price_forecast::models::{ForecastModel, ModelSpec, TrainedForecastModel};
use price_forecast::TimeSeriesData;
use rstest::rstest;
use ts_math::optimize::NelderMeadConfig;

const MONTHS: usize = 60;
const HORIZON: usize = 12;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

/// y = 100 + 2t
fn linear_trend() -> TimeSeriesData {
    let values = (0..MONTHS).map(|t| 100.0 + 2.0 * t as f64).collect();
    TimeSeriesData::new("price", start(), values).unwrap()
}

fn fuel() -> Vec<f64> {
    (0..MONTHS).map(|t| 3.0 + (t as f64).sin()).collect()
}

/// y = 100 + 2t + 1.5 fuel(t)
fn trend_with_fuel() -> TimeSeriesData {
    let fuel = fuel();
    let values = (0..MONTHS)
        .map(|t| 100.0 + 2.0 * t as f64 + 1.5 * fuel[t])
        .collect();
    TimeSeriesData::new("price", start(), values).unwrap()
}

fn holdout_rmse(spec: &ModelSpec, series: &TimeSeriesData, exog: Option<&[f64]>) -> f64 {
    let (train, test) = series.split_holdout(HORIZON).unwrap();
    let cut = train.len();
    let trained = spec
        .train(&train, exog.map(|x| &x[..cut]), &NelderMeadConfig::default())
        .unwrap();
    let forecast = trained.forecast(HORIZON, exog.map(|x| &x[cut..])).unwrap();
    evaluate_forecast(forecast.values(), test.values()).unwrap().rmse
}

#[rstest]
#[case::arima(ModelSpec::Arima { p: 1, d: 1, q: 1 })]
#[case::sarima(ModelSpec::default_candidates()[1].clone())]
#[case::holt_winters(ModelSpec::HoltWinters { period: 12, seasonal: SeasonalType::Additive })]
#[case::prophet(ModelSpec::Prophet(ProphetSettings::default()))]
fn test_linear_trend_rmse_below_threshold(#[case] spec: ModelSpec) {
    let rmse = holdout_rmse(&spec, &linear_trend(), None);
    assert!(rmse < 1.0, "{} RMSE {}", spec.label(false), rmse);
}

#[rstest]
#[case::arimax(ModelSpec::Arima { p: 1, d: 1, q: 1 })]
#[case::sarimax(ModelSpec::default_candidates()[1].clone())]
#[case::prophet(ModelSpec::Prophet(ProphetSettings::default()))]
fn test_regressor_variants_rmse_below_threshold(#[case] spec: ModelSpec) {
    let fuel = fuel();
    let rmse = holdout_rmse(&spec, &trend_with_fuel(), Some(fuel.as_slice()));
    assert!(rmse < 1.0, "{} RMSE {}", spec.label(true), rmse);
}

#[test]
fn test_holt_winters_rejects_regressor() {
    let spec = ModelSpec::HoltWinters {
        period: 12,
        seasonal: SeasonalType::Additive,
    };
    let fuel = fuel();
    let result = spec.train(
        &linear_trend(),
        Some(fuel.as_slice()),
        &NelderMeadConfig::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_iteration_cap_is_a_convergence_failure() {
    let optimizer = NelderMeadConfig {
        max_iter: 2,
        ..NelderMeadConfig::default()
    };
    let values: Vec<f64> = (0..MONTHS)
        .map(|t| 100.0 + 2.0 * t as f64 + ((t * 37) % 11) as f64)
        .collect();
    let series = TimeSeriesData::new("price", start(), values).unwrap();
    let model = Sarimax::sarima(ArimaOrder::new(1, 1, 1), SeasonalOrder::none())
        .unwrap()
        .with_optimizer(optimizer);

    let err = model.train(&series, None).unwrap_err();
    assert!(err.to_string().contains("converge"));
}

#[test]
fn test_fitted_and_residuals_line_up() {
    let series = linear_trend();
    let trained = HoltWinters::new(12, SeasonalType::Additive)
        .unwrap()
        .train(&series, None)
        .unwrap();

    assert_eq!(trained.fitted_values().len(), series.len());
    let residuals = trained.residuals();
    assert!(residuals[..12].iter().all(|r| r.is_nan()));
    assert!(residuals[12..].iter().all(|r| r.abs() < 1e-6));
}

#[test]
fn test_forecast_intervals_widen() {
    let values: Vec<f64> = (0..MONTHS)
        .map(|t| 50.0 + t as f64 + ((t * 13) % 5) as f64)
        .collect();
    let series = TimeSeriesData::new("price", start(), values).unwrap();
    let trained = Sarimax::arima(1, 1, 1).unwrap().train(&series, None).unwrap();
    let forecast = trained.forecast(HORIZON, None).unwrap();

    let intervals = forecast.confidence_intervals(0.95).unwrap();
    let first = intervals[0].1 - intervals[0].0;
    let last = intervals[HORIZON - 1].1 - intervals[HORIZON - 1].0;
    assert!(last > first);
    for ((lower, upper), value) in intervals.iter().zip(forecast.values()) {
        assert!(lower < value && value < upper);
    }
}
