use approx::assert_relative_eq;
use price_forecast::metrics::{
    evaluate_forecast, mean_absolute_error, mean_absolute_percentage_error, mean_squared_error,
    root_mean_squared_error, symmetric_mean_absolute_percentage_error, RankingMetric,
};
use rstest::rstest;

#[test]
fn test_regression_metrics() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

    assert_relative_eq!(mean_absolute_error(&actual, &predicted), 2.4, epsilon = 1e-9);
    assert_relative_eq!(mean_squared_error(&actual, &predicted), 6.0, epsilon = 1e-9);
    assert_relative_eq!(
        root_mean_squared_error(&actual, &predicted),
        6.0_f64.sqrt(),
        epsilon = 1e-9
    );

    // (20 + 10 + 10 + 7.5 + 4) / 5
    assert_relative_eq!(
        mean_absolute_percentage_error(&actual, &predicted),
        10.3,
        epsilon = 1e-9
    );

    let smape = symmetric_mean_absolute_percentage_error(&actual, &predicted);
    assert!(smape > 0.0 && smape < 15.0);
}

#[test]
fn test_mape_skips_zero_actuals() {
    let actual = vec![0.0, 10.0, 20.0];
    let predicted = vec![5.0, 11.0, 18.0];
    assert_relative_eq!(
        mean_absolute_percentage_error(&actual, &predicted),
        10.0,
        epsilon = 1e-9
    );
    assert!(mean_absolute_percentage_error(&[0.0], &[1.0]).is_nan());
}

#[test]
fn test_empty_or_mismatched_inputs() {
    assert!(mean_absolute_error(&[], &[]).is_nan());
    assert!(mean_squared_error(&[1.0, 2.0], &[1.0]).is_nan());
    assert!(evaluate_forecast(&[1.0], &[1.0, 2.0]).is_err());
    assert!(evaluate_forecast(&[f64::NAN], &[1.0]).is_err());
}

#[test]
fn test_evaluate_forecast_bundle() {
    let metrics = evaluate_forecast(&[11.0, 19.0], &[10.0, 20.0]).unwrap();
    assert_relative_eq!(metrics.mae, 1.0);
    assert_relative_eq!(metrics.rmse, 1.0);
    assert_relative_eq!(metrics.mape, 7.5);
    assert_relative_eq!(metrics.get(RankingMetric::Mape), 7.5);
    assert!(metrics.to_string().contains("RMSE"));
}

#[rstest]
#[case("rmse", RankingMetric::Rmse)]
#[case("MAE", RankingMetric::Mae)]
#[case(" mape ", RankingMetric::Mape)]
fn test_ranking_metric_parsing(#[case] text: &str, #[case] expected: RankingMetric) {
    assert_eq!(text.parse::<RankingMetric>().unwrap(), expected);
}

#[test]
fn test_unknown_ranking_metric() {
    assert!("r2".parse::<RankingMetric>().is_err());
    let metric: RankingMetric = serde_json::from_str("\"mae\"").unwrap();
    assert_eq!(metric, RankingMetric::Mae);
}
