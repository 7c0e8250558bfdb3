use price_forecast::error::ForecastError;
use std::io;
use ts_math::MathError;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    assert!(matches!(ForecastError::from(io_error), ForecastError::IoError(_)));

    let parse_error = "invalid data".parse::<f64>().unwrap_err();
    assert!(matches!(
        ForecastError::from(parse_error),
        ForecastError::ParseError(_)
    ));

    let math_error = MathError::SingularSystem("pivot in column 2 is zero".to_string());
    assert!(matches!(
        ForecastError::from(math_error),
        ForecastError::MathError(_)
    ));
}

#[test]
fn test_error_display() {
    let error = ForecastError::InvalidParameter("alpha must be between 0 and 1".to_string());
    assert!(error.to_string().contains("alpha must be between 0 and 1"));

    let error = ForecastError::from(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "permission denied",
    ));
    let error_string = error.to_string();
    assert!(error_string.contains("IO error"));
    assert!(error_string.contains("permission denied"));

    let error = ForecastError::InsufficientData { needed: 36, got: 20 };
    assert_eq!(
        error.to_string(),
        "Insufficient data: need at least 36 observations, got 20"
    );
}

#[test]
fn test_convergence_failure_message() {
    let error = ForecastError::ConvergenceFailure("SARIMA(1,1,1)(1,1,1,12)".to_string());
    assert_eq!(
        error.to_string(),
        "Model failed to converge: SARIMA(1,1,1)(1,1,1,12)"
    );
}
