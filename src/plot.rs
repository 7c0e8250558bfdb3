//! SVG charts of the forecast and the best model's residuals

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use plotters::prelude::*;
use price_forecast::runner::{BestModel, ForecastRun};
use std::path::Path;

const SIZE: (u32, u32) = (1100, 620);

fn plot_error<E: std::fmt::Display>(err: E) -> AnalysisError {
    AnalysisError::Plot(err.to_string())
}

/// Padded `(min, max)` of the finite values, never an empty span
fn value_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-6).max(hi.abs().max(lo.abs()) * 1e-3);
    (lo - pad, hi + pad)
}

/// `(index, value)` pairs with non-finite values dropped
fn points(offset: usize, values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| ((offset + i) as f64, *v))
        .collect()
}

fn month_label(months: &[NaiveDate], x: f64) -> String {
    let index = x.round();
    if index < 0.0 {
        return String::new();
    }
    months
        .get(index as usize)
        .map(|m| m.format("%Y-%m").to_string())
        .unwrap_or_default()
}

/// Actual, fitted, holdout forecast and future forecast with its interval
pub fn plot_forecast<P: AsRef<Path>>(path: P, run: &ForecastRun) -> Result<()> {
    let best = run
        .best
        .as_ref()
        .ok_or_else(|| AnalysisError::NoUsableModel("no best model to plot".to_string()))?;
    let actual = run.series.values();
    let future = best.future_forecast.as_ref();
    let future_len = future.map(|f| f.horizons()).unwrap_or(0);

    let mut months = run.series.months().to_vec();
    months.extend(run.series.future_months(future_len));

    let interval_values: Vec<f64> = best
        .future_intervals
        .iter()
        .flatten()
        .flat_map(|(l, u)| [*l, *u])
        .collect();
    let (y_min, y_max) = value_range(
        actual
            .iter()
            .chain(best.fitted.iter())
            .chain(best.test_forecast.values())
            .chain(future.map(|f| f.values()).unwrap_or(&[]))
            .chain(interval_values.iter()),
    );
    let x_max = (months.len().max(2) - 1) as f64;

    let root = SVGBackend::new(path.as_ref(), SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{}: {}", run.series.name(), best.label),
            ("sans-serif", 24),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)
        .map_err(plot_error)?;

    let label = |x: &f64| month_label(&months, *x);
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&label)
        .x_desc("Month")
        .y_desc("Price")
        .light_line_style(WHITE)
        .draw()
        .map_err(plot_error)?;

    if let (Some(future), Some(bounds)) = (future, best.future_intervals.as_ref()) {
        let start = run.series.len();
        let upper: Vec<(f64, f64)> = bounds
            .iter()
            .enumerate()
            .map(|(i, (_, u))| ((start + i) as f64, *u))
            .collect();
        let lower = bounds
            .iter()
            .enumerate()
            .rev()
            .map(|(i, (l, _))| ((start + i) as f64, *l));
        let band: Vec<(f64, f64)> = upper
            .into_iter()
            .chain(lower)
            .filter(|(_, v)| v.is_finite())
            .collect();
        if band.len() >= 3 && future.horizons() == bounds.len() {
            chart
                .draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.15).filled())))
                .map_err(plot_error)?
                .label(format!("{:.0}% interval", run.interval_level * 100.0))
                .legend(|(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.15).filled())
                });
        }
    }

    chart
        .draw_series(LineSeries::new(points(0, actual), BLACK.stroke_width(2)))
        .map_err(plot_error)?
        .label("Actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(points(0, &best.fitted), GREEN.stroke_width(1)))
        .map_err(plot_error)?
        .label("Fitted")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN.stroke_width(1)));

    chart
        .draw_series(LineSeries::new(
            points(run.train_len, best.test_forecast.values()),
            RED.stroke_width(2),
        ))
        .map_err(plot_error)?
        .label("Forecast (holdout)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    if let Some(future) = future {
        chart
            .draw_series(LineSeries::new(
                points(run.series.len(), future.values()),
                BLUE.stroke_width(2),
            ))
            .map_err(plot_error)?
            .label("Forecast (future)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Residuals over the training months and their autocorrelation bars
pub fn plot_residual_diagnostics<P: AsRef<Path>>(
    path: P,
    best: &BestModel,
    months: &[NaiveDate],
) -> Result<()> {
    let diagnostics = best.diagnostics.as_ref().ok_or_else(|| {
        AnalysisError::Plot(format!("no residual diagnostics for {}", best.label))
    })?;

    let root = SVGBackend::new(path.as_ref(), SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;
    let (top, bottom) = root.split_vertically(310);

    let residuals = points(0, &best.residuals);
    let (r_min, r_max) = value_range(best.residuals.iter().chain(std::iter::once(&0.0)));
    let x_max = (best.residuals.len().max(2) - 1) as f64;

    let mut chart = ChartBuilder::on(&top)
        .caption(format!("{}: residuals", best.label), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, r_min..r_max)
        .map_err(plot_error)?;
    let label = |x: &f64| month_label(months, *x);
    chart
        .configure_mesh()
        .x_labels(10)
        .x_label_formatter(&label)
        .light_line_style(WHITE)
        .draw()
        .map_err(plot_error)?;
    chart
        .draw_series(LineSeries::new(vec![(0.0, 0.0), (x_max, 0.0)], BLACK.mix(0.5)))
        .map_err(plot_error)?;
    chart
        .draw_series(LineSeries::new(residuals, BLUE.stroke_width(1)))
        .map_err(plot_error)?;

    let lags = diagnostics.acf.len();
    let bound = diagnostics.acf_bound();
    let extent = diagnostics
        .acf
        .iter()
        .filter(|r| r.is_finite())
        .fold(bound, |m, r| m.max(r.abs()))
        .min(1.0)
        * 1.1;

    let mut acf_chart = ChartBuilder::on(&bottom)
        .caption(
            format!("Residual autocorrelation (bounds ±{:.3})", bound),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..(lags as f64 + 1.0), -extent..extent)
        .map_err(plot_error)?;
    acf_chart
        .configure_mesh()
        .x_labels(lags.min(24) + 1)
        .x_label_formatter(&|x: &f64| format!("{:.0}", x))
        .x_desc("Lag")
        .light_line_style(WHITE)
        .draw()
        .map_err(plot_error)?;
    acf_chart
        .draw_series(
            diagnostics
                .acf
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_finite())
                .map(|(i, r)| {
                    let lag = (i + 1) as f64;
                    let color = if r.abs() > bound { RED } else { BLUE };
                    Rectangle::new([(lag - 0.3, 0.0), (lag + 0.3, *r)], color.filled())
                }),
        )
        .map_err(plot_error)?;
    let x_end = lags as f64 + 1.0;
    for level in [bound, -bound] {
        acf_chart
            .draw_series(LineSeries::new(vec![(0.0, level), (x_end, level)], RED.mix(0.6)))
            .map_err(plot_error)?;
    }
    acf_chart
        .draw_series(LineSeries::new(vec![(0.0, 0.0), (x_end, 0.0)], &BLACK))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_handles_flat_and_empty() {
        let (lo, hi) = value_range(&[5.0, 5.0]);
        assert!(lo < 5.0 && hi > 5.0);
        assert_eq!(value_range(&[f64::NAN]), (-1.0, 1.0));
        let (lo, hi) = value_range(&[1.0, 11.0]);
        assert!((lo - 0.5).abs() < 1e-9 && (hi - 11.5).abs() < 1e-9);
    }

    #[test]
    fn labels_follow_months() {
        let months = vec![
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
        ];
        assert_eq!(month_label(&months, 1.2), "2020-02");
        assert_eq!(month_label(&months, 5.0), "");
        assert_eq!(month_label(&months, -1.0), "");
    }

    #[test]
    fn points_skip_warm_up() {
        assert_eq!(points(3, &[f64::NAN, 2.0]), vec![(4.0, 2.0)]);
    }
}
