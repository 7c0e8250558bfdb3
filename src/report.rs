//! Tabular and written outputs

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use price_forecast::runner::{BestModel, ForecastRun};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use supply_plan::AllocationPlan;
use supply_plan::plan::format_thousands;

/// One month of `forecast_results.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub month: NaiveDate,
    pub actual: Option<f64>,
    pub fitted: Option<f64>,
    pub forecast_eval: Option<f64>,
    pub future_forecast: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ForecastRow {
    fn empty(month: NaiveDate) -> Self {
        Self {
            month,
            actual: None,
            fitted: None,
            forecast_eval: None,
            future_forecast: None,
            lower: None,
            upper: None,
        }
    }
}

fn finite(value: Option<&f64>) -> Option<f64> {
    value.copied().filter(|v| v.is_finite())
}

/// Observed months followed by the future months of the best model
pub fn forecast_rows(run: &ForecastRun, best: &BestModel) -> Vec<ForecastRow> {
    let months = run.series.months();
    let values = run.series.values();
    let mut rows: Vec<ForecastRow> = months
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (month, actual))| {
            let mut row = ForecastRow::empty(*month);
            row.actual = Some(*actual);
            if i < run.train_len {
                row.fitted = finite(best.fitted.get(i));
            } else {
                row.forecast_eval = finite(best.test_forecast.values().get(i - run.train_len));
            }
            row
        })
        .collect();

    if let Some(future) = &best.future_forecast {
        let future_months = future
            .months()
            .map(<[NaiveDate]>::to_vec)
            .unwrap_or_else(|| run.series.future_months(future.horizons()));
        for (i, month) in future_months.into_iter().enumerate() {
            let mut row = ForecastRow::empty(month);
            row.future_forecast = finite(future.values().get(i));
            if let Some((lower, upper)) = best.future_intervals.as_ref().and_then(|b| b.get(i)) {
                row.lower = Some(*lower).filter(|v| v.is_finite());
                row.upper = Some(*upper).filter(|v| v.is_finite());
            }
            rows.push(row);
        }
    }
    rows
}

pub fn write_forecast_results<P: AsRef<Path>>(path: P, run: &ForecastRun) -> Result<()> {
    let best = run
        .best
        .as_ref()
        .ok_or_else(|| AnalysisError::NoUsableModel("no best model to write".to_string()))?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in forecast_rows(run, best) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn fmt_metric(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        "n/a".to_string()
    }
}

/// Markdown section for the forecasting half
pub fn forecast_section(run: &ForecastRun) -> String {
    let mut out = String::new();
    let series = &run.series;
    let _ = writeln!(out, "## Price forecast\n");
    if let (Some(first), Some(last)) = (series.first_month(), series.last_month()) {
        let _ = writeln!(
            out,
            "Series `{}`: {} months from {} to {} ({} interpolated). \
             The last {} months were held out for scoring.\n",
            series.name(),
            series.len(),
            first.format("%Y-%m"),
            last.format("%Y-%m"),
            series.interpolated_count(),
            run.horizon
        );
    }
    let _ = writeln!(
        out,
        "Fuel price regressor: {}.\n",
        if run.exogenous.is_some() { "used" } else { "not used" }
    );

    let comparison = &run.comparison;
    let _ = writeln!(out, "### Model comparison (ranked by {})\n", comparison.metric());
    let _ = writeln!(out, "| Rank | Model | RMSE | MAE | MAPE % | sMAPE % | Ljung-Box p |");
    let _ = writeln!(out, "|---:|---|---:|---:|---:|---:|---:|");
    for (i, evaluation) in comparison.ranked().iter().enumerate() {
        if let Some(fit) = evaluation.fit() {
            let p_value = fit
                .diagnostics
                .as_ref()
                .and_then(|d| d.ljung_box)
                .map(|test| fmt_metric(test.p_value, 3))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} |",
                i + 1,
                evaluation.label,
                fmt_metric(fit.metrics.rmse, 4),
                fmt_metric(fit.metrics.mae, 4),
                fmt_metric(fit.metrics.mape, 2),
                fmt_metric(fit.metrics.smape, 2),
                p_value
            );
        }
    }
    if !comparison.failures().is_empty() {
        let _ = writeln!(out, "\nExcluded from the ranking:\n");
        for evaluation in comparison.failures() {
            let _ = writeln!(
                out,
                "- {}: {}",
                evaluation.label,
                evaluation.failure().unwrap_or("unknown error")
            );
        }
    }

    match &run.best {
        Some(best) => {
            let _ = writeln!(out, "\n### Best model: {}\n", best.label);
            match &best.diagnostics {
                Some(diagnostics) => {
                    let _ = writeln!(
                        out,
                        "Residuals: mean {:.4}, standard deviation {:.4} over {} observations.",
                        diagnostics.mean, diagnostics.std_dev, diagnostics.observations
                    );
                    if let Some(test) = diagnostics.ljung_box {
                        let verdict = if test.p_value > 0.05 {
                            "no evidence of remaining autocorrelation"
                        } else {
                            "residual autocorrelation remains"
                        };
                        let _ = writeln!(
                            out,
                            "Ljung-Box Q = {:.3} at {} lags (p = {:.3}): {} at the 5% level.",
                            test.statistic, test.lags, test.p_value, verdict
                        );
                    }
                    let significant = diagnostics.significant_lags();
                    if !significant.is_empty() {
                        let lags: Vec<String> = significant.iter().map(|l| l.to_string()).collect();
                        let _ = writeln!(
                            out,
                            "Autocorrelation outside ±{:.3} at lags {}.",
                            diagnostics.acf_bound(),
                            lags.join(", ")
                        );
                    }
                }
                None => {
                    let _ = writeln!(out, "Residual diagnostics unavailable.");
                }
            }

            if let Some(future) = &best.future_forecast {
                let _ = writeln!(
                    out,
                    "\nForecast for the next {} months ({:.0}% interval):\n",
                    future.horizons(),
                    run.interval_level * 100.0
                );
                let _ = writeln!(out, "| Month | Forecast | Lower | Upper |");
                let _ = writeln!(out, "|---|---:|---:|---:|");
                let months = future.months().unwrap_or(&[]);
                for (i, value) in future.values().iter().enumerate() {
                    let month = months
                        .get(i)
                        .map(|m| m.format("%Y-%m").to_string())
                        .unwrap_or_else(|| format!("+{}", i + 1));
                    let (lower, upper) = best
                        .future_intervals
                        .as_ref()
                        .and_then(|b| b.get(i))
                        .map(|(l, u)| (fmt_metric(*l, 2), fmt_metric(*u, 2)))
                        .unwrap_or_else(|| ("n/a".to_string(), "n/a".to_string()));
                    let _ = writeln!(
                        out,
                        "| {} | {} | {} | {} |",
                        month,
                        fmt_metric(*value, 2),
                        lower,
                        upper
                    );
                }
            } else {
                let _ = writeln!(out, "\nThe refit on the full series failed; no future forecast.");
            }
        }
        None => {
            let _ = writeln!(out, "\nNo model could be evaluated.");
        }
    }
    out
}

/// Markdown section for the allocation half
pub fn allocation_section(allocation: std::result::Result<&AllocationPlan, &AnalysisError>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Shipment allocation\n");
    match allocation {
        Ok(plan) => {
            let _ = writeln!(
                out,
                "Status: {}. Total cost: {}. Total shipped: {}.\n",
                plan.status(),
                format_thousands(plan.total_cost(), 2),
                format_thousands(plan.total_shipped(), 2)
            );
            let _ = writeln!(out, "| Supplier | Warehouse | Qty | Unit cost | Ship cost |");
            let _ = writeln!(out, "|---|---|---:|---:|---:|");
            for s in plan.shipments() {
                let _ = writeln!(
                    out,
                    "| {} | {} | {:.2} | {:.2} | {:.2} |",
                    s.supplier, s.warehouse, s.quantity, s.unit_cost, s.ship_cost
                );
            }
        }
        Err(err) => {
            let _ = writeln!(out, "Allocation failed: {err}");
        }
    }
    out
}

/// The full written report
pub fn render_report(
    run: &ForecastRun,
    allocation: std::result::Result<&AllocationPlan, &AnalysisError>,
) -> String {
    format!(
        "# Retail price and supply analysis\n\n{}\n{}",
        forecast_section(run),
        allocation_section(allocation)
    )
}

pub fn write_report<P: AsRef<Path>>(
    path: P,
    run: &ForecastRun,
    allocation: std::result::Result<&AllocationPlan, &AnalysisError>,
) -> Result<()> {
    std::fs::write(path, render_report(run, allocation))?;
    Ok(())
}
