//! The three batch runs: forecast, optimisation, and both with a report

use crate::config::{
    AnalysisConfig, FORECAST_PLOT_FILE, FORECAST_RESULTS_FILE, MODEL_COMPARISON_FILE,
    OPTIMISATION_SUMMARY_FILE, REPORT_FILE, RESIDUAL_PLOT_FILE, SHIPMENT_PLAN_FILE,
};
use crate::error::{AnalysisError, Result};
use crate::{plot, report};
use price_forecast::runner::ForecastRun;
use price_forecast::{DataLoader, ForecastRunner, TimeSeriesData};
use std::path::PathBuf;
use supply_plan::{AllocationPlan, ShipmentOptimizer, SupplyChainTable};
use tracing::{info, warn};

#[derive(Debug)]
pub struct ForecastOutcome {
    pub run: ForecastRun,
    /// Output files written, in order
    pub files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct OptimisationOutcome {
    pub plan: AllocationPlan,
    pub files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub forecast: ForecastOutcome,
    pub optimisation: OptimisationOutcome,
    pub report: PathBuf,
}

fn ensure_output_dir(config: &AnalysisConfig) -> Result<()> {
    std::fs::create_dir_all(&config.output_dir)?;
    Ok(())
}

pub fn load_price(config: &AnalysisConfig) -> Result<TimeSeriesData> {
    Ok(DataLoader::from_path(&config.price_path, &config.price_columns)?)
}

/// The fuel series, or `None` when it is not configured or absent on disk
pub fn load_fuel(config: &AnalysisConfig) -> Result<Option<TimeSeriesData>> {
    match config.existing_fuel_path() {
        Some(path) => Ok(Some(DataLoader::from_path(path, &config.fuel_columns)?)),
        None => {
            info!(
                path = ?config.fuel_path,
                "fuel price file not available, forecasting without a regressor"
            );
            Ok(None)
        }
    }
}

/// Evaluate every candidate, then write the comparison, results and plots
pub fn run_forecast(config: &AnalysisConfig) -> Result<ForecastOutcome> {
    let price = load_price(config)?;
    let fuel = load_fuel(config)?;
    ensure_output_dir(config)?;

    let runner = ForecastRunner::new(config.forecast.clone())?;
    let run = runner.run(&price, fuel.as_ref())?;

    let mut files = Vec::new();
    let comparison_path = config.output_path(MODEL_COMPARISON_FILE);
    run.comparison.write_csv(&comparison_path)?;
    files.push(comparison_path);

    let best = match &run.best {
        Some(best) => best,
        None => {
            let reasons: Vec<String> = run
                .comparison
                .failures()
                .iter()
                .map(|e| format!("{}: {}", e.label, e.failure().unwrap_or("unknown error")))
                .collect();
            return Err(AnalysisError::NoUsableModel(reasons.join("; ")));
        }
    };

    let results_path = config.output_path(FORECAST_RESULTS_FILE);
    report::write_forecast_results(&results_path, &run)?;
    files.push(results_path);

    let plot_path = config.output_path(FORECAST_PLOT_FILE);
    plot::plot_forecast(&plot_path, &run)?;
    files.push(plot_path);

    if best.diagnostics.is_some() {
        let residual_path = config.output_path(RESIDUAL_PLOT_FILE);
        let train_months = &run.series.months()[..run.train_len];
        plot::plot_residual_diagnostics(&residual_path, best, train_months)?;
        files.push(residual_path);
    } else {
        warn!(model = %best.label, "no residual diagnostics to plot");
    }

    info!(best = %best.label, files = files.len(), "forecast outputs written");
    Ok(ForecastOutcome { run, files })
}

/// Solve the allocation and write the plan and summary
pub fn run_optimisation(config: &AnalysisConfig) -> Result<OptimisationOutcome> {
    let table = SupplyChainTable::from_csv(&config.supply_path, &config.supply_columns)?;
    let plan = ShipmentOptimizer::new().solve(&table)?;
    ensure_output_dir(config)?;

    let plan_path = config.output_path(SHIPMENT_PLAN_FILE);
    plan.write_csv(&plan_path)?;
    let summary_path = config.output_path(OPTIMISATION_SUMMARY_FILE);
    plan.write_summary(&summary_path)?;

    info!(
        total_cost = plan.total_cost(),
        shipments = plan.shipments().len(),
        "optimisation outputs written"
    );
    Ok(OptimisationOutcome {
        plan,
        files: vec![plan_path, summary_path],
    })
}

/// Both runs plus `report.md`.
///
/// An allocation failure is still written into the report before it is
/// returned.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisOutcome> {
    let forecast = run_forecast(config)?;
    let optimisation = run_optimisation(config);
    if let Err(err) = &optimisation {
        warn!(error = %err, "optimisation failed");
    }

    let report_path = config.output_path(REPORT_FILE);
    report::write_report(
        &report_path,
        &forecast.run,
        optimisation.as_ref().map(|o| &o.plan),
    )?;
    info!(path = %report_path.display(), "report written");

    Ok(AnalysisOutcome {
        forecast,
        optimisation: optimisation?,
        report: report_path,
    })
}
