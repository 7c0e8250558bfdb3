//! Forecast, optimise and write the combined report.
//!
//! Usage: `run_analysis [config.json]`

use retail_insight::{init_logging, pipeline, report_failure, AnalysisConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_logging();

    let outcome = AnalysisConfig::from_args().and_then(|config| pipeline::run_analysis(&config));
    match outcome {
        Ok(outcome) => {
            println!("{}", outcome.forecast.run.comparison);
            println!("{}", outcome.optimisation.plan.summary());
            let files = outcome
                .forecast
                .files
                .iter()
                .chain(&outcome.optimisation.files)
                .chain(std::iter::once(&outcome.report));
            for file in files {
                println!("Wrote {}", file.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}
