//! Solve the minimum-cost shipment allocation.
//!
//! Usage: `run_optimisation [config.json]`

use retail_insight::{init_logging, pipeline, report_failure, AnalysisConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_logging();

    let outcome =
        AnalysisConfig::from_args().and_then(|config| pipeline::run_optimisation(&config));
    match outcome {
        Ok(outcome) => {
            println!("{}", outcome.plan);
            for file in &outcome.files {
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
