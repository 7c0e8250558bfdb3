//! Fit and compare the candidate models, then forecast with the best one.
//!
//! Usage: `run_forecast [config.json]`

use retail_insight::{init_logging, pipeline, report_failure, AnalysisConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_logging();

    let outcome = AnalysisConfig::from_args().and_then(|config| pipeline::run_forecast(&config));
    match outcome {
        Ok(outcome) => {
            println!("{}", outcome.run.comparison);
            if let Some(best) = &outcome.run.best {
                println!("Best model: {}", best.label);
            }
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
