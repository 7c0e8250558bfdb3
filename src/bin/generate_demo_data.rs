//! Write a reproducible synthetic input set.
//!
//! Usage: `generate_demo_data [output_dir]` (default `data/demo`)

use retail_insight::demo::{write_demo_inputs, DemoSettings};
use retail_insight::{init_logging, report_failure};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    init_logging();

    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/demo"));

    match write_demo_inputs(&dir, &DemoSettings::default()) {
        Ok(files) => {
            println!("Wrote {}", files.price.display());
            println!("Wrote {}", files.fuel.display());
            println!("Wrote {}", files.supply.display());
            println!("Wrote {}", files.config.display());
            println!("Run: run_analysis {}", files.config.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}
