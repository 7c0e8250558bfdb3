//! Error types for the supply_plan crate

use thiserror::Error;

/// Errors raised while reading a supply table or solving the allocation
#[derive(Debug, Error)]
pub enum PlanError {
    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading or writing CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed supply-chain table
    #[error("Data error: {0}")]
    DataError(String),

    /// No allocation satisfies every demand within capacity
    #[error(
        "Infeasible allocation: {reason} (total demand {total_demand}, total capacity {total_capacity})"
    )]
    Infeasible {
        reason: String,
        total_demand: f64,
        total_capacity: f64,
    },

    /// The objective can decrease without limit
    #[error("Allocation problem is unbounded")]
    Unbounded,

    /// Any other solver failure
    #[error("Solver error: {0}")]
    Solver(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PlanError>;
