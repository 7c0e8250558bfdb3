//! # Supply Plan
//!
//! Minimum-cost shipment allocation from a long-form supplier/warehouse table.
//!
//! ```rust,no_run
//! use supply_plan::{ShipmentOptimizer, SupplyChainTable, SupplyColumns};
//!
//! # fn main() -> supply_plan::Result<()> {
//! let table = SupplyChainTable::from_csv("data/supply_chain_data.csv", &SupplyColumns::default())?;
//! let plan = ShipmentOptimizer::new().solve(&table)?;
//! plan.write_csv("outputs/shipment_plan.csv")?;
//! println!("{}", plan.summary());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod optimizer;
pub mod plan;
pub mod table;

pub use crate::error::{PlanError, Result};
pub use crate::optimizer::ShipmentOptimizer;
pub use crate::plan::{AllocationPlan, Shipment, SolveStatus};
pub use crate::table::{Lane, SupplyChainTable, SupplyColumns, SupplyRow};
