//! Minimum-cost transportation LP

use crate::error::{PlanError, Result};
use crate::plan::{AllocationPlan, Shipment, SolveStatus};
use crate::table::SupplyChainTable;
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use tracing::{debug, info, warn};

/// Builds and solves the shipment LP
///
/// Variables `x[s,w] >= 0` per lane, minimising `sum(cost * x)` subject to
/// `sum_w x[s,w] <= capacity[s]` and `sum_s x[s,w] >= demand[w]`.
#[derive(Debug, Clone)]
pub struct ShipmentOptimizer {
    /// Solved quantities at or below this are dropped from the plan
    tolerance: f64,
}

impl Default for ShipmentOptimizer {
    fn default() -> Self {
        Self { tolerance: 1e-9 }
    }
}

impl ShipmentOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    pub fn solve(&self, table: &SupplyChainTable) -> Result<AllocationPlan> {
        let total_demand = table.total_demand();
        let total_capacity = table.total_capacity();
        info!(
            lanes = table.lanes().len(),
            total_demand, total_capacity, "solving shipment allocation"
        );

        if total_demand > total_capacity {
            warn!(total_demand, total_capacity, "demand exceeds total capacity");
            return Err(PlanError::Infeasible {
                reason: "total demand exceeds total supplier capacity".to_string(),
                total_demand,
                total_capacity,
            });
        }
        let unserved = table.unserved_warehouses();
        if !unserved.is_empty() {
            warn!(warehouses = ?unserved, "warehouses cannot be reached");
            return Err(PlanError::Infeasible {
                reason: format!("no lane with capacity reaches {}", unserved.join(", ")),
                total_demand,
                total_capacity,
            });
        }

        let mut vars = ProblemVariables::new();
        let shipments: Vec<Variable> = table
            .lanes()
            .iter()
            .map(|_| vars.add(variable().min(0.0)))
            .collect();

        let objective: Expression = table
            .lanes()
            .iter()
            .zip(&shipments)
            .map(|(lane, x)| lane.unit_cost * *x)
            .sum();

        let mut model = vars.minimise(objective).using(default_solver);

        for (supplier, capacity) in table.suppliers() {
            let outflow: Expression = table
                .lanes()
                .iter()
                .zip(&shipments)
                .filter(|(lane, _)| lane.supplier == supplier)
                .map(|(_, x)| *x)
                .sum();
            model.add_constraint(constraint!(outflow <= capacity));
        }
        for (warehouse, demand) in table.warehouses() {
            let inflow: Expression = table
                .lanes()
                .iter()
                .zip(&shipments)
                .filter(|(lane, _)| lane.warehouse == warehouse)
                .map(|(_, x)| *x)
                .sum();
            model.add_constraint(constraint!(inflow >= demand));
        }

        let solution = model.solve().map_err(|err| match err {
            ResolutionError::Infeasible => PlanError::Infeasible {
                reason: "solver found no feasible allocation".to_string(),
                total_demand,
                total_capacity,
            },
            ResolutionError::Unbounded => PlanError::Unbounded,
            other => PlanError::Solver(other.to_string()),
        })?;

        let shipped: Vec<Shipment> = table
            .lanes()
            .iter()
            .zip(&shipments)
            .filter_map(|(lane, x)| {
                let quantity = solution.value(*x);
                (quantity > self.tolerance).then(|| Shipment {
                    supplier: lane.supplier.clone(),
                    warehouse: lane.warehouse.clone(),
                    quantity,
                    unit_cost: lane.unit_cost,
                    ship_cost: quantity * lane.unit_cost,
                })
            })
            .collect();
        debug!(shipments = shipped.len(), "extracted positive shipments");

        let plan = AllocationPlan::new(SolveStatus::Optimal, shipped);
        info!(
            status = %plan.status(),
            total_cost = plan.total_cost(),
            total_shipped = plan.total_shipped(),
            "allocation solved"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SupplyRow;
    use approx::assert_relative_eq;

    #[test]
    fn single_lane_ships_demand() {
        let table =
            SupplyChainTable::from_rows(vec![SupplyRow::new("S", "W", 2.0, 10.0, 4.0)]).unwrap();
        let plan = ShipmentOptimizer::new().solve(&table).unwrap();
        assert_eq!(plan.shipments().len(), 1);
        assert_relative_eq!(plan.total_shipped(), 4.0, epsilon = 1e-6);
        assert_relative_eq!(plan.total_cost(), 8.0, epsilon = 1e-6);
    }

    #[test]
    fn prefers_cheaper_lane() {
        let table = SupplyChainTable::from_rows(vec![
            SupplyRow::new("Cheap", "W", 1.0, 100.0, 30.0),
            SupplyRow::new("Dear", "W", 9.0, 100.0, 30.0),
        ])
        .unwrap();
        let plan = ShipmentOptimizer::new().solve(&table).unwrap();
        assert_relative_eq!(plan.shipped_from("Cheap"), 30.0, epsilon = 1e-6);
        assert_relative_eq!(plan.shipped_from("Dear"), 0.0, epsilon = 1e-6);
        assert_relative_eq!(plan.total_cost(), 30.0, epsilon = 1e-6);
    }

    #[test]
    fn unreachable_warehouse_is_infeasible() {
        let table = SupplyChainTable::from_rows(vec![
            SupplyRow::new("S1", "W1", 1.0, 50.0, 5.0),
            SupplyRow::new("S2", "W2", 1.0, 0.0, 5.0),
        ])
        .unwrap();
        let err = ShipmentOptimizer::new().solve(&table).unwrap_err();
        match err {
            PlanError::Infeasible { reason, .. } => assert!(reason.contains("W2")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
