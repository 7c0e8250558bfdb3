use approx::assert_relative_eq;
use rstest::rstest;
use std::io::Write;
use supply_plan::{PlanError, ShipmentOptimizer, SupplyChainTable, SupplyColumns, SupplyRow};

fn write_table(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const BALANCED: &str = "\
supplier,warehouse,cost,capacity,demand
Alpha,North,4.0,120,60
Alpha,South,6.0,120,40
Alpha,East,9.0,120,30
Beta,North,5.0,90,60
Beta,South,3.0,90,40
Beta,East,4.0,90,30
Gamma,North,8.0,40,60
Gamma,East,2.0,40,30
";

#[test]
fn feasible_plan_ships_total_demand() {
    let file = write_table(BALANCED);
    let table = SupplyChainTable::from_csv(file.path(), &SupplyColumns::default()).unwrap();
    let plan = ShipmentOptimizer::new().solve(&table).unwrap();

    assert_relative_eq!(plan.total_shipped(), table.total_demand(), epsilon = 1e-6);
    for (warehouse, demand) in table.warehouses() {
        assert_relative_eq!(plan.shipped_to(warehouse), demand, epsilon = 1e-6);
    }
    for (supplier, capacity) in table.suppliers() {
        assert!(plan.shipped_from(supplier) <= capacity + 1e-6);
    }
    // Alpha->North 60, Beta->South 40, Gamma->East 30
    assert_relative_eq!(plan.total_cost(), 240.0 + 120.0 + 60.0, epsilon = 1e-6);
    assert!(plan.shipments().iter().all(|s| s.quantity > 0.0));
}

#[rstest]
#[case(vec![SupplyRow::new("S1", "W1", 1.0, 10.0, 25.0)])]
#[case(vec![
    SupplyRow::new("S1", "W1", 1.0, 10.0, 8.0),
    SupplyRow::new("S2", "W2", 2.0, 5.0, 8.0),
])]
fn demand_above_capacity_is_infeasible(#[case] rows: Vec<SupplyRow>) {
    let table = SupplyChainTable::from_rows(rows).unwrap();
    let expected_demand = table.total_demand();
    let expected_capacity = table.total_capacity();

    match ShipmentOptimizer::new().solve(&table) {
        Err(PlanError::Infeasible {
            total_demand,
            total_capacity,
            ..
        }) => {
            assert_relative_eq!(total_demand, expected_demand);
            assert_relative_eq!(total_capacity, expected_capacity);
            assert!(total_demand > total_capacity);
        }
        other => panic!("expected infeasibility, got {other:?}"),
    }
}

#[test]
fn lane_shortfall_is_reported_by_the_solver() {
    // Totals fit and every warehouse has a lane, but W2 can only get 5 of 50.
    let table = SupplyChainTable::from_rows(vec![
        SupplyRow::new("S1", "W1", 1.0, 100.0, 10.0),
        SupplyRow::new("S2", "W2", 1.0, 5.0, 50.0),
    ])
    .unwrap();
    assert!(table.total_demand() <= table.total_capacity());
    assert!(table.unserved_warehouses().is_empty());

    match ShipmentOptimizer::new().solve(&table) {
        Err(PlanError::Infeasible {
            reason,
            total_demand,
            total_capacity,
        }) => {
            assert!(reason.contains("solver"), "unexpected reason: {reason}");
            assert_relative_eq!(total_demand, 60.0);
            assert_relative_eq!(total_capacity, 105.0);
        }
        other => panic!("expected infeasibility, got {other:?}"),
    }
}

#[test]
fn capacity_routes_around_shared_warehouse() {
    // Totals balance exactly; S2 only reaches W1, so S1 must serve W2.
    let table = SupplyChainTable::from_rows(vec![
        SupplyRow::new("S1", "W1", 1.0, 10.0, 10.0),
        SupplyRow::new("S1", "W2", 1.0, 10.0, 10.0),
        SupplyRow::new("S2", "W1", 1.0, 10.0, 10.0),
    ])
    .unwrap();
    assert_relative_eq!(table.total_demand(), table.total_capacity());
    let plan = ShipmentOptimizer::new().solve(&table).unwrap();
    assert_relative_eq!(plan.total_shipped(), 20.0, epsilon = 1e-6);
    assert_relative_eq!(plan.shipped_to("W2"), 10.0, epsilon = 1e-6);
}

#[test]
fn repeated_solves_agree() {
    let file = write_table(BALANCED);
    let table = SupplyChainTable::from_csv(file.path(), &SupplyColumns::default()).unwrap();
    let first = ShipmentOptimizer::new().solve(&table).unwrap();
    let second = ShipmentOptimizer::new().solve(&table).unwrap();
    assert_eq!(first.shipments(), second.shipments());
}

#[test]
fn missing_file_is_io_error() {
    let result = SupplyChainTable::from_csv("no/such/file.csv", &SupplyColumns::default());
    assert!(matches!(result, Err(PlanError::Io(_))));
}
