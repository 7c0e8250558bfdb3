//! Solved shipment allocation and its output files

use crate::error::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Solver outcome carried into the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Optimal,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "Optimal"),
        }
    }
}

/// A positive quantity moved along one lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shipment {
    pub supplier: String,
    pub warehouse: String,
    #[serde(rename = "qty")]
    pub quantity: f64,
    pub unit_cost: f64,
    pub ship_cost: f64,
}

/// Minimum-cost allocation, sorted by supplier then warehouse
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    status: SolveStatus,
    shipments: Vec<Shipment>,
    total_cost: f64,
}

impl AllocationPlan {
    pub fn new(status: SolveStatus, mut shipments: Vec<Shipment>) -> Self {
        shipments.sort_by(|a, b| {
            a.supplier
                .cmp(&b.supplier)
                .then_with(|| a.warehouse.cmp(&b.warehouse))
        });
        let total_cost = shipments.iter().map(|s| s.ship_cost).sum();
        Self {
            status,
            shipments,
            total_cost,
        }
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn total_shipped(&self) -> f64 {
        self.shipments.iter().map(|s| s.quantity).sum()
    }

    /// Quantity received by a warehouse
    pub fn shipped_to(&self, warehouse: &str) -> f64 {
        self.shipments
            .iter()
            .filter(|s| s.warehouse == warehouse)
            .map(|s| s.quantity)
            .sum()
    }

    /// Quantity sent by a supplier
    pub fn shipped_from(&self, supplier: &str) -> f64 {
        self.shipments
            .iter()
            .filter(|s| s.supplier == supplier)
            .map(|s| s.quantity)
            .sum()
    }

    /// Two-line status and cost summary
    pub fn summary(&self) -> String {
        format!(
            "Status: {}\nTotal cost: {}",
            self.status,
            format_thousands(self.total_cost, 2)
        )
    }

    /// Write `supplier,warehouse,qty,unit_cost,ship_cost` rows
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        if self.shipments.is_empty() {
            writer.write_record(["supplier", "warehouse", "qty", "unit_cost", "ship_cost"])?;
        }
        for shipment in &self.shipments {
            writer.serialize(shipment)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_summary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, format!("{}\n", self.summary()))?;
        Ok(())
    }
}

impl fmt::Display for AllocationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:<16} {:>12} {:>10} {:>14}",
            "Supplier", "Warehouse", "Qty", "Unit cost", "Ship cost"
        )?;
        for s in &self.shipments {
            writeln!(
                f,
                "{:<16} {:<16} {:>12.2} {:>10.2} {:>14.2}",
                s.supplier, s.warehouse, s.quantity, s.unit_cost, s.ship_cost
            )?;
        }
        write!(f, "{}", self.summary())
    }
}

/// Format with comma thousands separators, e.g. `1234.5` as `1,234.50`
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn shipment(supplier: &str, warehouse: &str, quantity: f64, unit_cost: f64) -> Shipment {
        Shipment {
            supplier: supplier.to_string(),
            warehouse: warehouse.to_string(),
            quantity,
            unit_cost,
            ship_cost: quantity * unit_cost,
        }
    }

    fn plan() -> AllocationPlan {
        AllocationPlan::new(
            SolveStatus::Optimal,
            vec![
                shipment("S2", "W1", 10.0, 5.0),
                shipment("S1", "W2", 20.0, 2.5),
                shipment("S1", "W1", 30.0, 40.0),
            ],
        )
    }

    #[rstest]
    #[case(0.0, "0.00")]
    #[case(999.994, "999.99")]
    #[case(1234.56, "1,234.56")]
    #[case(1234567.891, "1,234,567.89")]
    #[case(-98765.4, "-98,765.40")]
    #[case(-0.001, "0.00")]
    fn thousands_separators(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_thousands(value, 2), expected);
    }

    #[test]
    fn sorted_with_totals() {
        let plan = plan();
        let order: Vec<(&str, &str)> = plan
            .shipments()
            .iter()
            .map(|s| (s.supplier.as_str(), s.warehouse.as_str()))
            .collect();
        assert_eq!(order, vec![("S1", "W1"), ("S1", "W2"), ("S2", "W1")]);
        assert_relative_eq!(plan.total_cost(), 1300.0);
        assert_relative_eq!(plan.total_shipped(), 60.0);
        assert_relative_eq!(plan.shipped_to("W1"), 40.0);
        assert_relative_eq!(plan.shipped_from("S1"), 50.0);
        assert_eq!(plan.summary(), "Status: Optimal\nTotal cost: 1,300.00");
    }

    #[test]
    fn writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("shipment_plan.csv");
        let summary_path = dir.path().join("optimisation_summary.txt");
        let plan = plan();
        plan.write_csv(&csv_path).unwrap();
        plan.write_summary(&summary_path).unwrap();

        let text = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "supplier,warehouse,qty,unit_cost,ship_cost");
        assert_eq!(lines[1], "S1,W1,30.0,40.0,1200.0");
        assert_eq!(lines.len(), 4);
        assert_eq!(
            std::fs::read_to_string(&summary_path).unwrap(),
            "Status: Optimal\nTotal cost: 1,300.00\n"
        );
    }

    #[test]
    fn empty_plan_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        AllocationPlan::new(SolveStatus::Optimal, vec![])
            .write_csv(&path)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim_end(),
            "supplier,warehouse,qty,unit_cost,ship_cost"
        );
    }
}
