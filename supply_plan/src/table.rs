//! Long-form supplier/warehouse lane table

use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Column names of the supply-chain CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyColumns {
    pub supplier: String,
    pub warehouse: String,
    pub cost: String,
    pub capacity: String,
    pub demand: String,
}

impl Default for SupplyColumns {
    fn default() -> Self {
        Self {
            supplier: "supplier".to_string(),
            warehouse: "warehouse".to_string(),
            cost: "cost".to_string(),
            capacity: "capacity".to_string(),
            demand: "demand".to_string(),
        }
    }
}

/// A shipping route from one supplier to one warehouse
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub supplier: String,
    pub warehouse: String,
    pub unit_cost: f64,
}

/// One row of the input table
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyRow {
    pub supplier: String,
    pub warehouse: String,
    pub cost: f64,
    pub capacity: f64,
    pub demand: f64,
}

impl SupplyRow {
    pub fn new(supplier: &str, warehouse: &str, cost: f64, capacity: f64, demand: f64) -> Self {
        Self {
            supplier: supplier.to_string(),
            warehouse: warehouse.to_string(),
            cost,
            capacity,
            demand,
        }
    }
}

/// Lanes with per-supplier capacity and per-warehouse demand.
///
/// A supplier's capacity is the largest capacity on any of its rows, and a
/// warehouse's demand the largest demand on any of its rows.
#[derive(Debug, Clone)]
pub struct SupplyChainTable {
    lanes: Vec<Lane>,
    capacities: BTreeMap<String, f64>,
    demands: BTreeMap<String, f64>,
}

struct ColumnIndex {
    supplier: usize,
    warehouse: usize,
    cost: usize,
    capacity: usize,
    demand: usize,
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            PlanError::DataError(format!(
                "Column '{}' not found; available columns: {}",
                name,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
}

fn parse_number(field: Option<&str>, column: &str, line: usize) -> Result<f64> {
    let text = field.map(str::trim).unwrap_or("");
    let value: f64 = text.parse().map_err(|_| {
        PlanError::DataError(format!(
            "Row {line}: cannot parse '{text}' in column '{column}' as a number"
        ))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(PlanError::DataError(format!(
            "Row {line}: column '{column}' must be a finite non-negative number, got {value}"
        )));
    }
    Ok(value)
}

fn parse_name(field: Option<&str>, column: &str, line: usize) -> Result<String> {
    let name = field.map(str::trim).unwrap_or("");
    if name.is_empty() {
        return Err(PlanError::DataError(format!(
            "Row {line}: column '{column}' is blank"
        )));
    }
    Ok(name.to_string())
}

impl SupplyChainTable {
    /// Read a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: &SupplyColumns) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file, columns)?;
        info!(
            path = %path.display(),
            lanes = table.lanes.len(),
            suppliers = table.capacities.len(),
            warehouses = table.demands.len(),
            "loaded supply-chain table"
        );
        Ok(table)
    }

    /// Read CSV text from any reader
    pub fn from_reader<R: Read>(reader: R, columns: &SupplyColumns) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let index = ColumnIndex {
            supplier: find_column(&headers, &columns.supplier)?,
            warehouse: find_column(&headers, &columns.warehouse)?,
            cost: find_column(&headers, &columns.cost)?,
            capacity: find_column(&headers, &columns.capacity)?,
            demand: find_column(&headers, &columns.demand)?,
        };

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let line = i + 2;
            rows.push(SupplyRow {
                supplier: parse_name(record.get(index.supplier), &columns.supplier, line)?,
                warehouse: parse_name(record.get(index.warehouse), &columns.warehouse, line)?,
                cost: parse_number(record.get(index.cost), &columns.cost, line)?,
                capacity: parse_number(record.get(index.capacity), &columns.capacity, line)?,
                demand: parse_number(record.get(index.demand), &columns.demand, line)?,
            });
        }
        Self::from_rows(rows)
    }

    /// Build from already-parsed rows
    pub fn from_rows(rows: Vec<SupplyRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(PlanError::DataError(
                "Supply-chain table has no rows".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        let mut lanes = Vec::with_capacity(rows.len());
        let mut capacities: BTreeMap<String, f64> = BTreeMap::new();
        let mut demands: BTreeMap<String, f64> = BTreeMap::new();

        for row in rows {
            if row.supplier.trim().is_empty() || row.warehouse.trim().is_empty() {
                return Err(PlanError::DataError(
                    "Supplier and warehouse names must not be blank".to_string(),
                ));
            }
            for (column, value) in [
                ("cost", row.cost),
                ("capacity", row.capacity),
                ("demand", row.demand),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(PlanError::DataError(format!(
                        "Lane {} -> {}: {column} must be a finite non-negative number, got {value}",
                        row.supplier, row.warehouse
                    )));
                }
            }
            if !seen.insert((row.supplier.clone(), row.warehouse.clone())) {
                return Err(PlanError::DataError(format!(
                    "Duplicate lane {} -> {}",
                    row.supplier, row.warehouse
                )));
            }

            let capacity = capacities.entry(row.supplier.clone()).or_insert(0.0);
            *capacity = capacity.max(row.capacity);
            let demand = demands.entry(row.warehouse.clone()).or_insert(0.0);
            *demand = demand.max(row.demand);

            lanes.push(Lane {
                supplier: row.supplier,
                warehouse: row.warehouse,
                unit_cost: row.cost,
            });
        }

        lanes.sort_by(|a, b| {
            a.supplier
                .cmp(&b.supplier)
                .then_with(|| a.warehouse.cmp(&b.warehouse))
        });
        debug!(lanes = lanes.len(), "built supply-chain table");

        Ok(Self {
            lanes,
            capacities,
            demands,
        })
    }

    /// Lanes sorted by supplier, then warehouse
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn suppliers(&self) -> impl Iterator<Item = (&str, f64)> {
        self.capacities.iter().map(|(s, c)| (s.as_str(), *c))
    }

    pub fn warehouses(&self) -> impl Iterator<Item = (&str, f64)> {
        self.demands.iter().map(|(w, d)| (w.as_str(), *d))
    }

    pub fn capacity(&self, supplier: &str) -> Option<f64> {
        self.capacities.get(supplier).copied()
    }

    pub fn demand(&self, warehouse: &str) -> Option<f64> {
        self.demands.get(warehouse).copied()
    }

    pub fn total_capacity(&self) -> f64 {
        self.capacities.values().sum()
    }

    pub fn total_demand(&self) -> f64 {
        self.demands.values().sum()
    }

    /// Warehouses with positive demand whose suppliers have no capacity
    pub fn unserved_warehouses(&self) -> Vec<&str> {
        self.demands
            .iter()
            .filter(|(_, demand)| **demand > 0.0)
            .filter(|(warehouse, _)| {
                !self.lanes.iter().any(|lane| {
                    &lane.warehouse == *warehouse
                        && self.capacity(&lane.supplier).unwrap_or(0.0) > 0.0
                })
            })
            .map(|(warehouse, _)| warehouse.as_str())
            .collect()
    }
}
