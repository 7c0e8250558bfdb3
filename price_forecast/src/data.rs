//! Monthly time series loading and shaping
//!
//! Input files are read into a polars `DataFrame` (CSV directly, workbooks
//! through calamine), the date and value columns are detected, and the rows
//! are shaped into a gap-free series indexed by the first day of each month.

use crate::error::{ForecastError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Optional overrides for the date and value column names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesColumns {
    /// Date column; detected when `None`
    pub date: Option<String>,
    /// Value column; detected when `None`
    pub value: Option<String>,
}

impl SeriesColumns {
    /// Use explicit column names
    pub fn named(date: &str, value: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            value: Some(value.to_string()),
        }
    }
}

/// Gap-free monthly series
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesData {
    /// Series name (usually the value column)
    name: String,
    /// First day of each month, consecutive
    months: Vec<NaiveDate>,
    /// One value per month
    values: Vec<f64>,
    /// Number of months filled by interpolation while loading
    interpolated: usize,
}

/// Data loader for monthly series files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a series, choosing the reader from the file extension
    pub fn from_path<P: AsRef<Path>>(path: P, columns: &SeriesColumns) -> Result<TimeSeriesData> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Self::from_csv(path, columns),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Self::from_xlsx(path, columns),
            other => Err(ForecastError::DataError(format!(
                "Unsupported file type '{}' for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Load a series from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: &SeriesColumns) -> Result<TimeSeriesData> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading csv series");
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df, columns)
    }

    /// Load a series from the first worksheet of a spreadsheet workbook
    pub fn from_xlsx<P: AsRef<Path>>(path: P, columns: &SeriesColumns) -> Result<TimeSeriesData> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading workbook series");
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range_at(0).ok_or_else(|| {
            ForecastError::SpreadsheetError(format!("{} has no worksheets", path.display()))
        })??;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| {
                ForecastError::DataError(format!("{} has an empty first worksheet", path.display()))
            })?
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("column_{}", i),
                other => other.to_string(),
            })
            .collect();
        let body: Vec<&[Data]> = rows.collect();

        let series: Vec<Series> = header
            .iter()
            .enumerate()
            .map(|(i, name)| worksheet_column(name, body.iter().map(|row| row.get(i))))
            .collect();

        Self::from_dataframe(DataFrame::new(series)?, columns)
    }

    /// Create a series from an existing DataFrame
    pub fn from_dataframe(df: DataFrame, columns: &SeriesColumns) -> Result<TimeSeriesData> {
        if df.width() < 2 {
            return Err(ForecastError::DataError(format!(
                "Expected at least a date and a value column, found {} column(s)",
                df.width()
            )));
        }

        let date_column = Self::detect_date_column(&df, columns)?;
        let value_column = Self::detect_value_column(&df, columns, &date_column)?;
        debug!(%date_column, %value_column, rows = df.height(), "detected series columns");

        let months = column_as_months(&df, &date_column)?;
        let values = column_as_f64(&df, &value_column)?;

        let observations: Vec<(NaiveDate, f64)> = months
            .into_iter()
            .zip(values)
            .filter_map(|(month, value)| match (month, value) {
                (Some(m), Some(v)) if v.is_finite() => Some((m, v)),
                _ => None,
            })
            .collect();

        TimeSeriesData::from_observations(&value_column, observations)
    }

    /// Find the date column: configured name, then a date-like name, then the first column
    fn detect_date_column(df: &DataFrame, columns: &SeriesColumns) -> Result<String> {
        let column_names = df.get_column_names();

        if let Some(name) = &columns.date {
            return if column_names.iter().any(|c| c == name) {
                Ok(name.clone())
            } else {
                Err(ForecastError::DataError(format!(
                    "Date column '{}' not found; available: {}",
                    name,
                    column_names.join(", ")
                )))
            };
        }

        for name in &column_names {
            let lower = name.to_lowercase();
            if lower == "ds" || lower.contains("date") || lower.contains("month") || lower.contains("time") {
                return Ok(name.to_string());
            }
        }

        Ok(column_names[0].to_string())
    }

    /// Find the value column: configured name, then a price-like name, then the first other column
    fn detect_value_column(
        df: &DataFrame,
        columns: &SeriesColumns,
        date_column: &str,
    ) -> Result<String> {
        let column_names = df.get_column_names();

        if let Some(name) = &columns.value {
            return if column_names.iter().any(|c| c == name) {
                Ok(name.clone())
            } else {
                Err(ForecastError::DataError(format!(
                    "Value column '{}' not found; available: {}",
                    name,
                    column_names.join(", ")
                )))
            };
        }

        let candidates: Vec<&str> = column_names
            .iter()
            .copied()
            .filter(|name| *name != date_column)
            .collect();

        for name in &candidates {
            let lower = name.to_lowercase();
            if lower == "y" || lower.contains("price") || lower.contains("value") {
                return Ok(name.to_string());
            }
        }

        candidates
            .first()
            .map(|name| name.to_string())
            .ok_or_else(|| ForecastError::DataError("No value column found in data".to_string()))
    }
}

/// Build a polars column from worksheet cells: numeric when every cell is a
/// number, otherwise text with dates rendered as ISO strings.
fn worksheet_column<'a>(name: &str, cells: impl Iterator<Item = Option<&'a Data>>) -> Series {
    let cells: Vec<Option<&Data>> = cells.collect();
    let numeric = cells.iter().all(|cell| {
        matches!(
            cell,
            None | Some(Data::Empty) | Some(Data::Int(_)) | Some(Data::Float(_))
        )
    });

    if numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(v)) => Some(*v as f64),
                Some(Data::Float(v)) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name, values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| match cell {
            None | Some(Data::Empty) | Some(Data::Error(_)) => None,
            Some(Data::DateTime(dt)) => dt.as_datetime().map(|d| d.date().to_string()),
            Some(Data::DateTimeIso(s)) => Some(s.clone()),
            Some(Data::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        })
        .collect();
    Series::new(name, values)
}

/// Read a column as months, whatever its storage type
fn column_as_months(df: &DataFrame, column_name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let col = df.column(column_name)?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| ForecastError::DataError("Invalid epoch".to_string()))?;

    match col.dtype() {
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .map(|cell| cell.map(parse_month).transpose())
            .collect(),
        DataType::Date => {
            let days = col.cast(&DataType::Int32)?;
            Ok(days
                .i32()?
                .into_iter()
                .map(|d| d.and_then(|d| epoch.checked_add_signed(chrono::Duration::days(d as i64))))
                .collect())
        }
        DataType::Datetime(unit, _) => {
            let per_second: i64 = match unit {
                TimeUnit::Nanoseconds => 1_000_000_000,
                TimeUnit::Microseconds => 1_000_000,
                TimeUnit::Milliseconds => 1_000,
            };
            let ticks = col.cast(&DataType::Int64)?;
            Ok(ticks
                .i64()?
                .into_iter()
                .map(|t| {
                    t.and_then(|t| DateTime::from_timestamp(t.div_euclid(per_second), 0))
                        .map(|dt| dt.date_naive())
                })
                .collect())
        }
        dtype if dtype.is_numeric() => {
            let serials = col.cast(&DataType::Float64)?;
            serials
                .f64()?
                .into_iter()
                .map(|v| v.map(spreadsheet_serial_to_date).transpose())
                .collect()
        }
        other => Err(ForecastError::DataError(format!(
            "Column '{}' of type {} cannot be read as dates",
            column_name, other
        ))),
    }
}

/// Read a column as f64 values, nulls preserved
fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<Option<f64>>> {
    let col = df.column(column_name)?;

    match col.dtype() {
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .map(|cell| match cell.map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => text
                    .replace(',', "")
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|e| {
                        ForecastError::ParseError(format!(
                            "Column '{}' value '{}': {}",
                            column_name, text, e
                        ))
                    }),
            })
            .collect(),
        dtype if dtype.is_numeric() => {
            let cast = col.cast(&DataType::Float64)?;
            let values = cast.f64()?.into_iter().collect();
            Ok(values)
        }
        other => Err(ForecastError::DataError(format!(
            "Column '{}' of type {} cannot be converted to f64",
            column_name, other
        ))),
    }
}

/// Parse a date cell and normalise it to the first of its month
pub fn parse_month(text: &str) -> Result<NaiveDate> {
    let text = text.trim();

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(month_start(date));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(month_start(datetime.date()));
        }
    }
    for format in ["%Y-%m-%d", "%d %b %Y", "%d %B %Y"] {
        let padded = if format == "%Y-%m-%d" {
            format!("{}-01", text)
        } else {
            format!("01 {}", text)
        };
        if let Ok(date) = NaiveDate::parse_from_str(&padded, format) {
            return Ok(date);
        }
    }

    Err(ForecastError::ParseError(format!(
        "Unrecognised date '{}'",
        text
    )))
}

/// Convert a spreadsheet serial day number (1900 date system) to a month
fn spreadsheet_serial_to_date(serial: f64) -> Result<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)
        .ok_or_else(|| ForecastError::DataError("Invalid spreadsheet epoch".to_string()))?;
    if !(1.0..=2_958_465.0).contains(&serial) {
        return Err(ForecastError::ParseError(format!(
            "Value {} is not a spreadsheet date",
            serial
        )));
    }
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
        .map(month_start)
        .ok_or_else(|| ForecastError::ParseError(format!("Date serial {} out of range", serial)))
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whole months from `from` to `to` (negative when `to` is earlier)
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64 - from.month() as i64
}

/// `count` consecutive months following `last`
pub fn months_after(last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (1..=count as u32)
        .filter_map(|i| month_start(last).checked_add_months(Months::new(i)))
        .collect()
}

/// Fill `None` runs that sit between two known values by linear interpolation.
///
/// Returns the number of cells filled; leading and trailing runs are left alone.
fn interpolate_interior(values: &mut [Option<f64>]) -> usize {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    let mut filled = 0;
    for pair in known.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if right - left < 2 {
            continue;
        }
        let (Some(a), Some(b)) = (values[left], values[right]) else {
            continue;
        };
        let span = (right - left) as f64;
        for i in left + 1..right {
            let weight = (i - left) as f64 / span;
            values[i] = Some(a + weight * (b - a));
            filled += 1;
        }
    }
    filled
}

impl TimeSeriesData {
    /// Build a series from `(date, value)` observations.
    ///
    /// Dates are normalised to month starts and sorted. A month that appears
    /// twice is rejected; months missing between the first and last
    /// observation are linearly interpolated.
    pub fn from_observations(name: &str, observations: Vec<(NaiveDate, f64)>) -> Result<Self> {
        let mut observations: Vec<(NaiveDate, f64)> = observations
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(d, v)| (month_start(d), v))
            .collect();
        observations.sort_by_key(|(d, _)| *d);

        if observations.is_empty() {
            return Err(ForecastError::DataError(format!(
                "Series '{}' has no usable observations",
                name
            )));
        }
        if let Some(pair) = observations.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ForecastError::DataError(format!(
                "Series '{}' has more than one value for {}",
                name,
                pair[0].0.format("%Y-%m")
            )));
        }

        let first = observations[0].0;
        let last = observations[observations.len() - 1].0;
        let span = months_between(first, last) as usize + 1;

        let mut slots: Vec<Option<f64>> = vec![None; span];
        for (date, value) in &observations {
            slots[months_between(first, *date) as usize] = Some(*value);
        }

        let interpolated = interpolate_interior(&mut slots);
        if interpolated > 0 {
            warn!(series = name, months = interpolated, "filled missing months by interpolation");
        }

        let mut months = Vec::with_capacity(span);
        months.push(first);
        months.extend(months_after(first, span - 1));

        let values = slots
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| ForecastError::DataError("Interpolation left a gap".to_string()))
            })
            .collect::<Result<Vec<f64>>>()?;

        info!(
            series = name,
            start = %first.format("%Y-%m"),
            end = %last.format("%Y-%m"),
            observations = values.len(),
            "loaded monthly series"
        );

        Ok(Self {
            name: name.to_string(),
            months,
            values,
            interpolated,
        })
    }

    /// Create a series from consecutive monthly values starting at `start`
    pub fn new(name: &str, start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::DataError(format!(
                "Series '{}' has no values",
                name
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Series '{}' has a non-finite value at position {}",
                name, i
            )));
        }

        let first = month_start(start);
        let mut months = Vec::with_capacity(values.len());
        months.push(first);
        months.extend(months_after(first, values.len() - 1));

        Ok(Self {
            name: name.to_string(),
            months,
            values,
            interpolated: 0,
        })
    }

    /// Series name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Month index
    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    /// Observed values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of months that were interpolated at load time
    pub fn interpolated_count(&self) -> usize {
        self.interpolated
    }

    /// First month
    pub fn first_month(&self) -> Option<NaiveDate> {
        self.months.first().copied()
    }

    /// Last month
    pub fn last_month(&self) -> Option<NaiveDate> {
        self.months.last().copied()
    }

    /// `count` months following the last observation
    pub fn future_months(&self, count: usize) -> Vec<NaiveDate> {
        self.last_month()
            .map(|last| months_after(last, count))
            .unwrap_or_default()
    }

    /// True when every month follows its predecessor by exactly one month
    pub fn is_gap_free(&self) -> bool {
        self.months
            .windows(2)
            .all(|w| months_between(w[0], w[1]) == 1)
    }

    /// Get a slice of the data from start to end index
    pub fn slice(&self, start: usize, end: Option<usize>) -> Result<Self> {
        let end = end.unwrap_or(self.values.len());
        if start >= end || end > self.values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Invalid slice {}..{} of a series with {} months",
                start,
                end,
                self.values.len()
            )));
        }

        Ok(Self {
            name: self.name.clone(),
            months: self.months[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            interpolated: 0,
        })
    }

    /// Split into training data and the last `horizon` months
    pub fn split_holdout(&self, horizon: usize) -> Result<(Self, Self)> {
        if horizon == 0 || horizon >= self.len() {
            return Err(ForecastError::ValidationError(format!(
                "Cannot hold out {} of {} months",
                horizon,
                self.len()
            )));
        }
        let cut = self.len() - horizon;
        Ok((self.slice(0, Some(cut))?, self.slice(cut, None)?))
    }

    /// Re-index this series onto `months`.
    ///
    /// Interior gaps are interpolated; months after the last observation carry
    /// the last value forward and months before the first carry it backwards.
    pub fn align_to(&self, months: &[NaiveDate]) -> Result<Vec<f64>> {
        let first = self
            .first_month()
            .ok_or_else(|| ForecastError::DataError(format!("Series '{}' is empty", self.name)))?;

        let mut slots: Vec<Option<f64>> = months
            .iter()
            .map(|m| {
                let idx = months_between(first, month_start(*m));
                usize::try_from(idx)
                    .ok()
                    .and_then(|i| self.values.get(i).copied())
            })
            .collect();

        let first_known = slots.iter().position(Option::is_some).ok_or_else(|| {
            ForecastError::DataError(format!(
                "Series '{}' does not overlap the requested months",
                self.name
            ))
        })?;
        let last_known = slots.iter().rposition(Option::is_some).unwrap_or(first_known);

        interpolate_interior(&mut slots);

        let leading = first_known;
        let trailing = slots.len() - 1 - last_known;
        if leading > 0 || trailing > 0 {
            warn!(
                series = %self.name,
                leading,
                trailing,
                "regressor does not cover every month; edge values carried over"
            );
        }

        let head = slots[first_known];
        let tail = slots[last_known];
        Ok(slots
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(v) => *v,
                None if i < first_known => head.unwrap_or(f64::NAN),
                None => tail.unwrap_or(f64::NAN),
            })
            .collect())
    }

    /// Check if the time series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the length of the time series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Calculate the mean of the values
    pub fn mean(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(ForecastError::DataError("No values available".to_string()));
        }
        Ok(ts_math::stats::mean(&self.values))
    }

    /// Calculate the standard deviation of the values
    pub fn std_dev(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(ForecastError::DataError("No values available".to_string()));
        }
        Ok(ts_math::stats::std_dev(&self.values))
    }
}
