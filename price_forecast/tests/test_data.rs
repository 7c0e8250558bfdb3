use approx::assert_relative_eq;
use chrono::NaiveDate;
use price_forecast::data::{DataLoader, SeriesColumns, TimeSeriesData};
use price_forecast::ForecastError;
use rust_xlsxwriter::{Format, Workbook};
use std::io::Write;
use tempfile::NamedTempFile;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

/// Workbook with a date column and a price column, March 2020 left out.
/// Dates are Excel serials, written with a date format when `date_format` is set.
fn price_workbook(date_format: Option<&str>) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "date").unwrap();
    sheet.write_string(0, 1, "price").unwrap();

    let rows = [(43831.0, 100.0), (43862.0, 102.0), (43922.0, 106.0), (43952.0, 108.0)];
    for (i, (serial, price)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        match date_format {
            Some(pattern) => {
                let format = Format::new().set_num_format(pattern);
                sheet.write_number_with_format(row, 0, *serial, &format).unwrap();
            }
            None => {
                sheet.write_number(row, 0, *serial).unwrap();
            }
        }
        sheet.write_number(row, 1, *price).unwrap();
    }
    workbook.save(dir.path().join("prices.xlsx")).unwrap();
    dir
}

#[test]
fn test_csv_load_is_gap_free() {
    let file = csv_file(&[
        "date,retail_price",
        "2021-01-15,100.0",
        "2021-02-15,102.0",
        "2021-04-15,106.0",
        "2021-03-15,104.0",
        "2021-07-15,110.0",
    ]);

    let series = DataLoader::from_csv(file.path(), &SeriesColumns::default()).unwrap();

    assert_eq!(series.len(), 7);
    assert!(series.is_gap_free());
    assert_eq!(series.first_month(), Some(ymd(2021, 1, 1)));
    assert_eq!(series.last_month(), Some(ymd(2021, 7, 1)));
    assert_eq!(series.interpolated_count(), 2);
    assert_eq!(series.name(), "retail_price");
    assert_relative_eq!(series.values()[4], 106.0 + 4.0 / 3.0, epsilon = 1e-9);
}

#[test]
fn test_fallback_to_first_and_second_column() {
    let file = csv_file(&[
        "when,amount,note",
        "2020-01,5,a",
        "2020-02,6,b",
        "2020-03,7,c",
    ]);
    let series = DataLoader::from_path(file.path(), &SeriesColumns::default()).unwrap();
    assert_eq!(series.values(), &[5.0, 6.0, 7.0]);
    assert_eq!(series.name(), "amount");
}

#[test]
fn test_rows_with_missing_values_are_dropped() {
    let file = csv_file(&["month,price", "2020-01-01,1.0", "2020-02-01,", "2020-03-01,3.0"]);
    let series = DataLoader::from_csv(file.path(), &SeriesColumns::default()).unwrap();
    assert_eq!(series.values(), &[1.0, 2.0, 3.0]);
    assert_eq!(series.interpolated_count(), 1);
}

#[test]
fn test_duplicate_month_is_fatal() {
    let file = csv_file(&["date,price", "2020-01-01,1.0", "2020-01-20,2.0"]);
    let result = DataLoader::from_csv(file.path(), &SeriesColumns::default());
    assert!(matches!(result, Err(ForecastError::DataError(_))));
}

#[test]
fn test_loader_error_handling() {
    assert!(matches!(
        DataLoader::from_csv("nonexistent_file.csv", &SeriesColumns::default()),
        Err(ForecastError::IoError(_))
    ));

    let file = csv_file(&["date,price", "2020-01-01,1.0"]);
    let columns = SeriesColumns::named("date", "fuel");
    assert!(DataLoader::from_csv(file.path(), &columns).is_err());

    let text = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    assert!(matches!(
        DataLoader::from_path(text.path(), &SeriesColumns::default()),
        Err(ForecastError::DataError(_))
    ));

    let bad = csv_file(&["date,price", "yesterday,1.0"]);
    assert!(DataLoader::from_csv(bad.path(), &SeriesColumns::default()).is_err());
}

#[test]
fn test_time_series_data_operations() {
    let data = TimeSeriesData::new("price", ymd(2023, 1, 1), vec![100.0, 103.0, 106.0]).unwrap();

    assert_eq!(data.len(), 3);
    assert!(!data.is_empty());

    let subset = data.slice(1, None).unwrap();
    assert_eq!(subset.len(), 2);
    assert_eq!(subset.first_month(), Some(ymd(2023, 2, 1)));

    let mean = data.mean().unwrap();
    assert!(mean > 102.0 && mean < 104.0);

    let std_dev = data.std_dev().unwrap();
    assert!(std_dev > 2.0 && std_dev < 4.0);

    assert!(TimeSeriesData::new("price", ymd(2023, 1, 1), vec![]).is_err());
    assert!(TimeSeriesData::new("price", ymd(2023, 1, 1), vec![1.0, f64::NAN]).is_err());
}

#[test]
fn test_fuel_alignment_to_price_index() {
    let price = TimeSeriesData::new("price", ymd(2020, 1, 1), vec![1.0; 6]).unwrap();
    let fuel = TimeSeriesData::from_observations(
        "fuel",
        vec![(ymd(2020, 2, 1), 2.0), (ymd(2020, 4, 1), 4.0)],
    )
    .unwrap();

    let aligned = fuel.align_to(price.months()).unwrap();
    assert_eq!(aligned, vec![2.0, 2.0, 3.0, 4.0, 4.0, 4.0]);
}

#[test]
fn test_xlsx_load_with_date_cells() {
    let dir = price_workbook(Some("yyyy-mm-dd"));
    let series =
        DataLoader::from_path(dir.path().join("prices.xlsx"), &SeriesColumns::default()).unwrap();

    assert_eq!(series.len(), 5);
    assert!(series.is_gap_free());
    assert_eq!(series.first_month(), Some(ymd(2020, 1, 1)));
    assert_eq!(series.last_month(), Some(ymd(2020, 5, 1)));
    assert_eq!(series.interpolated_count(), 1);
    assert_eq!(series.name(), "price");
    assert_relative_eq!(series.values()[2], 104.0, epsilon = 1e-9);
}

#[test]
fn test_xlsx_load_with_serial_numbers() {
    let dir = price_workbook(None);
    let series =
        DataLoader::from_path(dir.path().join("prices.xlsx"), &SeriesColumns::default()).unwrap();

    assert_eq!(series.months()[3], ymd(2020, 4, 1));
    assert_eq!(series.values(), &[100.0, 102.0, 104.0, 106.0, 108.0]);
}
