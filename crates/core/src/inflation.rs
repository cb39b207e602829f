//! Consumer price index lookups and inflation adjustment.
//!
//! The ABS publishes the CPI quarterly in workbook `640101`. Sheet `Data1`
//! has one column per series and one row per quarter, dated on the first
//! day of the quarter's last month. A lookup for any date uses the most
//! recent quarter on or before it.

use ausdex_common::{DateInput, Location};
use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::files::Downloader;

/// Sheet holding the CPI series
pub const CPI_SHEET: &str = "Data1";

/// One value per quarter, `None` where the cell is blank.
pub type Series = Vec<(NaiveDate, Option<f64>)>;

/// Quarterly table of named numeric columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CpiTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl CpiTable {
    /// Build a table from dates and columns of the same length.
    ///
    /// Rows are sorted by date.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: impl IntoIterator<Item = (String, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let columns: BTreeMap<_, _> = columns.into_iter().collect();
        for values in columns.values() {
            if values.len() != dates.len() {
                return Err(Error::LengthMismatch {
                    expected: dates.len(),
                    actual: values.len(),
                });
            }
        }

        let mut order: Vec<usize> = (0..dates.len()).collect();
        order.sort_by_key(|&i| dates[i]);
        let dates = order.iter().map(|&i| dates[i]).collect();
        let columns = columns
            .into_iter()
            .map(|(name, values)| (name, order.iter().map(|&i| values[i]).collect()))
            .collect();
        Ok(Self { dates, columns })
    }

    /// Read sheet `Data1` of an ABS CPI workbook (`.xls` or `.xlsx`).
    pub fn from_workbook(path: &Path) -> Result<Self> {
        let spreadsheet_error = |reason: String| Error::Spreadsheet {
            path: path.to_path_buf(),
            reason,
        };
        let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
        let range = workbook
            .worksheet_range(CPI_SHEET)
            .map_err(|e| spreadsheet_error(format!("sheet {CPI_SHEET}: {e}")))?;
        let table = Self::from_range(&range).map_err(spreadsheet_error)?;
        info!(
            "Loaded {} quarters of CPI data from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a worksheet laid out like `Data1`.
    ///
    /// The first row holds series titles. Rows whose first cell is not a
    /// date are metadata and are skipped.
    pub fn from_range(range: &Range<Data>) -> std::result::Result<Self, String> {
        let mut rows = range.rows();
        let header = rows.next().ok_or_else(|| "worksheet is empty".to_string())?;
        let titles: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, cell)| match cell {
                Data::String(title) if !title.trim().is_empty() => Some((i, title.clone())),
                _ => None,
            })
            .collect();
        if titles.is_empty() {
            return Err("no series titles in the first row".to_string());
        }

        let mut dates = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); titles.len()];
        let mut skipped = 0usize;
        for row in rows {
            let Some(date) = row.first().and_then(cell_date) else {
                skipped += 1;
                continue;
            };
            dates.push(date);
            for ((i, _), values) in titles.iter().zip(columns.iter_mut()) {
                values.push(row.get(*i).and_then(cell_number));
            }
        }
        debug!(skipped, rows = dates.len(), "parsed CPI worksheet");
        if dates.is_empty() {
            return Err("no dated rows".to_string());
        }

        Self::new(
            dates,
            titles.into_iter().map(|(_, title)| title).zip(columns),
        )
        .map_err(|e| e.to_string())
    }

    /// Quarter dates in ascending order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Names of all columns.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Values of one column, aligned with [`CpiTable::dates`].
    pub fn column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Number of quarters.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        // Serial dates honour the workbook's 1900 or 1904 date system
        Data::DateTime(datetime) => datetime.as_datetime().map(|datetime| datetime.date()),
        Data::DateTimeIso(text) | Data::String(text) => {
            let text = text.trim();
            let day = text.get(..10).unwrap_or(text);
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        }
        _ => None,
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(value) => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Evaluation dates for [`Cpi::calc_inflation_many`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EvaluationDates {
    /// Adjust every value to today
    #[default]
    Today,
    /// Adjust every value to the same date
    Single(DateInput),
    /// One evaluation date per value
    Each(Vec<DateInput>),
}

/// Australian consumer price index data.
#[derive(Debug, Clone, PartialEq)]
pub struct Cpi {
    table: CpiTable,
}

impl Cpi {
    /// Wrap an already loaded table.
    pub fn from_table(table: CpiTable) -> Self {
        Self { table }
    }

    /// Load the CPI from a workbook on disk.
    pub fn from_workbook(path: &Path) -> Result<Self> {
        CpiTable::from_workbook(path).map(Self::from_table)
    }

    /// Load the latest CPI release, downloading it unless it is cached.
    pub async fn latest(downloader: &Downloader) -> Result<Self> {
        let path = downloader.cached_download_cpi(None, None, false).await?;
        Self::from_workbook(&path)
    }

    /// The full quarterly table.
    pub fn table(&self) -> &CpiTable {
        &self.table
    }

    /// Column holding the CPI index for a location.
    pub fn column_name(location: Location) -> String {
        location.index_column()
    }

    /// The CPI per quarter for a location.
    pub fn cpi_series(&self, location: Location) -> Result<Series> {
        let values = self.table.column(&location.index_column())?;
        Ok(self.table.dates.iter().copied().zip(values.iter().copied()).collect())
    }

    /// The quarter's percentage change on the same quarter a year earlier, as a fraction.
    pub fn cpi_change_series(&self, location: Location) -> Result<Series> {
        let values = self.table.column(&location.change_column())?;
        Ok(self
            .table
            .dates
            .iter()
            .copied()
            .zip(values.iter().map(|value| value.map(|v| v / 100.0)))
            .collect())
    }

    /// Index of the last quarter dated on or before `date`.
    fn row_for(&self, date: NaiveDate) -> Option<usize> {
        self.table.dates.partition_point(|row| *row <= date).checked_sub(1)
    }

    fn value_on(&self, date: NaiveDate, values: &[Option<f64>]) -> Option<f64> {
        self.row_for(date).and_then(|row| values[row])
    }

    /// The CPI in effect on a date.
    ///
    /// `None` before the first quarter (September 1948) or where the
    /// quarter has no value. Dates past the last quarter use the last one.
    pub fn cpi_at(&self, date: impl Into<DateInput>, location: Location) -> Result<Option<f64>> {
        let date = date.into().to_date()?;
        let values = self.table.column(&location.index_column())?;
        Ok(self.value_on(date, values))
    }

    /// The CPI in effect on each of several dates.
    pub fn cpi_at_many<I>(&self, dates: I, location: Location) -> Result<Vec<Option<f64>>>
    where
        I: IntoIterator,
        I::Item: Into<DateInput>,
    {
        let values = self.table.column(&location.index_column())?;
        dates
            .into_iter()
            .map(|date| -> Result<Option<f64>> {
                Ok(self.value_on(date.into().to_date()?, values))
            })
            .collect()
    }

    /// Adjust a value for inflation between two dates.
    ///
    /// The evaluation date defaults to today. Returns `None` when either date
    /// has no CPI.
    pub fn calc_inflation(
        &self,
        value: f64,
        original_date: impl Into<DateInput>,
        evaluation_date: Option<DateInput>,
        location: Location,
    ) -> Result<Option<f64>> {
        let evaluation_date = match evaluation_date {
            Some(date) => date.to_date()?,
            None => today(),
        };
        let original_cpi = self.cpi_at(original_date, location)?;
        let evaluation_cpi = self.cpi_at(evaluation_date, location)?;
        Ok(scale(value, original_cpi, evaluation_cpi))
    }

    /// Adjust several values for inflation.
    ///
    /// `values` and `original_dates` must have the same length, as must
    /// [`EvaluationDates::Each`].
    pub fn calc_inflation_many(
        &self,
        values: &[f64],
        original_dates: &[DateInput],
        evaluation_dates: &EvaluationDates,
        location: Location,
    ) -> Result<Vec<Option<f64>>> {
        check_length(values.len(), original_dates.len())?;
        let column = self.table.column(&location.index_column())?;
        let evaluation: Vec<NaiveDate> = match evaluation_dates {
            EvaluationDates::Today => vec![today(); values.len()],
            EvaluationDates::Single(date) => vec![date.to_date()?; values.len()],
            EvaluationDates::Each(dates) => {
                check_length(values.len(), dates.len())?;
                dates
                    .iter()
                    .map(DateInput::to_date)
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        values
            .iter()
            .zip(original_dates)
            .zip(evaluation)
            .map(|((value, original), evaluation)| -> Result<Option<f64>> {
                let original_cpi = self.value_on(original.to_date()?, column);
                let evaluation_cpi = self.value_on(evaluation, column);
                Ok(scale(*value, original_cpi, evaluation_cpi))
            })
            .collect()
    }

    /// What `value` at `compare_date` is worth in each quarter.
    ///
    /// Covers quarters from `start_date` to `end_date` inclusive; a missing
    /// bound leaves that side open.
    pub fn calc_inflation_timeseries(
        &self,
        compare_date: impl Into<DateInput>,
        start_date: Option<DateInput>,
        end_date: Option<DateInput>,
        value: f64,
        location: Location,
    ) -> Result<Series> {
        let compare_cpi = self.cpi_at(compare_date, location)?;
        let series = self.cpi_series(location)?;
        let series = slice_series(series, start_date.as_ref(), end_date.as_ref())?;
        Ok(series
            .into_iter()
            .map(|(date, cpi)| (date, scale(value, cpi, compare_cpi)))
            .collect())
    }
}

/// Keep the points dated within `[start, end]`.
pub fn slice_series(
    series: Series,
    start: Option<&DateInput>,
    end: Option<&DateInput>,
) -> Result<Series> {
    let start = start.map(DateInput::to_date).transpose()?;
    let end = end.map(DateInput::to_date).transpose()?;
    Ok(series
        .into_iter()
        .filter(|(date, _)| start.is_none_or(|start| *date >= start))
        .filter(|(date, _)| end.is_none_or(|end| *date <= end))
        .collect())
}

/// Adjust for inflation using the latest CPI release.
pub async fn calc_inflation(
    downloader: &Downloader,
    value: f64,
    original_date: impl Into<DateInput>,
    evaluation_date: Option<DateInput>,
    location: Location,
) -> Result<Option<f64>> {
    Cpi::latest(downloader)
        .await?
        .calc_inflation(value, original_date, evaluation_date, location)
}

/// The latest CPI table, going back to 1948.
pub async fn latest_cpi_df(downloader: &Downloader) -> Result<CpiTable> {
    Ok(Cpi::latest(downloader).await?.table)
}

fn scale(value: f64, from_cpi: Option<f64>, to_cpi: Option<f64>) -> Option<f64> {
    Some(value * to_cpi? / from_cpi?)
}

fn check_length(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch { expected, actual })
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// A slice of the real CPI series, enough to cover the interesting lookups.
    pub(crate) fn sample_cpi() -> Cpi {
        let rows = [
            ((1948, 9, 1), Some(3.7), None, None),
            ((1948, 12, 1), Some(3.8), None, None),
            ((1970, 9, 1), Some(10.2), None, Some(3.0)),
            ((1990, 9, 1), Some(57.5), None, Some(6.0)),
            ((1990, 12, 1), Some(59.0), None, Some(6.9)),
            ((1991, 3, 1), Some(58.9), Some(60.0), Some(4.9)),
            ((1996, 12, 1), Some(67.0), None, Some(1.5)),
            ((2003, 12, 1), Some(79.5), None, Some(2.4)),
            ((2010, 6, 1), Some(95.8), Some(97.2), Some(3.1)),
            ((2019, 6, 1), Some(114.8), None, Some(1.6)),
            ((2022, 3, 1), Some(123.9), None, Some(5.1)),
        ];
        let dates = rows.iter().map(|((y, m, d), ..)| ymd(*y, *m, *d)).collect();
        let australia = rows.iter().map(|(_, cpi, ..)| *cpi).collect();
        let sydney = rows.iter().map(|(_, _, cpi, _)| *cpi).collect();
        let change = rows.iter().map(|(.., change)| *change).collect();
        let table = CpiTable::new(
            dates,
            [
                (Location::Australia.index_column(), australia),
                (Location::Sydney.index_column(), sydney),
                (Location::Australia.change_column(), change),
            ],
        )
        .unwrap();
        Cpi::from_table(table)
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value should be present");
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_cpi_at_before_records() {
        let cpi = sample_cpi();
        assert_eq!(cpi.cpi_at("1948-08-31", Location::Australia).unwrap(), None);
        assert_eq!(cpi.cpi_at(1900, Location::Australia).unwrap(), None);
    }

    #[test]
    fn test_cpi_at_uses_latest_quarter_on_or_before() {
        let cpi = sample_cpi();
        assert_eq!(cpi.cpi_at("1948-09-01", Location::Australia).unwrap(), Some(3.7));
        assert_eq!(cpi.cpi_at("Feb 3 1997", Location::Australia).unwrap(), Some(67.0));
        assert_eq!(cpi.cpi_at("March 1991", Location::Australia).unwrap(), Some(58.9));
        assert_eq!(cpi.cpi_at(ymd(2030, 1, 1), Location::Australia).unwrap(), Some(123.9));
    }

    #[test]
    fn test_cpi_at_missing_cell() {
        let cpi = sample_cpi();
        assert_eq!(cpi.cpi_at("1992-01-01", Location::Sydney).unwrap(), Some(60.0));
        assert_eq!(cpi.cpi_at("1990-10-01", Location::Sydney).unwrap(), None);
    }

    #[test]
    fn test_cpi_at_many() {
        let cpi = sample_cpi();
        let values = cpi
            .cpi_at_many(["1940-01-01", "1991-03-01", "2020-01-01"], Location::Australia)
            .unwrap();
        assert_eq!(values, vec![None, Some(58.9), Some(114.8)]);
    }

    #[test]
    fn test_missing_location_column() {
        let cpi = sample_cpi();
        let err = cpi.cpi_at("2000-01-01", Location::Darwin).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(name) if name.contains("Darwin")));
    }

    #[test]
    fn test_calc_inflation() {
        let cpi = sample_cpi();
        let value = cpi
            .calc_inflation(
                13.0,
                "March 1991",
                Some("June 2010".into()),
                Location::Australia,
            )
            .unwrap();
        assert_close(value, 21.14);

        let value = cpi
            .calc_inflation(
                1432.0,
                ymd(1990, 9, 1),
                Some(ymd(2003, 12, 1).into()),
                Location::Australia,
            )
            .unwrap();
        assert_close(value, 1979.90);
    }

    #[test]
    fn test_calc_inflation_location() {
        let cpi = sample_cpi();
        let value = cpi
            .calc_inflation(10.0, "March 1991", Some("June 2010".into()), Location::Sydney)
            .unwrap();
        assert_close(value, 16.2);
    }

    #[test]
    fn test_calc_inflation_negative_and_zero() {
        let cpi = sample_cpi();
        let value = cpi
            .calc_inflation(-13.0, "March 1991", Some("June 2010".into()), Location::Australia)
            .unwrap();
        assert_close(value, -21.14);
        let value = cpi
            .calc_inflation(0.0, "March 1991", Some("June 2010".into()), Location::Australia)
            .unwrap();
        assert_eq!(value, Some(0.0));
    }

    #[test]
    fn test_calc_inflation_defaults_to_today() {
        let cpi = sample_cpi();
        let value = cpi
            .calc_inflation(1.0, ymd(2022, 3, 1), None, Location::Australia)
            .unwrap();
        assert_eq!(value, Some(1.0));
    }

    #[test]
    fn test_calc_inflation_before_records() {
        let cpi = sample_cpi();
        let value = cpi
            .calc_inflation(1.0, 1920, Some(2000.into()), Location::Australia)
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_calc_inflation_bad_date() {
        let cpi = sample_cpi();
        let err = cpi
            .calc_inflation(1.0, "not a date", None, Location::Australia)
            .unwrap_err();
        assert!(matches!(err, Error::Date(_)));
    }

    #[test]
    fn test_calc_inflation_many() {
        let cpi = sample_cpi();
        let values = cpi
            .calc_inflation_many(
                &[13.0, 1432.0],
                &["March 1991".into(), ymd(1990, 9, 1).into()],
                &EvaluationDates::Each(vec!["June 2010".into(), "2003-12-01".into()]),
                Location::Australia,
            )
            .unwrap();
        assert_close(values[0], 21.14);
        assert_close(values[1], 1979.90);

        let values = cpi
            .calc_inflation_many(
                &[1.0, 1.0],
                &["1991-03-01".into(), "1800-01-01".into()],
                &EvaluationDates::Single("2010-06-01".into()),
                Location::Australia,
            )
            .unwrap();
        assert_close(values[0], 95.8 / 58.9);
        assert_eq!(values[1], None);
    }

    #[test]
    fn test_calc_inflation_many_length_mismatch() {
        let cpi = sample_cpi();
        let err = cpi
            .calc_inflation_many(
                &[1.0, 2.0],
                &["1991-03-01".into()],
                &EvaluationDates::Today,
                Location::Australia,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_calc_inflation_timeseries_inclusive_bounds() {
        let cpi = sample_cpi();
        let series = cpi
            .calc_inflation_timeseries(
                "2010-06-01",
                Some("1990-09-01".into()),
                Some("2003-12-01".into()),
                2.0,
                Location::Australia,
            )
            .unwrap();
        let dates: Vec<_> = series.iter().map(|(date, _)| *date).collect();
        assert_eq!(
            dates,
            vec![
                ymd(1990, 9, 1),
                ymd(1990, 12, 1),
                ymd(1991, 3, 1),
                ymd(1996, 12, 1),
                ymd(2003, 12, 1)
            ]
        );
        assert_close(series[0].1, 2.0 * 95.8 / 57.5);
        assert_close(series[4].1, 2.0 * 95.8 / 79.5);
    }

    #[test]
    fn test_calc_inflation_timeseries_open_bounds() {
        let cpi = sample_cpi();
        let series = cpi
            .calc_inflation_timeseries("2022-03-01", None, None, 1.0, Location::Australia)
            .unwrap();
        assert_eq!(series.len(), cpi.table().len());
        assert_close(series.last().unwrap().1, 1.0);
    }

    #[test]
    fn test_cpi_change_series_is_fractional() {
        let cpi = sample_cpi();
        let series = cpi.cpi_change_series(Location::Australia).unwrap();
        assert_eq!(series[0].1, None);
        assert_close(series[2].1, 0.03);
    }

    #[test]
    fn test_table_sorts_rows() {
        let table = CpiTable::new(
            vec![ymd(2000, 3, 1), ymd(1999, 12, 1)],
            [("x".to_string(), vec![Some(2.0), Some(1.0)])],
        )
        .unwrap();
        assert_eq!(table.dates(), &[ymd(1999, 12, 1), ymd(2000, 3, 1)]);
        assert_eq!(table.column("x").unwrap(), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_from_range_skips_metadata_rows() {
        let title = Location::Australia.index_column();
        let mut range = Range::new((0, 0), (4, 1));
        range.set_value((0, 1), Data::String(title.clone()));
        range.set_value((1, 0), Data::String("Unit".to_string()));
        range.set_value((1, 1), Data::String("Index Numbers".to_string()));
        range.set_value((2, 0), Data::String("Series ID".to_string()));
        range.set_value((2, 1), Data::String("A2325846C".to_string()));
        range.set_value((3, 0), Data::DateTimeIso("1948-09-01".to_string()));
        range.set_value((3, 1), Data::Float(3.7));
        range.set_value((4, 0), Data::DateTimeIso("1948-12-01T00:00:00".to_string()));
        range.set_value((4, 1), Data::Error(CellErrorType::NA));

        let table = CpiTable::from_range(&range).unwrap();
        assert_eq!(table.dates(), &[ymd(1948, 9, 1), ymd(1948, 12, 1)]);
        assert_eq!(table.column(&title).unwrap(), &[Some(3.7), None]);
    }

    #[test]
    fn test_excel_serial_dates() {
        let serial = |value, is_1904| {
            Data::DateTime(ExcelDateTime::new(value, ExcelDateTimeType::DateTime, is_1904))
        };
        assert_eq!(cell_date(&serial(17777.0, false)), Some(ymd(1948, 9, 1)));
        assert_eq!(cell_date(&serial(44713.5, false)), Some(ymd(2022, 6, 1)));
        // The same days in a workbook using the 1904 date system
        assert_eq!(cell_date(&serial(16315.0, true)), Some(ymd(1948, 9, 1)));
        assert_eq!(cell_date(&serial(43251.5, true)), Some(ymd(2022, 6, 1)));
        assert_eq!(cell_date(&Data::Float(17777.0)), None);
    }

    #[test]
    fn test_from_range_without_titles() {
        let range: Range<Data> = Range::new((0, 0), (1, 1));
        assert!(CpiTable::from_range(&range).is_err());
    }

    #[test]
    fn test_missing_workbook() {
        let err = CpiTable::from_workbook(Path::new("/nonexistent/640101.xlsx")).unwrap_err();
        assert!(matches!(err, Error::Spreadsheet { .. }));
    }
}
