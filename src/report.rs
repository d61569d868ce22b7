//! Output table: percentile bands aligned to business days and merged with
//! the historical closes.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::Result;
use crate::models::percentiles::PercentileTable;
use crate::models::series::HistoricalSeries;

/// Column order of every [`OutputTable`].
pub const COLUMNS: [&str; 4] = ["5th Percentile", "Median", "95th Percentile", "Close"];

fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `count` consecutive weekdays starting at `anchor`, or at the next Monday
/// when `anchor` falls on a weekend.
pub fn business_days(anchor: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut date = anchor;
    while days.len() < count {
        if is_business_day(date) {
            days.push(date);
        }
        date += Duration::days(1);
    }
    days
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "5th Percentile")]
    pub p5: Option<f64>,
    #[serde(rename = "Median")]
    pub median: Option<f64>,
    #[serde(rename = "95th Percentile")]
    pub p95: Option<f64>,
    #[serde(rename = "Close")]
    pub close: Option<f64>,
}

impl OutputRow {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            p5: None,
            median: None,
            p95: None,
            close: None,
        }
    }

    /// Cells in [`COLUMNS`] order.
    pub fn values(&self) -> [Option<f64>; 4] {
        [self.p5, self.median, self.p95, self.close]
    }
}

/// Date-indexed union of the history and the simulated bands.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    rows: Vec<OutputRow>,
}

impl OutputTable {
    pub fn columns(&self) -> [&'static str; 4] {
        COLUMNS
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_for(&self, date: NaiveDate) -> Option<&OutputRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// CSV with a `Date` column followed by [`COLUMNS`]; missing cells are
    /// left blank.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(io::BufWriter::new(file))
    }
}

impl fmt::Display for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<12}", "Date")?;
        for column in COLUMNS {
            write!(f, "{column:>17}")?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "{:<12}", row.date.to_string())?;
            for value in row.values() {
                match value {
                    Some(v) => write!(f, "{v:>17.4}")?,
                    None => write!(f, "{:>17}", "")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Lay the percentile table onto business days from `anchor` and outer-merge
/// it with the full historical close series.
pub fn assemble(
    percentiles: &PercentileTable,
    history: &HistoricalSeries,
    anchor: NaiveDate,
) -> OutputTable {
    let mut merged: BTreeMap<NaiveDate, OutputRow> = BTreeMap::new();

    for point in history.points() {
        merged
            .entry(point.date)
            .or_insert_with(|| OutputRow::empty(point.date))
            .close = Some(point.price);
    }

    let dates = business_days(anchor, percentiles.len());
    for (date, band) in dates.into_iter().zip(percentiles.rows()) {
        let row = merged.entry(date).or_insert_with(|| OutputRow::empty(date));
        row.p5 = Some(band.p5);
        row.median = Some(band.median);
        row.p95 = Some(band.p95);
    }

    OutputTable {
        rows: merged.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::brownian::simulate_paths;
    use crate::models::percentiles::reduce_percentiles;
    use crate::models::returns::ModelParameters;
    use crate::models::series::PricePoint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(start: f64, steps: usize) -> PercentileTable {
        let params = ModelParameters {
            drift: 0.1,
            volatility: 0.25,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let ensemble = simulate_paths(start, &params, 1.0, steps, 50, &mut rng).unwrap();
        reduce_percentiles(&ensemble)
    }

    #[test]
    fn test_business_days_skip_weekends() {
        // 2024-01-05 is a Friday.
        let days = business_days(date(2024, 1, 5), 4);
        assert_eq!(
            days,
            vec![date(2024, 1, 5), date(2024, 1, 8), date(2024, 1, 9), date(2024, 1, 10)]
        );
    }

    #[test]
    fn test_business_days_roll_weekend_anchor_forward() {
        let days = business_days(date(2024, 1, 6), 2);
        assert_eq!(days, vec![date(2024, 1, 8), date(2024, 1, 9)]);
        assert!(business_days(date(2024, 1, 6), 0).is_empty());
    }

    #[test]
    fn test_assemble_anchors_and_merges() {
        let history = HistoricalSeries::new(vec![
            PricePoint::new(date(2024, 1, 3), 98.0),
            PricePoint::new(date(2024, 1, 4), 99.0),
            PricePoint::new(date(2024, 1, 5), 100.0),
            PricePoint::new(date(2024, 1, 8), 101.0),
        ])
        .unwrap();
        let bands = table(100.0, 5);
        let output = assemble(&bands, &history, date(2024, 1, 5));

        assert_eq!(output.columns(), COLUMNS);
        // 4 historical dates plus 3 simulated dates past 2024-01-08.
        assert_eq!(output.len(), 7);

        let anchor = output.row_for(date(2024, 1, 5)).unwrap();
        assert_eq!(anchor.p5, Some(100.0));
        assert_eq!(anchor.median, Some(100.0));
        assert_eq!(anchor.p95, Some(100.0));
        assert_eq!(anchor.close, Some(100.0));

        let before = output.row_for(date(2024, 1, 3)).unwrap();
        assert_eq!(before.median, None);

        let after = output.row_for(date(2024, 1, 11)).unwrap();
        assert!(after.close.is_none());
        assert_eq!(after.median, Some(bands.rows()[4].median));

        assert!(output.rows().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_csv_layout() {
        let history = HistoricalSeries::new(vec![
            PricePoint::new(date(2024, 1, 4), 9.5),
            PricePoint::new(date(2024, 1, 5), 10.0),
        ])
        .unwrap();
        let output = assemble(&table(10.0, 2), &history, date(2024, 1, 5));

        let mut buf = Vec::new();
        output.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("Date,5th Percentile,Median,95th Percentile,Close")
        );
        assert_eq!(lines.next(), Some("2024-01-04,,,,9.5"));
        assert_eq!(lines.next(), Some("2024-01-05,10.0,10.0,10.0,10.0"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_display_has_header() {
        let history = HistoricalSeries::new(vec![PricePoint::new(date(2024, 1, 5), 10.0)]).unwrap();
        let output = assemble(&table(10.0, 1), &history, date(2024, 1, 5));
        let rendered = output.to_string();
        let header = rendered.lines().next().unwrap();
        assert!(header.starts_with("Date"));
        assert!(header.contains("95th Percentile"));
        assert!(rendered.contains("2024-01-05"));
    }
}
