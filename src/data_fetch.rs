use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Result, SimulationError};
use crate::models::series::{HistoricalSeries, PricePoint};

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com";

/// Source of daily close prices.
///
/// Every failure (network, unknown instrument, empty range, bad payload) is
/// reported as [`SimulationError::DataUnavailable`].
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn get_history(
        &self,
        instrument_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HistoricalSeries>;
}

fn non_empty(series: HistoricalSeries, instrument_id: &str) -> Result<HistoricalSeries> {
    if series.is_empty() {
        return Err(SimulationError::data_unavailable(format!(
            "no prices for {instrument_id} in requested range"
        )));
    }
    Ok(series)
}

/// Daily closes from the Yahoo Finance chart endpoint.
pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new(YAHOO_CHART_URL)
    }
}

impl YahooProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, symbol: &str, start_date: NaiveDate, end_date: NaiveDate) -> String {
        let period1 = start_date.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive
        let period2 = (end_date + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, symbol, period1, period2
        )
    }
}

#[async_trait]
impl HistoryProvider for YahooProvider {
    async fn get_history(
        &self,
        instrument_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HistoricalSeries> {
        let url = self.url(instrument_id, start_date, end_date);
        debug!("fetching {}", url);

        let resp = self
            .client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| SimulationError::data_unavailable(e.to_string()))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SimulationError::data_unavailable(e.to_string()))?;

        let series = parse_chart(&resp)?;
        non_empty(series.between(start_date, end_date), instrument_id)
    }
}

/// Pull `(date, close)` pairs out of a chart response. Timestamps are shifted
/// by the exchange's `gmtoffset` before taking the calendar date; rows with a
/// null close are dropped.
pub fn parse_chart(resp: &serde_json::Value) -> Result<HistoricalSeries> {
    let chart = &resp["chart"];
    if let Some(description) = chart["error"]["description"].as_str() {
        return Err(SimulationError::data_unavailable(description.to_string()));
    }

    let result = &chart["result"][0];
    let timestamps = result["timestamp"]
        .as_array()
        .ok_or_else(|| SimulationError::data_unavailable("chart response has no timestamps"))?;
    let closes = result["indicators"]["quote"][0]["close"]
        .as_array()
        .ok_or_else(|| SimulationError::data_unavailable("chart response has no closes"))?;
    if timestamps.len() != closes.len() {
        return Err(SimulationError::data_unavailable(format!(
            "chart response has {} timestamps but {} closes",
            timestamps.len(),
            closes.len()
        )));
    }
    let offset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);

    let mut points = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;
    for (ts, close) in timestamps.iter().zip(closes) {
        let (Some(ts), Some(price)) = (ts.as_i64(), close.as_f64()) else {
            skipped += 1;
            continue;
        };
        let date = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| SimulationError::data_unavailable(format!("bad timestamp {ts}")))?
            .date_naive();
        points.push(PricePoint::new(date, price));
    }
    if skipped > 0 {
        warn!("dropped {} chart rows without a close", skipped);
    }

    Ok(HistoricalSeries::from_unsorted(points))
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date", alias = "DATE")]
    date: NaiveDate,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: f64,
    #[serde(default, alias = "Ticker", alias = "TICKER")]
    ticker: Option<String>,
}

/// Daily closes from a local CSV file with `date` and `close` columns and an
/// optional `ticker` column. Without a ticker column every row belongs to
/// whatever instrument is requested.
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HistoryProvider for CsvProvider {
    async fn get_history(
        &self,
        instrument_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HistoricalSeries> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            SimulationError::data_unavailable(format!("{}: {e}", self.path.display()))
        })?;
        let series = parse_csv(bytes.as_slice(), instrument_id)?;
        non_empty(series.between(start_date, end_date), instrument_id)
    }
}

pub fn parse_csv<R: io::Read>(reader: R, instrument_id: &str) -> Result<HistoricalSeries> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut points = Vec::new();
    for record in csv_reader.deserialize::<CsvRow>() {
        let row = record.map_err(|e| SimulationError::data_unavailable(e.to_string()))?;
        let matches = row
            .ticker
            .as_deref()
            .map_or(true, |t| t.is_empty() || t.eq_ignore_ascii_case(instrument_id));
        if matches {
            points.push(PricePoint::new(row.date, row.close));
        }
    }
    Ok(HistoricalSeries::from_unsorted(points))
}

/// Fixed series keyed by instrument id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    series: HashMap<String, HistoricalSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, instrument_id: impl Into<String>, series: HistoricalSeries) -> Self {
        self.series.insert(instrument_id.into(), series);
        self
    }
}

#[async_trait]
impl HistoryProvider for InMemoryProvider {
    async fn get_history(
        &self,
        instrument_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HistoricalSeries> {
        let series = self.series.get(instrument_id).ok_or_else(|| {
            SimulationError::data_unavailable(format!("unknown instrument {instrument_id}"))
        })?;
        non_empty(series.between(start_date, end_date), instrument_id)
    }
}
