use chrono::NaiveDate;

use crate::error::{Result, SimulationError};

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Close prices ordered by strictly increasing date.
///
/// Prices are not checked here; the return estimator rejects non-positive
/// prices inside its window so data outside the window never fails a run.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    points: Vec<PricePoint>,
}

impl HistoricalSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if let Some(pos) = points.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(SimulationError::invalid_parameter(format!(
                "history dates must be strictly increasing: {} follows {}",
                points[pos + 1].date,
                points[pos].date
            )));
        }
        Ok(Self { points })
    }

    /// Build from unordered points: sorts by date and keeps the last price
    /// seen for a duplicated date.
    pub fn from_unsorted(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }

    pub fn get(&self, index: usize) -> Option<&PricePoint> {
        self.points.get(index)
    }

    /// Points with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> HistoricalSeries {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }
}
