//! MarketSeries: an ordered run of daily bars for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::{Bar, BarField};

/// Time-ordered bars for a single symbol.
///
/// Produced by a market-data provider, read-only to strategies. The
/// orchestrator works on its own sliced and forward-filled copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl MarketSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// True when every date is strictly greater than the one before it
    /// (ascending and unique).
    pub fn has_strictly_increasing_dates(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].date < w[1].date)
    }

    /// Bars with `start <= date <= end`. Either bound may be omitted.
    pub fn slice(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> MarketSeries {
        let bars = self
            .bars
            .iter()
            .filter(|b| start.map_or(true, |s| b.date >= s))
            .filter(|b| end.map_or(true, |e| b.date <= e))
            .cloned()
            .collect();
        MarketSeries::new(self.symbol.clone(), bars)
    }

    /// Total number of null cells across all value columns.
    pub fn null_count(&self) -> usize {
        self.bars
            .iter()
            .map(|b| BarField::ALL.iter().filter(|&&f| b.value(f).is_nan()).count())
            .sum()
    }

    /// True when `field` is null on every bar. Such a column is as good as absent.
    pub fn column_fully_null(&self, field: BarField) -> bool {
        !self.bars.is_empty() && self.bars.iter().all(|b| b.value(field).is_nan())
    }

    /// Replace each null with the last non-null value of the same column.
    ///
    /// Leading nulls (no earlier value) stay null. Returns the number of
    /// cells filled.
    pub fn forward_fill(&mut self) -> usize {
        let mut filled = 0;
        for field in BarField::ALL {
            let mut last: Option<f64> = None;
            for bar in &mut self.bars {
                let cell = bar.value_mut(field);
                if cell.is_nan() {
                    if let Some(prev) = last {
                        *cell = prev;
                        filled += 1;
                    }
                } else {
                    last = Some(*cell);
                }
            }
        }
        filled
    }
}
