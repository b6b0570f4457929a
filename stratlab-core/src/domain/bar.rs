//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single day.
///
/// A null field is carried as `f64::NAN`. Nulls are forward-filled by the
/// orchestrator before any strategy sees the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// The five value columns every bar carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl BarField {
    pub const ALL: [BarField; 5] = [
        BarField::Open,
        BarField::High,
        BarField::Low,
        BarField::Close,
        BarField::Volume,
    ];

    /// Column name as it appears in CSV headers and error messages.
    pub fn column_name(&self) -> &'static str {
        match self {
            BarField::Open => "Open",
            BarField::High => "High",
            BarField::Low => "Low",
            BarField::Close => "Close",
            BarField::Volume => "Volume",
        }
    }
}

impl std::fmt::Display for BarField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

impl Bar {
    pub fn value(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::Volume => self.volume,
        }
    }

    pub fn value_mut(&mut self, field: BarField) -> &mut f64 {
        match field {
            BarField::Open => &mut self.open,
            BarField::High => &mut self.high,
            BarField::Low => &mut self.low,
            BarField::Close => &mut self.close,
            BarField::Volume => &mut self.volume,
        }
    }

    /// Returns true if any OHLCV field is null.
    pub fn is_void(&self) -> bool {
        BarField::ALL.iter().any(|&f| self.value(f).is_nan())
    }

    /// OHLCV sanity: `high >= max(open, close) >= min(open, close) >= low`,
    /// prices strictly positive, volume non-negative.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.open.max(self.close)
            && self.open.min(self.close) >= self.low
            && self.low > 0.0
            && self.volume >= 0.0
    }
}
