//! Market data providers.
//!
//! Two sources ship with the runner:
//! 1. `CsvProvider` reads a daily OHLCV file with a header row
//! 2. `SyntheticProvider` generates a deterministic random walk per symbol
//!
//! Both return a `MarketSeries` sorted by date with unique dates. Nulls
//! (empty or unparsable cells) are kept as NaN; the orchestrator decides
//! what to do with them.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stratlab_core::{Bar, BarField, MarketSeries};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("no data for '{symbol}' in the requested range")]
    Empty { symbol: String },
}

/// Source of daily bars for a symbol.
pub trait MarketDataProvider {
    /// Bars for `symbol` with `start <= date <= end`. Either bound may be
    /// omitted.
    fn fetch(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<MarketSeries, LoadError>;
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Reads one CSV file. The file holds a single symbol; `fetch` only uses the
/// symbol to label the series.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketDataProvider for CsvProvider {
    fn fetch(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<MarketSeries, LoadError> {
        let file = File::open(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let series = read_csv(symbol, file)?.slice(start, end);
        if series.is_empty() {
            return Err(LoadError::Empty {
                symbol: symbol.to_string(),
            });
        }
        info!(
            symbol,
            path = %self.path.display(),
            bars = series.len(),
            "Loaded market data"
        );
        Ok(series)
    }
}

/// Parse CSV with a `Date, Open, High, Low, Close, Volume` header (any case,
/// any column order, extra columns ignored).
///
/// Rows are sorted by date; for a repeated date the first row wins.
pub fn read_csv<R: Read>(symbol: &str, reader: R) -> Result<MarketSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let date_col = find("Date");
    let value_cols: Vec<Option<usize>> = BarField::ALL
        .iter()
        .map(|f| find(f.column_name()))
        .collect();

    let mut missing = Vec::new();
    if date_col.is_none() {
        missing.push("Date".to_string());
    }
    for (field, col) in BarField::ALL.iter().zip(&value_cols) {
        if col.is_none() {
            missing.push(field.column_name().to_string());
        }
    }
    let Some(date_col) = date_col else {
        return Err(LoadError::MissingColumns(missing));
    };
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 2;
        let raw_date = record.get(date_col).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
            row,
            value: raw_date.to_string(),
        })?;

        let mut bar = Bar {
            date,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: f64::NAN,
        };
        for (field, col) in BarField::ALL.iter().zip(&value_cols) {
            *bar.value_mut(*field) = col
                .and_then(|c| record.get(c))
                .and_then(|cell| cell.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(f64::NAN);
        }
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.date);
    let before = bars.len();
    bars.dedup_by_key(|b| b.date);
    if bars.len() < before {
        warn!(symbol, dropped = before - bars.len(), "Dropped rows with duplicate dates");
    }
    debug!(symbol, bars = bars.len(), "Parsed CSV");
    Ok(MarketSeries::new(symbol, bars))
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

// ─── Synthetic ───────────────────────────────────────────────────────

/// Deterministic random-walk bars for demos and tests.
///
/// The walk starts at 100.0 and is seeded from the BLAKE3 hash of the
/// symbol, so the same symbol and range always give the same bars.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticProvider {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SyntheticProvider {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn fetch(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<MarketSeries, LoadError> {
        let start = start.unwrap_or(self.start);
        let end = end.unwrap_or(self.end);
        let bars = generate_synthetic_bars(symbol, start, end);
        if bars.is_empty() {
            return Err(LoadError::Empty {
                symbol: symbol.to_string(),
            });
        }
        info!(symbol, bars = bars.len(), "Generated synthetic market data");
        Ok(MarketSeries::new(symbol, bars))
    }
}

fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        bars.push(Bar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
