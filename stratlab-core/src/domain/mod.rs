//! Domain types: bars, market series, signal series.

pub mod bar;
pub mod series;
pub mod signal;

pub use bar::{Bar, BarField};
pub use series::MarketSeries;
pub use signal::{SignalSeries, Signals};

/// Symbol type alias
pub type Symbol = String;
