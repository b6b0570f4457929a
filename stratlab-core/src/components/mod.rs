//! Component traits shared by strategies.

pub mod indicator;

pub use indicator::{Indicator, IndicatorValues};
