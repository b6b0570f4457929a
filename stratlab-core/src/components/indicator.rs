//! Indicator trait and the per-run indicator store.

use crate::domain::Bar;
use std::collections::BTreeMap;

/// A derived numeric series over bars.
///
/// `compute` returns one value per bar; the first `lookback()` entries are
/// NaN. A value at bar t never reads bars after t.
pub trait Indicator: Send + Sync {
    /// Display key such as `"sma_20"`.
    fn name(&self) -> &str;

    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Indicator series a strategy recorded during its last `generate_signals`.
///
/// Inspection only. Signal logic never reads back from here.
///
/// Equality treats NaN warm-up cells as equal to each other, so a store
/// always equals its clone.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: BTreeMap<String, Vec<f64>>,
}

impl PartialEq for IndicatorValues {
    fn eq(&self, other: &Self) -> bool {
        self.series.len() == other.series.len()
            && self.iter().zip(other.iter()).all(|((ka, a), (kb, b))| {
                ka == kb
                    && a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
            })
    }
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value of `name` at bar `index`, NaN warm-up included.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.get_series(name)?.get(index).copied()
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }

    /// Last finite value of `name`, if any bar got past warm-up.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.get_series(name)?
            .iter()
            .rev()
            .copied()
            .find(|v| v.is_finite())
    }

    pub fn names(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed(n_nan: usize, tail: &[f64]) -> Vec<f64> {
        let mut v = vec![f64::NAN; n_nan];
        v.extend_from_slice(tail);
        v
    }

    #[test]
    fn lookup_by_index_and_bounds() {
        let mut iv = IndicatorValues::new();
        iv.insert("rsi_14", warmed(3, &[55.0, 61.5]));
        assert!(iv.get("rsi_14", 2).is_some_and(f64::is_nan));
        assert_eq!(iv.get("rsi_14", 4), Some(61.5));
        assert_eq!(iv.get("rsi_14", 5), None);
        assert_eq!(iv.get("ema_10", 0), None);
    }

    #[test]
    fn latest_skips_trailing_nan() {
        let mut iv = IndicatorValues::new();
        iv.insert("bb_upper", vec![f64::NAN, 101.0, 102.5, f64::NAN]);
        iv.insert("empty", warmed(4, &[]));
        assert_eq!(iv.latest("bb_upper"), Some(102.5));
        assert_eq!(iv.latest("empty"), None);
    }

    #[test]
    fn warm_up_nan_does_not_break_equality() {
        let mut iv = IndicatorValues::new();
        iv.insert("sma_short", warmed(4, &[10.0, 10.5]));
        assert_eq!(iv, iv.clone());

        let mut other = iv.clone();
        other.insert("sma_short", warmed(4, &[10.0, 10.6]));
        assert_ne!(iv, other);

        let mut shorter = iv.clone();
        shorter.insert("sma_short", warmed(4, &[10.0]));
        assert_ne!(iv, shorter);
    }

    #[test]
    fn names_come_back_sorted_and_clear_empties() {
        let mut iv = IndicatorValues::new();
        iv.insert("sma_long", vec![1.0]);
        iv.insert("ema_fast", vec![2.0]);
        assert_eq!(iv.names(), ["ema_fast", "sma_long"]);
        assert_eq!(iv.iter().count(), 2);
        iv.clear();
        assert!(iv.is_empty());
    }
}
