//! Entry/exit signal series.
//!
//! A `SignalSeries` is a boolean flag per date. Strategies may leave a flag
//! undefined (`None`); consumers call [`SignalSeries::reindex`] to get a
//! series aligned to the market dates where every undefined or missing
//! entry reads as `false`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::strategy::StrategyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSeries {
    dates: Vec<NaiveDate>,
    values: Vec<Option<bool>>,
}

impl SignalSeries {
    /// Build from parallel date and value vectors of equal length.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<bool>>) -> Result<Self, StrategyError> {
        if dates.len() != values.len() {
            return Err(StrategyError::DataValidation(format!(
                "signal series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        Ok(Self { dates, values })
    }

    /// Build a fully-defined series from plain flags.
    pub fn from_flags(dates: Vec<NaiveDate>, flags: Vec<bool>) -> Result<Self, StrategyError> {
        Self::new(dates, flags.into_iter().map(Some).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Flag at `index`, with undefined reading as `false`.
    pub fn get(&self, index: usize) -> bool {
        self.values.get(index).copied().flatten().unwrap_or(false)
    }

    /// Number of bars where the flag is set.
    pub fn count(&self) -> usize {
        self.values.iter().filter(|v| **v == Some(true)).count()
    }

    /// Flags as plain booleans (undefined → `false`).
    pub fn to_flags(&self) -> Vec<bool> {
        self.values.iter().map(|v| v.unwrap_or(false)).collect()
    }

    /// Align to `target` dates exactly.
    ///
    /// Dates present here but absent from `target` are dropped; target dates
    /// with no entry here, or an undefined one, become `false`.
    pub fn reindex(&self, target: &[NaiveDate]) -> SignalSeries {
        let mut flags = Vec::with_capacity(target.len());
        let mut cursor = 0;
        for date in target {
            // Both sides are ascending, so a single forward scan suffices.
            while cursor < self.dates.len() && self.dates[cursor] < *date {
                cursor += 1;
            }
            let flag = if cursor < self.dates.len() && self.dates[cursor] == *date {
                self.values[cursor].unwrap_or(false)
            } else {
                false
            };
            flags.push(Some(flag));
        }
        SignalSeries {
            dates: target.to_vec(),
            values: flags,
        }
    }
}

/// Entry and exit signals produced by one strategy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub entries: SignalSeries,
    pub exits: SignalSeries,
}

impl Signals {
    pub fn new(entries: SignalSeries, exits: SignalSeries) -> Self {
        Self { entries, exits }
    }

    pub fn reindex(&self, target: &[NaiveDate]) -> Signals {
        Signals {
            entries: self.entries.reindex(target),
            exits: self.exits.reindex(target),
        }
    }

    /// True if neither side fires anywhere.
    pub fn is_silent(&self) -> bool {
        self.entries.count() == 0 && self.exits.count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn undefined_reads_as_false() {
        let s = SignalSeries::new(vec![day(1), day(2)], vec![None, Some(true)]).unwrap();
        assert!(!s.get(0));
        assert!(s.get(1));
        assert!(!s.get(99));
        assert_eq!(s.count(), 1);
        assert_eq!(s.to_flags(), vec![false, true]);
    }

    #[test]
    fn reindex_fills_missing_dates_with_false() {
        let s = SignalSeries::new(vec![day(2), day(4)], vec![Some(true), None]).unwrap();
        let target = vec![day(1), day(2), day(3), day(4), day(5)];
        let r = s.reindex(&target);
        assert_eq!(r.dates(), target.as_slice());
        assert_eq!(r.to_flags(), vec![false, true, false, false, false]);
    }

    #[test]
    fn reindex_drops_dates_outside_target() {
        let s = SignalSeries::from_flags(vec![day(1), day(2), day(3)], vec![true, true, true])
            .unwrap();
        let r = s.reindex(&[day(2)]);
        assert_eq!(r.len(), 1);
        assert!(r.get(0));
    }

    #[test]
    fn silent_signals() {
        let dates = vec![day(1), day(2)];
        let quiet = Signals::new(
            SignalSeries::from_flags(dates.clone(), vec![false, false]).unwrap(),
            SignalSeries::new(dates, vec![None, None]).unwrap(),
        );
        assert!(quiet.is_silent());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = SignalSeries::new(vec![day(1), day(2), day(3)], vec![Some(true)]).unwrap_err();
        assert_eq!(
            err,
            StrategyError::DataValidation("signal series has 3 dates but 1 values".into())
        );
        assert!(SignalSeries::from_flags(vec![day(1)], vec![]).is_err());
    }
}
