//! Code for working with yearly data series.
use anyhow::{Result, ensure};
use std::collections::BTreeMap;

/// A value which changes at given years and holds between them.
///
/// Data tables usually only provide values for some years (e.g. every five years). A lookup for
/// a year without data uses the latest data year before it, and lookups beyond the final data
/// year clamp to the final value.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSeries<T> {
    values: BTreeMap<u32, T>,
}

impl<T> Default for YearSeries<T> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<T: Copy> YearSeries<T> {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `year`, failing if one is already present
    pub fn insert(&mut self, year: u32, value: T) -> Result<()> {
        ensure!(
            self.values.insert(year, value).is_none(),
            "Duplicate entry for year {year}"
        );

        Ok(())
    }

    /// The value which applies in `year`, or `None` if `year` precedes all data
    pub fn value_at(&self, year: u32) -> Option<T> {
        self.values
            .range(..=year)
            .next_back()
            .map(|(_, value)| *value)
    }

    /// The first year with data
    pub fn first_year(&self) -> Option<u32> {
        self.values.keys().next().copied()
    }

    /// Whether the series has no data
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Copy> FromIterator<(u32, T)> for YearSeries<T> {
    fn from_iter<I: IntoIterator<Item = (u32, T)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
