//! Pre-computed TCO and emissions abatement tables for technology switches.
use crate::region::CountryID;
use crate::technology::TechnologyID;
use crate::units::{EmissionsPerTonne, MoneyPerTonne};
use crate::year::YearSeries;
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Identifies a switch from a base technology to a candidate technology in a country
pub type SwitchKey = (CountryID, TechnologyID, TechnologyID);

/// A table of values for technology switches, indexed by country and year
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable<T> {
    /// The quantity stored in the table (used in error messages)
    name: &'static str,
    values: HashMap<SwitchKey, YearSeries<T>>,
}

/// Total cost of ownership of switching technology
pub type TcoTable = ReferenceTable<MoneyPerTonne>;

/// Emissions abated by switching technology
pub type AbatementTable = ReferenceTable<EmissionsPerTonne>;

impl<T: Copy> ReferenceTable<T> {
    /// Create an empty table
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            values: HashMap::new(),
        }
    }

    /// Add an entry to the table
    pub fn insert(&mut self, key: SwitchKey, year: u32, value: T) -> Result<()> {
        let (country, base, candidate) = &key;
        let context = format!("Duplicate {} entry for {country}: {base} -> {candidate}", self.name);
        self.values
            .entry(key)
            .or_default()
            .insert(year, value)
            .context(context)
    }

    /// Look up the value for a switch in a given year.
    ///
    /// Years without data take the value of the latest earlier year.
    pub fn get(
        &self,
        year: u32,
        country: &CountryID,
        base: &TechnologyID,
        candidate: &TechnologyID,
    ) -> Result<T> {
        let key = (country.clone(), base.clone(), candidate.clone());
        self.values
            .get(&key)
            .with_context(|| {
                format!(
                    "No {} data for {country}: {base} -> {candidate}",
                    self.name
                )
            })?
            .value_at(year)
            .with_context(|| {
                format!(
                    "No {} data for {country}: {base} -> {candidate} in year {year}",
                    self.name
                )
            })
    }

    /// Iterate over the switches covered by the table
    pub fn keys(&self) -> impl Iterator<Item = &SwitchKey> {
        self.values.keys()
    }

    /// Number of switches covered by the table
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;

    #[test]
    fn test_reference_table_lookup() {
        let mut table = TcoTable::new("TCO");
        let key: SwitchKey = ("DEU".into(), "Avg BF-BOF".into(), "EAF".into());
        table.insert(key.clone(), 2020, MoneyPerTonne(400.0)).unwrap();
        table.insert(key.clone(), 2030, MoneyPerTonne(350.0)).unwrap();
        assert_eq!(table.len(), 1);

        let get = |year| table.get(year, &key.0, &key.1, &key.2);
        assert_eq!(get(2025).unwrap(), MoneyPerTonne(400.0));
        assert_eq!(get(2050).unwrap(), MoneyPerTonne(350.0));
        assert_error!(
            get(2019),
            "No TCO data for DEU: Avg BF-BOF -> EAF in year 2019"
        );
        assert_error!(
            table.get(2025, &"FRA".into(), &key.1, &key.2),
            "No TCO data for FRA: Avg BF-BOF -> EAF"
        );
    }
}
