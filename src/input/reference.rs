//! Code for reading the TCO and emissions abatement tables.
use super::{input_err_msg, read_csv};
use crate::id::IDCollection;
use crate::plant::PlantMap;
use crate::reference::{AbatementTable, ReferenceTable, SwitchKey, TcoTable};
use crate::region::CountryID;
use crate::technology::SwitchTable;
use crate::units::{EmissionsPerTonne, MoneyPerTonne};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const TCO_FILE_NAME: &str = "tco.csv";
const ABATEMENT_FILE_NAME: &str = "abatement.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TcoRaw {
    year: u32,
    country_code: String,
    base_technology: String,
    switch_technology: String,
    tco: MoneyPerTonne,
}

#[derive(PartialEq, Debug, Deserialize)]
struct AbatementRaw {
    year: u32,
    country_code: String,
    base_technology: String,
    switch_technology: String,
    abatement: EmissionsPerTonne,
}

/// A row of either table, reduced to its key and value
struct ReferenceRow<T> {
    year: u32,
    country_code: String,
    base_technology: String,
    switch_technology: String,
    value: T,
}

impl From<TcoRaw> for ReferenceRow<MoneyPerTonne> {
    fn from(raw: TcoRaw) -> Self {
        Self {
            year: raw.year,
            country_code: raw.country_code,
            base_technology: raw.base_technology,
            switch_technology: raw.switch_technology,
            value: raw.tco,
        }
    }
}

impl From<AbatementRaw> for ReferenceRow<EmissionsPerTonne> {
    fn from(raw: AbatementRaw) -> Self {
        Self {
            year: raw.year,
            country_code: raw.country_code,
            base_technology: raw.base_technology,
            switch_technology: raw.switch_technology,
            value: raw.abatement,
        }
    }
}

/// The countries which need reference data: those with plants that take decisions
fn deciding_countries(plants: &PlantMap) -> Vec<CountryID> {
    plants
        .values()
        .filter(|plant| plant.primary_capacity)
        .map(|plant| plant.country_code.clone())
        .unique()
        .sorted()
        .collect()
}

/// Read the TCO and abatement tables from the model directory
pub fn read_reference_tables(
    model_dir: &Path,
    switches: &SwitchTable,
    plants: &PlantMap,
    start_year: u32,
) -> Result<(TcoTable, AbatementTable)> {
    let countries = deciding_countries(plants);

    let file_path = model_dir.join(TCO_FILE_NAME);
    let tco_csv = read_csv::<TcoRaw>(&file_path)?;
    let tco = read_table_from_iter(
        tco_csv.map(ReferenceRow::from),
        TcoTable::new("TCO"),
        switches,
        &countries,
        start_year,
    )
    .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(ABATEMENT_FILE_NAME);
    let abatement_csv = read_csv::<AbatementRaw>(&file_path)?;
    let abatement = read_table_from_iter(
        abatement_csv.map(ReferenceRow::from),
        AbatementTable::new("abatement"),
        switches,
        &countries,
        start_year,
    )
    .with_context(|| input_err_msg(&file_path))?;

    Ok((tco, abatement))
}

/// Fill a table from rows, checking that every switch is covered for every country
fn read_table_from_iter<T, I>(
    iter: I,
    mut table: ReferenceTable<T>,
    switches: &SwitchTable,
    countries: &[CountryID],
    start_year: u32,
) -> Result<ReferenceTable<T>>
where
    T: Copy + Into<f64>,
    I: Iterator<Item = ReferenceRow<T>>,
{
    let mut seen_countries = HashSet::new();
    for row in iter {
        let value: f64 = row.value.into();
        ensure!(
            value.is_finite(),
            "Invalid value ({value}) for {}: {} -> {} in {}",
            row.country_code,
            row.base_technology,
            row.switch_technology,
            row.year
        );

        let base = switches.get_id_by_str(&row.base_technology)?;
        let candidate = switches.get_id_by_str(&row.switch_technology)?;
        let country: CountryID = row.country_code.into();
        seen_countries.insert(country.clone());
        let key: SwitchKey = (country, base, candidate);
        table.insert(key, row.year, row.value)?;
    }

    for country in countries {
        for (base, candidates) in switches {
            for candidate in candidates {
                table.get(start_year, country, base, candidate).with_context(|| {
                    format!("Data must cover every allowed switch from {start_year}")
                })?;
            }
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, plants};
    use crate::technology::TechnologyID;
    use indexmap::IndexSet;
    use rstest::{fixture, rstest};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[fixture]
    fn switches() -> SwitchTable {
        let avg: TechnologyID = "Avg BF-BOF".into();
        let eaf: TechnologyID = "EAF".into();
        SwitchTable::from([
            (avg.clone(), IndexSet::from([avg, eaf.clone()])),
            (eaf.clone(), IndexSet::from([eaf])),
        ])
    }

    fn row(year: u32, country: &str, base: &str, target: &str, value: f64) -> ReferenceRow<MoneyPerTonne> {
        ReferenceRow {
            year,
            country_code: country.into(),
            base_technology: base.into(),
            switch_technology: target.into(),
            value: MoneyPerTonne(value),
        }
    }

    fn complete_rows(country: &str) -> Vec<ReferenceRow<MoneyPerTonne>> {
        vec![
            row(2020, country, "Avg BF-BOF", "Avg BF-BOF", 400.0),
            row(2020, country, "Avg BF-BOF", "EAF", 350.0),
            row(2020, country, "EAF", "EAF", 300.0),
        ]
    }

    #[rstest]
    fn test_read_table(switches: SwitchTable) {
        let mut rows = complete_rows("DEU");
        rows.push(row(2030, "DEU", "Avg BF-BOF", "EAF", 320.0));
        let table = read_table_from_iter(
            rows.into_iter(),
            TcoTable::new("TCO"),
            &switches,
            &["DEU".into()],
            2020,
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table
                .get(2035, &"DEU".into(), &"Avg BF-BOF".into(), &"EAF".into())
                .unwrap(),
            MoneyPerTonne(320.0)
        );
    }

    #[rstest]
    fn test_read_table_missing_switch(switches: SwitchTable) {
        let rows = complete_rows("DEU");
        assert_error!(
            read_table_from_iter(
                rows.into_iter(),
                TcoTable::new("TCO"),
                &switches,
                &["DEU".into(), "FRA".into()],
                2020,
            ),
            "Data must cover every allowed switch from 2020"
        );

        // Data starting after the first simulated year
        assert_error!(
            read_table_from_iter(
                complete_rows("DEU").into_iter(),
                TcoTable::new("TCO"),
                &switches,
                &["DEU".into()],
                2015,
            ),
            "Data must cover every allowed switch from 2015"
        );
    }

    #[rstest]
    fn test_read_table_invalid(switches: SwitchTable) {
        let mut rows = complete_rows("DEU");
        rows.push(row(2020, "DEU", "Avg BF-BOF", "Magic", 1.0));
        assert_error!(
            read_table_from_iter(
                rows.into_iter(),
                TcoTable::new("TCO"),
                &switches,
                &[],
                2020
            ),
            "Unknown ID Magic found"
        );

        let rows = vec![row(2020, "DEU", "EAF", "EAF", f64::NAN)];
        assert_error!(
            read_table_from_iter(rows.into_iter(), TcoTable::new("TCO"), &switches, &[], 2020),
            "Invalid value (NaN) for DEU: EAF -> EAF in 2020"
        );
    }

    #[rstest]
    fn test_read_reference_tables(plants: PlantMap) {
        let dir = tempdir().unwrap();
        let technologies = ["Avg BF-BOF", "BAT BF-BOF"];
        {
            let mut tco = File::create(dir.path().join(TCO_FILE_NAME)).unwrap();
            let mut abatement = File::create(dir.path().join(ABATEMENT_FILE_NAME)).unwrap();
            writeln!(tco, "year,country_code,base_technology,switch_technology,tco").unwrap();
            writeln!(
                abatement,
                "year,country_code,base_technology,switch_technology,abatement"
            )
            .unwrap();
            for country in ["DEU", "FRA"] {
                for base in technologies {
                    for target in technologies {
                        writeln!(tco, "2020,{country},{base},{target},100").unwrap();
                        writeln!(abatement, "2020,{country},{base},{target},0.5").unwrap();
                    }
                }
            }
        }

        let all: IndexSet<TechnologyID> = technologies.iter().map(|&t| t.into()).collect();
        let switches: SwitchTable = all.iter().map(|t| (t.clone(), all.clone())).collect();
        let (tco, abatement) = read_reference_tables(dir.path(), &switches, &plants, 2020).unwrap();
        assert_eq!(tco.len(), 8);
        assert_eq!(
            abatement
                .get(2040, &"FRA".into(), &"BAT BF-BOF".into(), &"Avg BF-BOF".into())
                .unwrap(),
            EmissionsPerTonne(0.5)
        );
    }
}
