//! Code for reading technologies and the switches allowed between them.
use super::{check_unique, input_err_msg, read_csv};
use crate::id::IDCollection;
use crate::technology::{SwitchTable, Technology, TechnologyID, TechnologyMap};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use serde::Deserialize;
use std::path::Path;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";
const TECHNOLOGY_SWITCHES_FILE_NAME: &str = "technology_switches.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TechnologySwitchRaw {
    base_technology: String,
    switch_technology: String,
}

/// Read technologies from the model directory
pub fn read_technologies(model_dir: &Path) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let technologies_csv = read_csv(&file_path)?;
    read_technologies_from_iter(technologies_csv).with_context(|| input_err_msg(&file_path))
}

fn read_technologies_from_iter<I>(iter: I) -> Result<TechnologyMap>
where
    I: Iterator<Item = Technology>,
{
    let technologies: Vec<_> = iter.collect();
    check_unique(technologies.iter().map(|t| &t.id), "technology ID")?;

    for technology in &technologies {
        if let Some(until) = technology.year_available_until {
            ensure!(
                until > technology.year_available_from,
                "Technology {} is never available: year_available_until ({until}) must be after \
                 year_available_from ({})",
                technology.id,
                technology.year_available_from
            );
        }
    }

    Ok(technologies
        .into_iter()
        .map(|technology| (technology.id.clone(), technology))
        .collect())
}

/// Read the table of allowed technology switches
pub fn read_switches(model_dir: &Path, technologies: &TechnologyMap) -> Result<SwitchTable> {
    let file_path = model_dir.join(TECHNOLOGY_SWITCHES_FILE_NAME);
    let switches_csv = read_csv(&file_path)?;
    read_switches_from_iter(switches_csv, technologies).with_context(|| input_err_msg(&file_path))
}

fn read_switches_from_iter<I>(iter: I, technologies: &TechnologyMap) -> Result<SwitchTable>
where
    I: Iterator<Item = TechnologySwitchRaw>,
{
    let mut switches = SwitchTable::new();
    for raw in iter {
        let base: TechnologyID = technologies.get_id_by_str(&raw.base_technology)?;
        let target: TechnologyID = technologies.get_id_by_str(&raw.switch_technology)?;
        let targets: &mut IndexSet<_> = switches.entry(base.clone()).or_default();
        ensure!(
            targets.insert(target.clone()),
            "Duplicate switch {base} -> {target}"
        );
    }

    // A plant can always keep its technology
    for id in technologies.keys() {
        let keeps_itself = switches
            .get(id)
            .is_some_and(|targets| targets.contains(id));
        ensure!(
            keeps_itself,
            "Technology {id} must be allowed to switch to itself"
        );
    }

    Ok(switches)
}
