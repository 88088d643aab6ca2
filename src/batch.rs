//! Running many independent scenario runs in parallel.
//!
//! Plant and technology IDs are reference counted and cannot be shared between threads, so each
//! worker loads its own copy of the model and returns plain summary rows.
use crate::input::load_model;
use crate::model::scenario::{Scenario, ScenarioBatch};
use crate::plant::PlantMap;
use crate::simulation::choices::TechnologyChoices;
use crate::simulation;
use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The output file name for the batch summary
const BATCH_SUMMARY_FILE_NAME: &str = "batch_summary.csv";

/// Total capacity operating a technology in one year of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Scenario name
    pub scenario: String,
    /// Index of the run within its scenario
    pub run: u32,
    /// Simulated year
    pub year: u32,
    /// Technology name
    pub technology: String,
    /// Total plant capacity
    pub capacity: f64,
}

/// The folder for the output of a single run
fn get_run_dir(output_path: &Path, scenario: &Scenario, run: u32) -> PathBuf {
    output_path.join(&scenario.name).join(format!("run_{run}"))
}

/// Sum plant capacity by year and technology
fn summarise(
    scenario: &Scenario,
    run: u32,
    plants: &PlantMap,
    choices: &TechnologyChoices,
) -> Vec<SummaryRow> {
    let mut totals: BTreeMap<(u32, String), f64> = BTreeMap::new();
    for (year, plant_id, technology) in choices.iter() {
        if let Some(plant) = plants.get(plant_id) {
            *totals.entry((year, technology.to_string())).or_default() += plant.capacity.value();
        }
    }

    totals
        .into_iter()
        .map(|((year, technology), capacity)| SummaryRow {
            scenario: scenario.name.clone(),
            run,
            year,
            technology,
            capacity,
        })
        .collect()
}

/// Load the model and run a single scenario, writing its output to `run_dir`
fn run_single(
    model_path: &Path,
    scenario: Scenario,
    run: u32,
    run_dir: &Path,
    debug_model: bool,
) -> Result<Vec<SummaryRow>> {
    fs::create_dir_all(run_dir)?;
    let model = load_model(model_path)?;
    let summary_scenario = scenario.clone();
    let context = simulation::run(&model, scenario, run_dir, debug_model)?;

    Ok(summarise(
        &summary_scenario,
        run,
        &model.plants,
        &context.choices,
    ))
}

/// Run every scenario in `batch` against the model at `model_path`.
///
/// # Arguments
///
/// * `model_path` - The model directory
/// * `batch` - The scenarios to run
/// * `output_path` - Folder under which each run gets its own subfolder
/// * `debug_model` - Whether to write candidate rankings for each run
/// * `num_threads` - Size of the worker pool (0 for one thread per core)
///
/// # Returns
///
/// The summary rows for all runs, which are also written to `batch_summary.csv`.
pub fn run_batch(
    model_path: &Path,
    batch: &ScenarioBatch,
    output_path: &Path,
    debug_model: bool,
    num_threads: usize,
) -> Result<Vec<SummaryRow>> {
    let runs = batch.runs().collect_vec();
    info!("Running {} scenario runs", runs.len());

    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to create worker pool")?;
    let summaries: Vec<Vec<SummaryRow>> = pool.install(|| {
        runs.into_par_iter()
            .map(|(run, scenario)| {
                let run_dir = get_run_dir(output_path, &scenario, run);
                let name = scenario.name.clone();
                run_single(model_path, scenario, run, &run_dir, debug_model)
                    .with_context(|| format!("Run {run} of scenario '{name}' failed"))
            })
            .collect::<Result<_>>()
    })?;

    let rows = summaries.into_iter().flatten().collect_vec();
    write_summary(output_path, &rows)?;
    info!("Batch complete");

    Ok(rows)
}

/// Write the combined summary of all runs
fn write_summary(output_path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(BATCH_SUMMARY_FILE_NAME))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::plants;
    use crate::technology::TechnologyID;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_summarise(plants: PlantMap) {
        let mut choices = TechnologyChoices::new();
        let avg: TechnologyID = "Avg BF-BOF".into();
        let bat: TechnologyID = "BAT BF-BOF".into();
        choices.insert(2020, &"P1".into(), avg.clone()).unwrap();
        choices.insert(2020, &"P2".into(), avg.clone()).unwrap();
        choices.insert(2021, &"P1".into(), avg).unwrap();
        choices.insert(2021, &"P2".into(), bat).unwrap();

        let scenario = Scenario::default();
        let rows = summarise(&scenario, 3, &plants, &choices);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].year, 2020);
        assert_eq!(rows[0].technology, "Avg BF-BOF");
        assert_approx_eq!(f64, rows[0].capacity, 5.0);
        assert_eq!(rows[2].technology, "BAT BF-BOF");
        assert_approx_eq!(f64, rows[2].capacity, 3.0);
        assert!(rows.iter().all(|row| row.run == 3));
    }

    #[test]
    fn test_get_run_dir() {
        let scenario = Scenario {
            name: "net_zero".into(),
            ..Scenario::default()
        };
        assert_eq!(
            get_run_dir(Path::new("out"), &scenario, 2),
            Path::new("out").join("net_zero").join("run_2")
        );
    }

    #[test]
    fn test_write_summary() {
        let dir = tempdir().unwrap();
        let row = SummaryRow {
            scenario: "base".into(),
            run: 0,
            year: 2030,
            technology: "EAF".into(),
            capacity: 1.5,
        };
        write_summary(dir.path(), std::slice::from_ref(&row)).unwrap();

        let rows: Vec<SummaryRow> =
            csv::Reader::from_path(dir.path().join(BATCH_SUMMARY_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_eq!(rows, [row]);
    }
}
