//! The module responsible for writing output data to disk.
use crate::plant::PlantID;
use crate::region::RegionID;
use crate::resource::ConstrainedResource;
use crate::simulation::RankRecord;
use crate::simulation::choices::ChoiceRecord;
use crate::simulation::investment_cycle::{CycleEntry, InvestmentCycle, SwitchType};
use crate::simulation::ledger::{LedgerEntry, LedgerKey};
use crate::technology::TechnologyID;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "steelsim_results";

/// The output file name for the technology of each plant in each year
const TECHNOLOGY_CHOICES_FILE_NAME: &str = "technology_choices.csv";

/// The output file name for the decision audit log
const CHOICE_RECORDS_FILE_NAME: &str = "choice_records.csv";

/// The output file name for resource consumption
const RESOURCE_USAGE_FILE_NAME: &str = "resource_usage.csv";

/// The output file name for investment cycles
const INVESTMENT_CYCLES_FILE_NAME: &str = "investment_cycles.csv";

/// The output file name for candidate rankings
const RANK_RECORDS_FILE_NAME: &str = "debug_rank_records.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, optionally deleting an existing one.
///
/// # Returns
///
/// Whether an existing folder was deleted.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let mut overwritten = false;
    if output_dir.is_dir() {
        let is_empty = output_dir.read_dir()?.next().is_none();
        if !is_empty {
            ensure!(
                allow_overwrite,
                "Output folder {} already exists and is not empty. Use --overwrite to replace it.",
                output_dir.display()
            );
            fs::remove_dir_all(output_dir)?;
            overwritten = true;
        }
    }

    fs::create_dir_all(output_dir)?;

    Ok(overwritten)
}

/// Represents a row in the technology choices CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TechnologyChoiceRow {
    year: u32,
    plant_id: PlantID,
    technology: TechnologyID,
}

/// Represents a row in the resource usage CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ResourceUsageRow {
    year: u32,
    resource: ConstrainedResource,
    /// Blank for resources budgeted globally
    region: Option<RegionID>,
    /// Blank for unconstrained resources
    capacity: Option<f64>,
    used: f64,
    grandfathered: f64,
    remaining: Option<f64>,
}

impl ResourceUsageRow {
    fn new(key: &LedgerKey, entry: &LedgerEntry) -> Self {
        let (resource, year, region) = key;
        let finite = |value: f64| value.is_finite().then_some(value);
        Self {
            year: *year,
            resource: *resource,
            region: region.clone(),
            capacity: finite(entry.capacity.value()),
            used: entry.used().value(),
            grandfathered: entry.grandfathered().value(),
            remaining: finite(entry.remaining().value()),
        }
    }
}

/// Represents a row in the investment cycles CSV file.
///
/// Year ranges are inclusive; a main-cycle entry covers a single year.
#[derive(Serialize, Debug, PartialEq)]
struct InvestmentCycleRow {
    plant_id: PlantID,
    cycle_length: u32,
    entry_type: SwitchType,
    start_year: u32,
    end_year: u32,
}

impl InvestmentCycleRow {
    fn new(plant_id: &PlantID, cycle: &InvestmentCycle, entry: &CycleEntry) -> Self {
        let (entry_type, start_year, end_year) = match entry {
            CycleEntry::Main(year) => (SwitchType::MainCycle, *year, *year),
            CycleEntry::Window(range) => (SwitchType::TransSwitch, range.start, range.end - 1),
        };
        Self {
            plant_id: plant_id.clone(),
            cycle_length: cycle.cycle_length(),
            entry_type,
            start_year,
            end_year,
        }
    }
}

/// An object for writing simulation results to file
pub struct DataWriter {
    choices_writer: csv::Writer<File>,
    records_writer: csv::Writer<File>,
    resource_usage_writer: csv::Writer<File>,
    cycles_writer: csv::Writer<File>,
    rank_records_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let rank_records_writer = if save_debug_info {
            Some(new_writer(RANK_RECORDS_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            choices_writer: new_writer(TECHNOLOGY_CHOICES_FILE_NAME)?,
            records_writer: new_writer(CHOICE_RECORDS_FILE_NAME)?,
            resource_usage_writer: new_writer(RESOURCE_USAGE_FILE_NAME)?,
            cycles_writer: new_writer(INVESTMENT_CYCLES_FILE_NAME)?,
            rank_records_writer,
        })
    }

    /// Write the technology of each plant in `year`
    pub fn write_choices<'a, I>(&mut self, year: u32, choices: I) -> Result<()>
    where
        I: Iterator<Item = (&'a PlantID, &'a TechnologyID)>,
    {
        for (plant_id, technology) in choices {
            let row = TechnologyChoiceRow {
                year,
                plant_id: plant_id.clone(),
                technology: technology.clone(),
            };
            self.choices_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write decision audit entries
    pub fn write_choice_records(&mut self, records: &[ChoiceRecord]) -> Result<()> {
        for record in records {
            self.records_writer.serialize(record)?;
        }

        Ok(())
    }

    /// Write the state of ledger entries
    pub fn write_resource_usage<'a, I>(&mut self, entries: I) -> Result<()>
    where
        I: Iterator<Item = (&'a LedgerKey, &'a LedgerEntry)>,
    {
        for (key, entry) in entries {
            self.resource_usage_writer
                .serialize(ResourceUsageRow::new(key, entry))?;
        }

        Ok(())
    }

    /// Write the final investment cycle of every plant
    pub fn write_investment_cycles<'a, I>(&mut self, cycles: I) -> Result<()>
    where
        I: Iterator<Item = (&'a PlantID, &'a InvestmentCycle)>,
    {
        for (plant_id, cycle) in cycles {
            for entry in cycle.entries() {
                self.cycles_writer
                    .serialize(InvestmentCycleRow::new(plant_id, cycle, entry))?;
            }
        }

        Ok(())
    }

    /// Write candidate rankings, if debug output is enabled
    pub fn write_rank_records(&mut self, records: &[RankRecord]) -> Result<()> {
        if let Some(wtr) = &mut self.rank_records_writer {
            for record in records {
                wtr.serialize(record)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.choices_writer.flush()?;
        self.records_writer.flush()?;
        self.resource_usage_writer.flush()?;
        self.cycles_writer.flush()?;
        if let Some(wtr) = &mut self.rank_records_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}
