//! Common routines for handling input data.
use crate::model::{Model, ModelParameters};
use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::hash::Hash;
use std::path::Path;

mod plant;
use plant::read_plants;
mod reference;
use reference::read_reference_tables;
mod resource;
use resource::{read_business_cases, read_resource_capacities, read_steel_demand};
mod technology;
use technology::{read_switches, read_technologies};

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// A missing file is treated as an empty one.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;

    Ok(toml_data)
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check that all the values yielded by an iterator are unique, naming the first duplicate
fn check_unique<T, I>(iter: I, what: &str) -> Result<()>
where
    T: Eq + Hash + std::fmt::Display,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    for value in iter {
        let message = format!("Duplicate {what}: {value}");
        ensure!(seen.insert(value), message);
    }

    Ok(())
}

/// Check that a value read from file is a finite, non-negative number
fn check_non_negative(value: f64, what: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "Invalid value for {what} ({value}): must be a finite, non-negative number"
    );

    Ok(())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The static model data or an error if any input file is invalid.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let technologies = read_technologies(model_dir)?;
    let switches = read_switches(model_dir, &technologies)?;
    let plants = read_plants(model_dir, &technologies, parameters.start_year)?;
    let (tco, abatement) =
        read_reference_tables(model_dir, &switches, &plants, parameters.start_year)?;
    let business_cases = read_business_cases(model_dir, &technologies)?;
    let resource_capacities = read_resource_capacities(model_dir, &plants, parameters.start_year)?;
    let steel_demand = read_steel_demand(model_dir, &plants, parameters.start_year)?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        plants,
        technologies,
        switches,
        tco,
        abatement,
        business_cases,
        resource_capacities,
        steel_demand,
    })
}
