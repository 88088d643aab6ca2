//! Code for reading resource use, resource supply and steel demand.
use super::{check_non_negative, input_err_msg, read_csv, read_csv_optional};
use crate::id::IDCollection;
use crate::plant::PlantMap;
use crate::region::RegionID;
use crate::resource::{
    BusinessCaseMap, ConstrainedResource, ResourceCapacityMap, SteelDemandMap,
    regional_steel_demand,
};
use crate::technology::TechnologyMap;
use crate::units::{Production, ResourceAmount, ResourcePerProduction};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use strum::IntoEnumIterator;

const BUSINESS_CASES_FILE_NAME: &str = "business_cases.csv";
const RESOURCE_CAPACITIES_FILE_NAME: &str = "resource_capacities.csv";
const STEEL_DEMAND_FILE_NAME: &str = "steel_demand.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct BusinessCaseRaw {
    technology: String,
    resource: ConstrainedResource,
    usage: ResourcePerProduction,
}

#[derive(PartialEq, Debug, Deserialize)]
struct ResourceCapacityRaw {
    resource: ConstrainedResource,
    year: u32,
    region: Option<String>,
    capacity: ResourceAmount,
}

#[derive(PartialEq, Debug, Deserialize)]
struct SteelDemandRaw {
    year: u32,
    region: String,
    demand: Production,
}

/// The regions in which plants are located, in sorted order
fn plant_regions(plants: &PlantMap) -> Vec<RegionID> {
    plants
        .values()
        .map(|plant| plant.region_id.clone())
        .unique()
        .sorted()
        .collect()
}

/// Read the resource use of each technology.
///
/// The file is optional: technologies without an entry use no constrained resources.
pub fn read_business_cases(
    model_dir: &Path,
    technologies: &TechnologyMap,
) -> Result<BusinessCaseMap> {
    let file_path = model_dir.join(BUSINESS_CASES_FILE_NAME);
    let business_cases_csv = read_csv_optional(&file_path)?;
    read_business_cases_from_iter(business_cases_csv, technologies)
        .with_context(|| input_err_msg(&file_path))
}

fn read_business_cases_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
) -> Result<BusinessCaseMap>
where
    I: Iterator<Item = BusinessCaseRaw>,
{
    let mut business_cases = BusinessCaseMap::new();
    for raw in iter {
        let technology = technologies.get_id_by_str(&raw.technology)?;
        check_non_negative(raw.usage.value(), "usage")?;
        let resource = raw.resource;
        ensure!(
            business_cases
                .insert((technology.clone(), resource), raw.usage)
                .is_none(),
            "Duplicate business case for {technology} and resource {resource:?}"
        );
    }

    Ok(business_cases)
}

/// Read the annual supply of constrained resources.
///
/// The file is optional: resources without any rows are unconstrained.
pub fn read_resource_capacities(
    model_dir: &Path,
    plants: &PlantMap,
    start_year: u32,
) -> Result<ResourceCapacityMap> {
    let file_path = model_dir.join(RESOURCE_CAPACITIES_FILE_NAME);
    let capacities_csv = read_csv_optional(&file_path)?;
    read_resource_capacities_from_iter(capacities_csv, &plant_regions(plants), start_year)
        .with_context(|| input_err_msg(&file_path))
}

fn read_resource_capacities_from_iter<I>(
    iter: I,
    regions: &[RegionID],
    start_year: u32,
) -> Result<ResourceCapacityMap>
where
    I: Iterator<Item = ResourceCapacityRaw>,
{
    let mut capacities = ResourceCapacityMap::new();
    for raw in iter {
        check_non_negative(raw.capacity.value(), "capacity")?;
        let region_id = raw
            .region
            .filter(|region| !region.is_empty())
            .map(RegionID::from);
        capacities.insert(raw.resource, region_id, raw.year, raw.capacity)?;
    }

    for resource in ConstrainedResource::iter() {
        ensure!(
            !capacities.has_mixed_scope(resource),
            "Resource {resource:?} has both global and regional capacities"
        );
        if !capacities.is_constrained(resource) {
            continue;
        }

        if capacities.is_regional(resource) {
            // Every plant draws on its own region's budget
            for region_id in regions {
                capacities
                    .capacity(resource, Some(region_id), start_year)
                    .with_context(|| {
                        format!("Capacity data for {resource:?} must cover every plant region")
                    })?;
            }
        } else {
            capacities.capacity(resource, None, start_year)?;
        }
    }

    Ok(capacities)
}

/// Read steel demand for each region
pub fn read_steel_demand(
    model_dir: &Path,
    plants: &PlantMap,
    start_year: u32,
) -> Result<SteelDemandMap> {
    let file_path = model_dir.join(STEEL_DEMAND_FILE_NAME);
    let demand_csv = read_csv(&file_path)?;
    read_steel_demand_from_iter(demand_csv, &plant_regions(plants), start_year)
        .with_context(|| input_err_msg(&file_path))
}

fn read_steel_demand_from_iter<I>(
    iter: I,
    regions: &[RegionID],
    start_year: u32,
) -> Result<SteelDemandMap>
where
    I: Iterator<Item = SteelDemandRaw>,
{
    let mut demand = SteelDemandMap::new();
    for raw in iter {
        check_non_negative(raw.demand.value(), "demand")?;
        let region_id: RegionID = raw.region.into();
        demand
            .entry(region_id.clone())
            .or_default()
            .insert(raw.year, raw.demand)
            .with_context(|| format!("Duplicate steel demand for region {region_id}"))?;
    }

    for region_id in regions {
        regional_steel_demand(&demand, region_id, start_year)?;
    }

    Ok(demand)
}
