//! Steel plants and their operating status.
use crate::id::{define_id_getter, define_id_type};
use crate::region::{CountryID, RegionID};
use crate::technology::{CLOSE_PLANT, TechnologyID};
use crate::units::Capacity;
use indexmap::IndexMap;
use std::collections::HashMap;

define_id_type! {PlantID}

/// A map of [`Plant`]s, keyed by plant ID
pub type PlantMap = IndexMap<PlantID, Plant>;

/// A steel plant in the plant roster
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    /// Unique identifier for the plant
    pub id: PlantID,
    /// Human-readable plant name
    pub name: String,
    /// Country in which the plant is located
    pub country_code: CountryID,
    /// Region in which the plant is located
    pub region_id: RegionID,
    /// First year of operation
    pub start_of_operation: u32,
    /// The year in which the plant stops operating, if known
    pub end_of_operation: Option<u32>,
    /// Technology operated when the plant starts (or the model begins)
    pub initial_technology: TechnologyID,
    /// Steelmaking capacity
    pub capacity: Capacity,
    /// Secondary capacity (EAF fed by scrap) takes no technology decisions
    pub primary_capacity: bool,
}
define_id_getter! {Plant, PlantID}

impl Plant {
    /// Whether the plant operates in `year`
    pub fn is_active(&self, year: u32) -> bool {
        self.start_of_operation <= year && self.end_of_operation.is_none_or(|end| year < end)
    }

    /// Whether `year` is the founding year of a plant built during the simulation
    pub fn is_founded_in(&self, year: u32, model_start: u32) -> bool {
        year > model_start && year == self.start_of_operation
    }

    /// The year in which the plant first operates within the simulated horizon
    pub fn first_active_year(&self, model_start: u32) -> u32 {
        self.start_of_operation.max(model_start)
    }
}

/// Whether `technology` denotes a closed plant
pub fn is_closed_technology(technology: &TechnologyID) -> bool {
    technology.0.as_ref() == CLOSE_PLANT
}

/// Iterate over the plants active in `year`
pub fn active_plants(plants: &PlantMap, year: u32) -> impl Iterator<Item = &Plant> {
    plants.values().filter(move |plant| plant.is_active(year))
}

/// The total capacity of `plants` in each region
pub fn region_capacity_totals<'a>(
    plants: impl IntoIterator<Item = &'a Plant>,
) -> HashMap<RegionID, Capacity> {
    let mut totals = HashMap::new();
    for plant in plants {
        *totals
            .entry(plant.region_id.clone())
            .or_insert(Capacity(0.0)) += plant.capacity;
    }

    totals
}
