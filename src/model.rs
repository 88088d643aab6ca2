//! The model: plants, technologies and reference data loaded from a model directory.
use crate::plant::PlantMap;
use crate::reference::{AbatementTable, TcoTable};
use crate::resource::{BusinessCaseMap, ResourceCapacityMap, SteelDemandMap};
use crate::technology::{SwitchTable, TechnologyMap};
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;
pub mod scenario;

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The plant roster
    pub plants: PlantMap,
    /// Technologies which plants can operate
    pub technologies: TechnologyMap,
    /// The technologies each technology may switch to
    pub switches: SwitchTable,
    /// TCO for each technology switch
    pub tco: TcoTable,
    /// Emissions abatement for each technology switch
    pub abatement: AbatementTable,
    /// Resource use per tonne of steel for each technology
    pub business_cases: BusinessCaseMap,
    /// Annual supply of constrained resources
    pub resource_capacities: ResourceCapacityMap,
    /// Regional steel demand
    pub steel_demand: SteelDemandMap,
}

impl Model {
    /// Iterate over the simulated years
    pub fn iter_years(&self) -> impl Iterator<Item = u32> {
        self.parameters.years()
    }
}
