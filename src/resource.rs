//! Scarce resources shared between plants, and the data describing their supply and use.
use crate::region::RegionID;
use crate::technology::TechnologyID;
use crate::units::{Production, ResourceAmount, ResourcePerProduction};
use crate::year::YearSeries;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::{HashMap, HashSet};
use strum::EnumIter;

/// A resource with a limited annual supply
#[derive(
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
    EnumIter,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
pub enum ConstrainedResource {
    /// Solid biomass and biomethane
    #[string = "biomass"]
    Biomass,
    /// Steel scrap
    #[string = "scrap"]
    Scrap,
    /// CO2 captured for storage
    #[string = "captured_co2"]
    CapturedCo2,
    /// CO2 captured for utilisation
    #[string = "used_co2"]
    UsedCo2,
}

/// Projected consumption of each constrained resource
pub type ResourceUsage = IndexMap<ConstrainedResource, ResourceAmount>;

/// Resource use per tonne of steel, keyed by technology and resource
pub type BusinessCaseMap = HashMap<(TechnologyID, ConstrainedResource), ResourcePerProduction>;

/// Regional steel demand over time
pub type SteelDemandMap = HashMap<RegionID, YearSeries<Production>>;

/// Get the resource use per tonne of steel for a technology (zero if it does not use it)
pub fn usage_factor(
    business_cases: &BusinessCaseMap,
    technology: &TechnologyID,
    resource: ConstrainedResource,
) -> ResourcePerProduction {
    business_cases
        .get(&(technology.clone(), resource))
        .copied()
        .unwrap_or_default()
}

/// Steel demand for a region in a given year
pub fn regional_steel_demand(
    steel_demand: &SteelDemandMap,
    region_id: &RegionID,
    year: u32,
) -> Result<Production> {
    steel_demand
        .get(region_id)
        .with_context(|| format!("No steel demand data for region {region_id}"))?
        .value_at(year)
        .with_context(|| format!("No steel demand data for region {region_id} in year {year}"))
}

/// Annual supply of constrained resources.
///
/// A resource with rows for individual regions is budgeted per region (e.g. regional scrap
/// availability). Resources without any rows are unconstrained.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResourceCapacityMap {
    global: HashMap<ConstrainedResource, YearSeries<ResourceAmount>>,
    regional: HashMap<(ConstrainedResource, RegionID), YearSeries<ResourceAmount>>,
    regional_resources: HashSet<ConstrainedResource>,
}

impl ResourceCapacityMap {
    /// Create an empty map, in which all resources are unconstrained
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the capacity of a resource for a year
    pub fn insert(
        &mut self,
        resource: ConstrainedResource,
        region_id: Option<RegionID>,
        year: u32,
        capacity: ResourceAmount,
    ) -> Result<()> {
        let series = match region_id {
            Some(region_id) => {
                self.regional_resources.insert(resource);
                self.regional.entry((resource, region_id)).or_default()
            }
            None => self.global.entry(resource).or_default(),
        };
        series
            .insert(year, capacity)
            .with_context(|| format!("Duplicate capacity for resource {resource:?}"))
    }

    /// Whether the resource has a limited supply
    pub fn is_constrained(&self, resource: ConstrainedResource) -> bool {
        self.global.contains_key(&resource) || self.regional_resources.contains(&resource)
    }

    /// Whether the resource is budgeted per region
    pub fn is_regional(&self, resource: ConstrainedResource) -> bool {
        self.regional_resources.contains(&resource)
    }

    /// Whether both global and regional budgets were given for the same resource
    pub fn has_mixed_scope(&self, resource: ConstrainedResource) -> bool {
        self.global.contains_key(&resource) && self.regional_resources.contains(&resource)
    }

    /// The regions with a budget for `resource`
    pub fn regions_for(&self, resource: ConstrainedResource) -> impl Iterator<Item = &RegionID> {
        self.regional
            .keys()
            .filter(move |(res, _)| *res == resource)
            .map(|(_, region_id)| region_id)
    }

    /// The capacity of a resource in a year.
    ///
    /// Returns `Ok(None)` for unconstrained resources.
    pub fn capacity(
        &self,
        resource: ConstrainedResource,
        region_id: Option<&RegionID>,
        year: u32,
    ) -> Result<Option<ResourceAmount>> {
        let series = match region_id {
            Some(region_id) if self.is_regional(resource) => self
                .regional
                .get(&(resource, region_id.clone()))
                .with_context(|| {
                    format!("No capacity data for resource {resource:?} in region {region_id}")
                })?,
            _ => match self.global.get(&resource) {
                Some(series) => series,
                None => return Ok(None),
            },
        };

        let capacity = series.value_at(year).with_context(|| {
            format!("No capacity data for resource {resource:?} in year {year}")
        })?;

        Ok(Some(capacity))
    }

    /// The first year for which data is available across all resources
    pub fn first_years(&self) -> impl Iterator<Item = (ConstrainedResource, u32)> {
        let global = self
            .global
            .iter()
            .filter_map(|(resource, series)| Some((*resource, series.first_year()?)));
        let regional = self
            .regional
            .iter()
            .filter_map(|((resource, _), series)| Some((*resource, series.first_year()?)));

        global.chain(regional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;

    #[test]
    fn test_capacity_lookup() {
        let mut capacities = ResourceCapacityMap::new();
        capacities
            .insert(
                ConstrainedResource::Biomass,
                None,
                2020,
                ResourceAmount(10.0),
            )
            .unwrap();
        capacities
            .insert(
                ConstrainedResource::Scrap,
                Some("EUR".into()),
                2020,
                ResourceAmount(5.0),
            )
            .unwrap();

        assert!(capacities.is_regional(ConstrainedResource::Scrap));
        assert!(!capacities.is_regional(ConstrainedResource::Biomass));
        assert!(!capacities.is_constrained(ConstrainedResource::UsedCo2));

        // Clamps to last year of data
        assert_eq!(
            capacities
                .capacity(ConstrainedResource::Biomass, Some(&"EUR".into()), 2050)
                .unwrap(),
            Some(ResourceAmount(10.0))
        );
        assert_eq!(
            capacities
                .capacity(ConstrainedResource::Scrap, Some(&"EUR".into()), 2030)
                .unwrap(),
            Some(ResourceAmount(5.0))
        );
        assert_eq!(
            capacities
                .capacity(ConstrainedResource::UsedCo2, None, 2030)
                .unwrap(),
            None
        );
        assert_error!(
            capacities.capacity(ConstrainedResource::Scrap, Some(&"USA".into()), 2030),
            "No capacity data for resource Scrap in region USA"
        );
        assert_error!(
            capacities.capacity(ConstrainedResource::Biomass, None, 2019),
            "No capacity data for resource Biomass in year 2019"
        );
    }

    #[test]
    fn test_usage_factor_missing_is_zero() {
        let business_cases = BusinessCaseMap::from([(
            ("EAF".into(), ConstrainedResource::Scrap),
            ResourcePerProduction(1.1),
        )]);
        assert_eq!(
            usage_factor(&business_cases, &"EAF".into(), ConstrainedResource::Scrap),
            ResourcePerProduction(1.1)
        );
        assert_eq!(
            usage_factor(&business_cases, &"EAF".into(), ConstrainedResource::Biomass),
            ResourcePerProduction(0.0)
        );
    }

    #[test]
    fn test_regional_steel_demand() {
        let demand = SteelDemandMap::from([(
            "EUR".into(),
            [(2020, Production(100.0)), (2030, Production(80.0))]
                .into_iter()
                .collect(),
        )]);
        assert_eq!(
            regional_steel_demand(&demand, &"EUR".into(), 2035).unwrap(),
            Production(80.0)
        );
        assert!(regional_steel_demand(&demand, &"USA".into(), 2035).is_err());
    }
}
