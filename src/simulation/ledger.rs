//! The resource ledger tracks consumption of constrained resources against their annual supply.
use crate::plant::{Plant, region_capacity_totals};
use crate::region::RegionID;
use crate::resource::{
    BusinessCaseMap, ConstrainedResource, ResourceCapacityMap, ResourceUsage, SteelDemandMap,
    regional_steel_demand, usage_factor,
};
use crate::technology::TechnologyID;
use crate::units::{Capacity, ResourceAmount};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// Identifies an entry in the ledger: a resource in a year, optionally for a single region
pub type LedgerKey = (ConstrainedResource, u32, Option<RegionID>);

/// An amount of a resource claimed by a plant
#[derive(Debug, Clone, Copy, PartialEq)]
struct Commitment {
    amount: ResourceAmount,
    /// Committed for the plant's existing technology, regardless of the remaining supply
    grandfathered: bool,
}

/// The supply of a resource and the amounts committed against it
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Available supply (infinite for unconstrained resources)
    pub capacity: ResourceAmount,
    committed: Vec<Commitment>,
}

impl LedgerEntry {
    fn new(capacity: ResourceAmount) -> Self {
        Self {
            capacity,
            committed: Vec::new(),
        }
    }

    /// Total amount committed
    pub fn used(&self) -> ResourceAmount {
        self.committed.iter().map(|c| c.amount).sum()
    }

    /// Amount committed for technologies plants already operated
    pub fn grandfathered(&self) -> ResourceAmount {
        self.committed
            .iter()
            .filter(|c| c.grandfathered)
            .map(|c| c.amount)
            .sum()
    }

    /// Amount committed for technologies adopted this year
    pub fn adopted(&self) -> ResourceAmount {
        self.committed
            .iter()
            .filter(|c| !c.grandfathered)
            .map(|c| c.amount)
            .sum()
    }

    /// Supply left after all commitments
    pub fn remaining(&self) -> ResourceAmount {
        self.capacity - self.used()
    }

    /// Whether `amount` can be committed without exceeding the supply
    fn admits(&self, amount: ResourceAmount) -> bool {
        if amount <= ResourceAmount(0.0) {
            return true;
        }
        if self.capacity <= ResourceAmount(0.0) {
            return false;
        }

        amount <= self.remaining()
    }
}

/// Annual budgets of constrained resources and the consumption committed against them.
///
/// Each simulated year is opened with fresh entries; entries for earlier years are kept for
/// reporting.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    entries: IndexMap<LedgerKey, LedgerEntry>,
    regional: Vec<ConstrainedResource>,
}

impl ResourceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create fresh entries for every resource in `year`, discarding any existing ones
    pub fn open_year(&mut self, year: u32, capacities: &ResourceCapacityMap) -> Result<()> {
        self.entries.retain(|(_, entry_year, _), _| *entry_year != year);
        self.regional.clear();

        for resource in ConstrainedResource::iter() {
            if capacities.is_regional(resource) {
                self.regional.push(resource);
                for region_id in capacities.regions_for(resource).sorted() {
                    let capacity = capacities
                        .capacity(resource, Some(region_id), year)?
                        .unwrap_or(ResourceAmount(f64::INFINITY));
                    self.entries.insert(
                        (resource, year, Some(region_id.clone())),
                        LedgerEntry::new(capacity),
                    );
                }
            } else {
                let capacity = capacities
                    .capacity(resource, None, year)?
                    .unwrap_or(ResourceAmount(f64::INFINITY));
                self.entries
                    .insert((resource, year, None), LedgerEntry::new(capacity));
            }
        }

        Ok(())
    }

    fn key(&self, resource: ConstrainedResource, year: u32, region_id: &RegionID) -> LedgerKey {
        let scope = self
            .regional
            .contains(&resource)
            .then(|| region_id.clone());
        (resource, year, scope)
    }

    fn entry(
        &self,
        resource: ConstrainedResource,
        year: u32,
        region_id: &RegionID,
    ) -> Result<&LedgerEntry> {
        let key = self.key(resource, year, region_id);
        self.entries.get(&key).with_context(|| {
            format!("No ledger entry for resource {resource:?} in {region_id} in year {year}")
        })
    }

    fn entry_mut(
        &mut self,
        resource: ConstrainedResource,
        year: u32,
        region_id: &RegionID,
    ) -> Result<&mut LedgerEntry> {
        let key = self.key(resource, year, region_id);
        self.entries.get_mut(&key).with_context(|| {
            format!("No ledger entry for resource {resource:?} in {region_id} in year {year}")
        })
    }

    /// Supply of a resource left for plants in `region_id`
    pub fn remaining(
        &self,
        resource: ConstrainedResource,
        year: u32,
        region_id: &RegionID,
    ) -> Result<ResourceAmount> {
        Ok(self.entry(resource, year, region_id)?.remaining())
    }

    /// Commit an amount for a technology the plant already operates, regardless of the remaining
    /// supply
    pub fn commit(
        &mut self,
        resource: ConstrainedResource,
        year: u32,
        region_id: &RegionID,
        amount: ResourceAmount,
    ) -> Result<()> {
        self.entry_mut(resource, year, region_id)?
            .committed
            .push(Commitment {
                amount,
                grandfathered: true,
            });

        Ok(())
    }

    /// Commit an amount if the remaining supply allows it.
    ///
    /// # Returns
    ///
    /// Whether the amount was committed.
    pub fn try_commit(
        &mut self,
        resource: ConstrainedResource,
        year: u32,
        region_id: &RegionID,
        amount: ResourceAmount,
    ) -> Result<bool> {
        let entry = self.entry_mut(resource, year, region_id)?;
        if !entry.admits(amount) {
            return Ok(false);
        }

        entry.committed.push(Commitment {
            amount,
            grandfathered: false,
        });

        Ok(true)
    }

    /// Whether every resource in `usage` can be committed without exceeding supply
    pub fn admits(&self, usage: &ResourceUsage, year: u32, region_id: &RegionID) -> Result<bool> {
        for (resource, amount) in usage {
            if !self.entry(*resource, year, region_id)?.admits(*amount) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Commit all of `usage` if every resource can accommodate it, otherwise commit nothing
    pub fn try_commit_usage(
        &mut self,
        usage: &ResourceUsage,
        year: u32,
        region_id: &RegionID,
    ) -> Result<bool> {
        if !self.admits(usage, year, region_id)? {
            return Ok(false);
        }

        for (resource, amount) in usage {
            let committed = self.try_commit(*resource, year, region_id, *amount)?;
            debug_assert!(committed, "Resource admitted but could not be committed");
        }

        Ok(true)
    }

    /// Commit all of `usage` regardless of the remaining supply
    pub fn commit_usage(
        &mut self,
        usage: &ResourceUsage,
        year: u32,
        region_id: &RegionID,
    ) -> Result<()> {
        for (resource, amount) in usage {
            self.commit(*resource, year, region_id, *amount)?;
        }

        Ok(())
    }

    /// Commit all of `usage` for a newly adopted technology without checking the supply.
    ///
    /// Only for runs in which resource constraints are not enforced.
    pub fn adopt_usage_unchecked(
        &mut self,
        usage: &ResourceUsage,
        year: u32,
        region_id: &RegionID,
    ) -> Result<()> {
        for (resource, amount) in usage {
            self.entry_mut(*resource, year, region_id)?
                .committed
                .push(Commitment {
                    amount: *amount,
                    grandfathered: false,
                });
        }

        Ok(())
    }

    /// Iterate over all entries in the order they were created
    pub fn iter(&self) -> impl Iterator<Item = (&LedgerKey, &LedgerEntry)> {
        self.entries.iter()
    }

    /// Log a summary of resource use in `year`
    pub fn log_year_summary(&self, year: u32) {
        for ((resource, _, region_id), entry) in
            self.entries.iter().filter(|((_, y, _), _)| *y == year)
        {
            if entry.capacity.is_finite() {
                let region = region_id.as_ref().map_or("global", |id| &*id.0);
                debug!(
                    "{resource:?} ({region}) in {year}: used {:.3} of {:.3}",
                    entry.used().value(),
                    entry.capacity.value()
                );
            }
        }
    }
}

/// Projects the resource use of plants in a given year.
///
/// A plant's production is its share of its region's active capacity multiplied by the regional
/// steel demand.
pub struct UsageProjector<'a> {
    year: u32,
    business_cases: &'a BusinessCaseMap,
    steel_demand: &'a SteelDemandMap,
    region_capacity: HashMap<RegionID, Capacity>,
}

impl<'a> UsageProjector<'a> {
    /// Create a projector for `year`, sharing demand between the `operating` plants
    pub fn new<'p>(
        year: u32,
        operating: impl IntoIterator<Item = &'p Plant>,
        business_cases: &'a BusinessCaseMap,
        steel_demand: &'a SteelDemandMap,
    ) -> Self {
        Self {
            year,
            business_cases,
            steel_demand,
            region_capacity: region_capacity_totals(operating),
        }
    }

    /// The total capacity of operating plants in a region
    pub fn region_capacity(&self, region_id: &RegionID) -> Capacity {
        self.region_capacity
            .get(region_id)
            .copied()
            .unwrap_or_default()
    }

    /// The resources `plant` would consume operating `technology`
    pub fn project_plant_usage(
        &self,
        plant: &Plant,
        technology: &TechnologyID,
    ) -> Result<ResourceUsage> {
        let region_total = self.region_capacity(&plant.region_id);
        if region_total <= Capacity(0.0) {
            return Ok(ConstrainedResource::iter()
                .map(|resource| (resource, ResourceAmount(0.0)))
                .collect());
        }

        let demand = regional_steel_demand(self.steel_demand, &plant.region_id, self.year)?;
        let production = (plant.capacity / region_total) * demand;

        Ok(ConstrainedResource::iter()
            .map(|resource| {
                let factor = usage_factor(self.business_cases, technology, resource);
                (resource, production * factor)
            })
            .collect())
    }
}
