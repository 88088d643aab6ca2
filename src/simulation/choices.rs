//! The record of technology choices made by each plant in each year.
use crate::plant::PlantID;
use crate::simulation::investment_cycle::SwitchType;
use crate::technology::TechnologyID;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Why a plant ended a year with its technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecisionReason {
    /// The plant has no decision this year
    NotASwitchYear,
    /// The plant started operating this year
    NewPlant,
    /// The plant is closed
    PlantClosed,
    /// Secondary capacity takes no decisions
    SecondaryCapacity,
    /// A new technology was chosen at a main investment decision
    MainCycleChange,
    /// The current technology was kept at a main investment decision
    NoChange,
    /// A new technology was chosen in a transitional window
    TransitionalSwitch,
    /// The current technology was kept in a transitional window
    NoChangeOffCycle,
    /// The plant is in a transitional window but transitional switching is disabled
    TransitionalSwitchingDisabled,
    /// A switch was blocked by the annual switching capacity limit
    DeferredByCapacityLimit,
}

/// An audit entry for the decision taken by one plant in one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceRecord {
    /// The year of the decision
    pub year: u32,
    /// The plant
    pub plant_id: PlantID,
    /// Technology operated before the decision
    pub prior_technology: TechnologyID,
    /// Technology operated after the decision
    pub switch_technology: TechnologyID,
    /// The kind of decision the plant was due to take
    pub switch_type: SwitchType,
    /// Why the plant ended up with `switch_technology`
    pub reason: DecisionReason,
}

/// The technology operated by each plant in each simulated year.
///
/// Choices are stored per plant so that the prior choice of a plant can be found quickly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechnologyChoices(IndexMap<PlantID, BTreeMap<u32, TechnologyID>>);

impl TechnologyChoices {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the technology of a plant in `year`.
    ///
    /// Years must be recorded in increasing order for each plant. Recording the same year again
    /// overwrites the earlier choice.
    pub fn insert(&mut self, year: u32, plant_id: &PlantID, technology: TechnologyID) -> Result<()> {
        let choices = self.0.entry(plant_id.clone()).or_default();
        if let Some((&last_year, _)) = choices.last_key_value() {
            ensure!(
                year >= last_year,
                "Cannot record choice for plant {plant_id} in {year}: already recorded {last_year}"
            );
        }
        choices.insert(year, technology);

        Ok(())
    }

    /// The technology of a plant in `year`, if recorded
    pub fn get(&self, year: u32, plant_id: &PlantID) -> Option<&TechnologyID> {
        self.0.get(plant_id)?.get(&year)
    }

    /// The most recent technology recorded for a plant before `year`
    pub fn latest_before(&self, year: u32, plant_id: &PlantID) -> Option<&TechnologyID> {
        self.0
            .get(plant_id)?
            .range(..year)
            .next_back()
            .map(|(_, technology)| technology)
    }

    /// The technology recorded for a plant in the previous year, failing if there is none
    pub fn previous(&self, year: u32, plant_id: &PlantID) -> Result<&TechnologyID> {
        self.latest_before(year, plant_id)
            .with_context(|| format!("No technology recorded for plant {plant_id} before {year}"))
    }

    /// Iterate over the choices for `year`, in the order plants were first recorded
    pub fn iter_year(&self, year: u32) -> impl Iterator<Item = (&PlantID, &TechnologyID)> {
        self.0
            .iter()
            .filter_map(move |(plant_id, choices)| Some((plant_id, choices.get(&year)?)))
    }

    /// All recorded years, in increasing order
    pub fn years(&self) -> Vec<u32> {
        let mut years: Vec<_> = self.0.values().flat_map(|c| c.keys().copied()).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Iterate over all choices, ordered by year and then by plant
    pub fn iter(&self) -> impl Iterator<Item = (u32, &PlantID, &TechnologyID)> {
        self.years().into_iter().flat_map(move |year| {
            self.iter_year(year)
                .map(move |(plant_id, technology)| (year, plant_id, technology))
        })
    }

    /// Whether no choices have been recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use itertools::assert_equal;

    #[test]
    fn test_insert_and_lookup() {
        let plant_id: PlantID = "P1".into();
        let mut choices = TechnologyChoices::new();
        choices.insert(2020, &plant_id, "Avg BF-BOF".into()).unwrap();
        choices.insert(2021, &plant_id, "BAT BF-BOF".into()).unwrap();

        assert_eq!(choices.get(2020, &plant_id), Some(&"Avg BF-BOF".into()));
        assert_eq!(
            choices.latest_before(2025, &plant_id),
            Some(&"BAT BF-BOF".into())
        );
        assert_eq!(choices.latest_before(2020, &plant_id), None);
        assert_error!(
            choices.previous(2020, &plant_id),
            "No technology recorded for plant P1 before 2020"
        );
    }

    #[test]
    fn test_insert_out_of_order() {
        let plant_id: PlantID = "P1".into();
        let mut choices = TechnologyChoices::new();
        choices.insert(2021, &plant_id, "EAF".into()).unwrap();
        choices.insert(2021, &plant_id, "DRI-EAF".into()).unwrap();
        assert_eq!(choices.get(2021, &plant_id), Some(&"DRI-EAF".into()));
        assert_error!(
            choices.insert(2020, &plant_id, "EAF".into()),
            "Cannot record choice for plant P1 in 2020: already recorded 2021"
        );
    }

    #[test]
    fn test_iter_ordering() {
        let (p1, p2): (PlantID, PlantID) = ("P1".into(), "P2".into());
        let mut choices = TechnologyChoices::new();
        choices.insert(2020, &p2, "EAF".into()).unwrap();
        choices.insert(2020, &p1, "EAF".into()).unwrap();
        choices.insert(2021, &p1, "DRI-EAF".into()).unwrap();
        choices.insert(2021, &p2, "EAF".into()).unwrap();

        assert_equal(
            choices.iter().map(|(year, plant_id, _)| (year, plant_id.0.as_ref())),
            [(2020, "P2"), (2020, "P1"), (2021, "P2"), (2021, "P1")],
        );
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            DecisionReason::DeferredByCapacityLimit.to_string(),
            "deferred_by_capacity_limit"
        );
    }
}
