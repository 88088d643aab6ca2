//! Fixtures for tests

use crate::model::parameters::{InvestmentCycleParameters, RankingParameters};
use crate::model::scenario::Scenario;
use crate::model::{Model, ModelParameters};
use crate::plant::{Plant, PlantMap};
use crate::reference::{AbatementTable, TcoTable};
use crate::resource::{BusinessCaseMap, ConstrainedResource, ResourceCapacityMap, SteelDemandMap};
use crate::technology::{
    SwitchTable, Technology, TechnologyID, TechnologyMap, TechnologyPhase,
};
use crate::units::{Capacity, EmissionsPerTonne, MoneyPerTonne, Production, ResourceAmount, ResourcePerProduction};
use indexmap::IndexSet;
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

fn technology(id: &str, furnace_family: &str, phase: TechnologyPhase, from: u32) -> Technology {
    Technology {
        id: id.into(),
        furnace_family: furnace_family.into(),
        phase,
        year_available_from: from,
        year_available_until: None,
    }
}

fn new_plant(id: &str, country: &str, region: &str, start: u32, tech: &str, cap: f64) -> Plant {
    Plant {
        id: id.into(),
        name: format!("Plant {id}"),
        country_code: country.into(),
        region_id: region.into(),
        start_of_operation: start,
        end_of_operation: None,
        initial_technology: tech.into(),
        capacity: Capacity(cap),
        primary_capacity: true,
    }
}

#[fixture]
pub fn avg_bf_bof() -> Technology {
    technology("Avg BF-BOF", "blast_furnace", TechnologyPhase::Initial, 2020)
}

#[fixture]
pub fn dri_eaf_h2() -> Technology {
    technology(
        "DRI-EAF_100% green H2",
        "dri-eaf",
        TechnologyPhase::EndState,
        2030,
    )
}

#[fixture]
pub fn technologies(avg_bf_bof: Technology, dri_eaf_h2: Technology) -> TechnologyMap {
    [
        avg_bf_bof,
        technology(
            "BAT BF-BOF",
            "blast_furnace",
            TechnologyPhase::Transitional,
            2020,
        ),
        technology(
            "BAT BF-BOF+CCUS",
            "blast_furnace",
            TechnologyPhase::EndState,
            2020,
        ),
        technology("DRI-EAF", "dri-eaf", TechnologyPhase::Transitional, 2020),
        dri_eaf_h2,
        technology("EAF", "eaf", TechnologyPhase::EndState, 2020),
    ]
    .into_iter()
    .map(|technology| (technology.id.clone(), technology))
    .collect()
}

fn switch_row(base: &str, targets: &[&str]) -> (TechnologyID, IndexSet<TechnologyID>) {
    (base.into(), targets.iter().map(|&id| id.into()).collect())
}

#[fixture]
pub fn switches() -> SwitchTable {
    let h2 = "DRI-EAF_100% green H2";
    [
        switch_row(
            "Avg BF-BOF",
            &["Avg BF-BOF", "BAT BF-BOF", "BAT BF-BOF+CCUS", "DRI-EAF", h2, "EAF"],
        ),
        switch_row(
            "BAT BF-BOF",
            &["BAT BF-BOF", "BAT BF-BOF+CCUS", "DRI-EAF", h2, "EAF"],
        ),
        switch_row("BAT BF-BOF+CCUS", &["BAT BF-BOF+CCUS"]),
        switch_row("DRI-EAF", &["DRI-EAF", h2]),
        switch_row(h2, &[h2]),
        switch_row("EAF", &["EAF"]),
    ]
    .into_iter()
    .collect()
}

#[fixture]
pub fn plant() -> Plant {
    new_plant("P1", "DEU", "EUR", 2020, "Avg BF-BOF", 1.0)
}

#[fixture]
pub fn plants() -> PlantMap {
    [
        new_plant("P1", "DEU", "EUR", 2000, "Avg BF-BOF", 2.0),
        new_plant("P2", "FRA", "EUR", 2010, "BAT BF-BOF", 3.0),
    ]
    .into_iter()
    .map(|plant| (plant.id.clone(), plant))
    .collect()
}

#[fixture]
pub fn resource_capacities() -> ResourceCapacityMap {
    let mut capacities = ResourceCapacityMap::new();
    capacities
        .insert(
            ConstrainedResource::Scrap,
            Some("EUR".into()),
            2020,
            ResourceAmount(10.0),
        )
        .unwrap();
    capacities
        .insert(
            ConstrainedResource::Biomass,
            None,
            2020,
            ResourceAmount(100.0),
        )
        .unwrap();
    capacities
        .insert(
            ConstrainedResource::CapturedCo2,
            None,
            2020,
            ResourceAmount(0.0),
        )
        .unwrap();
    capacities
}

fn parameters() -> ModelParameters {
    ModelParameters {
        start_year: 2020,
        end_year: 2050,
        tech_moratorium_year: 2030,
        investment_cycle: InvestmentCycleParameters::default(),
        ranking: RankingParameters::default(),
        scenario: Scenario::default(),
    }
}

/// Fill reference tables for every switch in every country, from per-technology cost and
/// emissions intensity
fn reference_tables(
    switches: &SwitchTable,
    countries: &[&str],
    cost: impl Fn(&str) -> f64,
    emissions: impl Fn(&str) -> f64,
) -> (TcoTable, AbatementTable) {
    let mut tco = TcoTable::new("TCO");
    let mut abatement = AbatementTable::new("abatement");
    for &country in countries {
        for (base, targets) in switches {
            for target in targets {
                let key = (country.into(), base.clone(), target.clone());
                tco.insert(key.clone(), 2020, MoneyPerTonne(cost(&target.0)))
                    .unwrap();
                abatement
                    .insert(
                        key,
                        2020,
                        EmissionsPerTonne(emissions(&base.0) - emissions(&target.0)),
                    )
                    .unwrap();
            }
        }
    }

    (tco, abatement)
}

/// A single plant which can only improve its blast furnace, with "BAT BF-BOF" the clear winner
#[fixture]
pub fn single_plant_model(plant: Plant) -> Model {
    let technologies: TechnologyMap = [
        technology("Avg BF-BOF", "blast_furnace", TechnologyPhase::Initial, 2020),
        technology(
            "BAT BF-BOF",
            "blast_furnace",
            TechnologyPhase::Transitional,
            2020,
        ),
    ]
    .into_iter()
    .map(|technology| (technology.id.clone(), technology))
    .collect();
    let switches: SwitchTable = [
        switch_row("Avg BF-BOF", &["Avg BF-BOF", "BAT BF-BOF"]),
        switch_row("BAT BF-BOF", &["BAT BF-BOF"]),
    ]
    .into_iter()
    .collect();
    let (tco, abatement) = reference_tables(
        &switches,
        &["DEU"],
        |tech| if tech == "BAT BF-BOF" { 50.0 } else { 100.0 },
        |_| 2.0,
    );

    Model {
        model_path: PathBuf::new(),
        parameters: parameters(),
        plants: [(plant.id.clone(), plant)].into_iter().collect(),
        technologies,
        switches,
        tco,
        abatement,
        business_cases: BusinessCaseMap::new(),
        resource_capacities: ResourceCapacityMap::new(),
        steel_demand: SteelDemandMap::from([(
            "EUR".into(),
            [(2020, Production(10.0))].into_iter().collect(),
        )]),
    }
}

/// A small roster covering every kind of plant, in two regions
#[fixture]
pub fn model(
    technologies: TechnologyMap,
    switches: SwitchTable,
    resource_capacities: ResourceCapacityMap,
) -> Model {
    let mut resource_capacities = resource_capacities;
    resource_capacities
        .insert(
            ConstrainedResource::Scrap,
            Some("USA".into()),
            2020,
            ResourceAmount(5.0),
        )
        .unwrap();

    let mut secondary = new_plant("P4", "DEU", "EUR", 2005, "EAF", 1.0);
    secondary.primary_capacity = false;
    let mut retiring = new_plant("P7", "FRA", "EUR", 2001, "BAT BF-BOF", 2.5);
    retiring.end_of_operation = Some(2035);
    let plants: PlantMap = [
        new_plant("P1", "DEU", "EUR", 2000, "Avg BF-BOF", 2.0),
        new_plant("P2", "DEU", "EUR", 2010, "Avg BF-BOF", 3.0),
        new_plant("P3", "USA", "USA", 2015, "DRI-EAF", 1.5),
        secondary,
        new_plant("P5", "USA", "USA", 2030, "BAT BF-BOF", 1.0),
        new_plant("P6", "DEU", "EUR", 1990, crate::technology::CLOSE_PLANT, 1.0),
        retiring,
    ]
    .into_iter()
    .map(|plant| (plant.id.clone(), plant))
    .collect();

    let cost = |tech: &str| match tech {
        "Avg BF-BOF" => 100.0,
        "BAT BF-BOF" => 95.0,
        "BAT BF-BOF+CCUS" => 120.0,
        "DRI-EAF" => 110.0,
        "EAF" => 90.0,
        _ => 130.0,
    };
    let emissions = |tech: &str| match tech {
        "Avg BF-BOF" => 2.0,
        "BAT BF-BOF" => 1.8,
        "BAT BF-BOF+CCUS" => 0.4,
        "DRI-EAF" => 1.2,
        "EAF" => 0.3,
        _ => 0.1,
    };
    let (tco, abatement) = reference_tables(&switches, &["DEU", "FRA", "USA"], cost, emissions);

    let business_cases = BusinessCaseMap::from([
        (("EAF".into(), ConstrainedResource::Scrap), ResourcePerProduction(1.1)),
        (
            ("BAT BF-BOF+CCUS".into(), ConstrainedResource::CapturedCo2),
            ResourcePerProduction(1.5),
        ),
        (("DRI-EAF".into(), ConstrainedResource::Biomass), ResourcePerProduction(0.2)),
    ]);

    Model {
        model_path: PathBuf::new(),
        parameters: parameters(),
        plants,
        technologies,
        switches,
        tco,
        abatement,
        business_cases,
        resource_capacities,
        steel_demand: SteelDemandMap::from([
            ("EUR".into(), [(2020, Production(10.0))].into_iter().collect()),
            ("USA".into(), [(2020, Production(5.0))].into_iter().collect()),
        ]),
    }
}
