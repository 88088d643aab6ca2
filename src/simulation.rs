//! Functionality for running the technology-choice simulation.
use crate::model::Model;
use crate::model::scenario::Scenario;
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use crate::plant::{Plant, PlantID, active_plants, is_closed_technology};
use crate::resource::ResourceUsage;
use crate::technology::TechnologyID;
use crate::units::Capacity;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::path::Path;

pub mod candidates;
use candidates::candidates;
pub mod choices;
use choices::{ChoiceRecord, DecisionReason, TechnologyChoices};
pub mod investment_cycle;
use investment_cycle::{InvestmentCycleTracker, SwitchType};
pub mod ledger;
use ledger::{ResourceLedger, UsageProjector};
pub mod ranking;
use ranking::best_choice;

/// Why a technology was not ranked for a plant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExclusionReason {
    /// The technology is not available in this year or is outside the furnace family
    Unavailable,
    /// The plant's projected use of a constrained resource exceeds the remaining supply
    ResourceConstraint,
}

/// Diagnostic information about one candidate considered in a decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRecord {
    /// The year of the decision
    pub year: u32,
    /// The deciding plant
    pub plant_id: PlantID,
    /// Technology operated before the decision
    pub base_technology: TechnologyID,
    /// The candidate technology
    pub technology: TechnologyID,
    /// TCO of the switch
    pub tco: Option<f64>,
    /// Abatement of the switch
    pub abatement: Option<f64>,
    /// TCO tier (ranked logic only)
    pub tco_tier: Option<u8>,
    /// Abatement tier (ranked logic only)
    pub abatement_tier: Option<u8>,
    /// Combined score
    pub score: Option<f64>,
    /// Why the candidate was not ranked, if it wasn't
    pub excluded: Option<ExclusionReason>,
    /// Whether this candidate was chosen
    pub chosen: bool,
}

impl RankRecord {
    fn excluded(
        year: u32,
        plant_id: &PlantID,
        base_technology: &TechnologyID,
        technology: &TechnologyID,
        reason: ExclusionReason,
    ) -> Self {
        Self {
            year,
            plant_id: plant_id.clone(),
            base_technology: base_technology.clone(),
            technology: technology.clone(),
            tco: None,
            abatement: None,
            tco_tier: None,
            abatement_tier: None,
            score: None,
            excluded: Some(reason),
            chosen: false,
        }
    }
}

/// A plant due to take a decision this year
struct Switcher<'a> {
    plant: &'a Plant,
    prior: TechnologyID,
    switch_type: SwitchType,
}

/// The state of a simulation run, carried from one year to the next
pub struct SimulationContext {
    /// The scenario being run
    pub scenario: Scenario,
    /// Resource consumption committed in each year
    pub ledger: ResourceLedger,
    /// When each plant may take decisions
    pub tracker: InvestmentCycleTracker,
    /// The technology operated by each plant in each year
    pub choices: TechnologyChoices,
    /// Audit log of every decision
    pub records: Vec<ChoiceRecord>,
    /// Diagnostic information about ranked candidates
    pub rank_records: Vec<RankRecord>,
    save_rank_records: bool,
    /// Plants whose switch was blocked by the capacity limit last year
    waiting_list: Vec<PlantID>,
    rng: StdRng,
}

impl SimulationContext {
    /// Set up a run of `scenario`.
    ///
    /// Investment cycle lengths are drawn here, so the generator is seeded before anything else
    /// uses it.
    pub fn new(model: &Model, scenario: Scenario, save_rank_records: bool) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(scenario.random_seed);
        let tracker = InvestmentCycleTracker::new(
            &model.plants,
            &model.parameters.investment_cycle,
            model.parameters.years(),
            &mut rng,
            scenario.investment_cycle_randomness,
        )?;

        Ok(Self {
            scenario,
            ledger: ResourceLedger::new(),
            tracker,
            choices: TechnologyChoices::new(),
            records: Vec::new(),
            rank_records: Vec::new(),
            save_rank_records,
            waiting_list: Vec::new(),
            rng,
        })
    }

    /// The technology a plant operates at the start of `year`.
    ///
    /// Outside the plant's first simulated year this must have been recorded the year before.
    fn prior_technology(
        &self,
        plant: &Plant,
        year: u32,
        model_start: u32,
    ) -> Result<TechnologyID> {
        if year == plant.first_active_year(model_start) {
            return Ok(plant.initial_technology.clone());
        }

        self.choices.previous(year, &plant.id).cloned()
    }

    /// The plants active in `year`, each with the technology it operates at the start of the year
    fn active_with_prior<'a>(
        &self,
        model: &'a Model,
        year: u32,
    ) -> Result<Vec<(&'a Plant, TechnologyID)>> {
        active_plants(&model.plants, year)
            .map(|plant| {
                let prior = self.prior_technology(plant, year, model.parameters.start_year)?;
                Ok((plant, prior))
            })
            .collect()
    }

    /// The reason a plant takes no decision this year, if it doesn't
    fn non_switch_reason(
        &self,
        plant: &Plant,
        prior: &TechnologyID,
        switch_type: SwitchType,
        year: u32,
        model_start: u32,
    ) -> Option<DecisionReason> {
        if is_closed_technology(prior) {
            Some(DecisionReason::PlantClosed)
        } else if !plant.primary_capacity {
            Some(DecisionReason::SecondaryCapacity)
        } else if plant.is_founded_in(year, model_start) {
            Some(DecisionReason::NewPlant)
        } else {
            match switch_type {
                SwitchType::NoSwitch => Some(DecisionReason::NotASwitchYear),
                SwitchType::TransSwitch if !self.scenario.transitional_switch => {
                    Some(DecisionReason::TransitionalSwitchingDisabled)
                }
                _ => None,
            }
        }
    }

    fn record(
        &mut self,
        year: u32,
        plant: &Plant,
        prior: TechnologyID,
        choice: TechnologyID,
        switch_type: SwitchType,
        reason: DecisionReason,
    ) -> Result<()> {
        self.choices.insert(year, &plant.id, choice.clone())?;
        self.records.push(ChoiceRecord {
            year,
            plant_id: plant.id.clone(),
            prior_technology: prior,
            switch_technology: choice,
            switch_type,
            reason,
        });

        Ok(())
    }

    /// Simulate the decisions of all active plants in `year`
    pub fn simulate_year(&mut self, model: &Model, year: u32) -> Result<()> {
        info!("Simulating year {year}");
        self.ledger.open_year(year, &model.resource_capacities)?;
        let plants = self.active_with_prior(model, year)?;
        let projector = usage_projector(model, year, &plants);

        let waiting_list = std::mem::take(&mut self.waiting_list);
        let mut waiting = Vec::new();
        let mut main_cycle = Vec::new();
        let mut transitional = Vec::new();

        // Non-switchers have first claim on resources
        for (plant, prior) in plants {
            let switch_type = self.tracker.switch_type(&plant.id, year)?;
            if let Some(reason) =
                self.non_switch_reason(plant, &prior, switch_type, year, model.parameters.start_year)
            {
                if reason != DecisionReason::PlantClosed {
                    let usage = projector.project_plant_usage(plant, &prior)?;
                    self.ledger.commit_usage(&usage, year, &plant.region_id)?;
                }
                self.record(year, plant, prior.clone(), prior, switch_type, reason)?;
                continue;
            }

            let switcher = Switcher {
                plant,
                prior,
                switch_type,
            };
            if waiting_list.contains(&plant.id) {
                waiting.push(switcher);
            } else if switch_type == SwitchType::MainCycle {
                main_cycle.push(switcher);
            } else {
                transitional.push(switcher);
            }
        }

        let mut allowance = self.scenario.switch_capacity_limit;
        for mut group in [waiting, main_cycle, transitional] {
            if self.scenario.randomise_switch_order {
                group.shuffle(&mut self.rng);
            }
            for switcher in group {
                self.decide(model, &projector, &switcher, year, &mut allowance)?;
            }
        }

        self.ledger.log_year_summary(year);

        Ok(())
    }

    /// Choose the technology for a plant due to take a decision
    fn decide(
        &mut self,
        model: &Model,
        projector: &UsageProjector,
        switcher: &Switcher,
        year: u32,
        allowance: &mut Option<Capacity>,
    ) -> Result<()> {
        let Switcher {
            plant,
            prior,
            switch_type,
        } = switcher;
        let transitional = *switch_type == SwitchType::TransSwitch;
        let available = candidates(
            &model.technologies,
            &model.switches,
            prior,
            year,
            transitional,
            model.parameters.moratorium_year(&self.scenario),
        )
        .with_context(|| format!("Could not choose a technology for plant {}", plant.id))?;

        let mut usages = IndexMap::new();
        let mut feasible = Vec::new();
        let mut constrained = Vec::new();
        for technology in &available {
            let usage = projector.project_plant_usage(plant, technology)?;
            let admitted = !self.scenario.enforce_constraints
                || technology == prior
                || self.ledger.admits(&usage, year, &plant.region_id)?;
            if admitted {
                feasible.push(technology.clone());
            } else {
                constrained.push(technology.clone());
            }
            usages.insert(technology.clone(), usage);
        }
        if feasible.is_empty() {
            warn!(
                "No candidate for plant {} in {year} fits the remaining resources; \
                 keeping {prior}",
                plant.id
            );
            feasible.push(prior.clone());
        }

        let country = &plant.country_code;
        let ranking = best_choice(
            &feasible,
            prior,
            |candidate| model.tco.get(year, country, prior, candidate),
            |candidate| model.abatement.get(year, country, prior, candidate),
            self.scenario.weights(),
            self.scenario.solver_logic,
            &model.parameters.ranking,
        )
        .with_context(|| format!("Could not choose a technology for plant {}", plant.id))?;

        let mut choice = ranking.best.clone();
        let mut reason = match (transitional, choice == *prior) {
            (false, false) => DecisionReason::MainCycleChange,
            (false, true) => DecisionReason::NoChange,
            (true, false) => DecisionReason::TransitionalSwitch,
            (true, true) => DecisionReason::NoChangeOffCycle,
        };

        if choice != *prior && !self.claim_allowance(plant, year, transitional, allowance)? {
            debug!(
                "Switch of plant {} to {choice} in {year} blocked by capacity limit",
                plant.id
            );
            choice = prior.clone();
            reason = DecisionReason::DeferredByCapacityLimit;
        }

        let usage = match usages.swap_remove(&choice) {
            Some(usage) => usage,
            None => projector.project_plant_usage(plant, &choice)?,
        };
        self.commit_choice(plant, prior, &choice, &usage, year)?;

        if transitional && choice != *prior {
            self.tracker.rebase(&plant.id, year)?;
        }

        debug!(
            "Plant {} in {year}: {prior} -> {choice} ({switch_type}, {reason})",
            plant.id
        );

        if self.save_rank_records {
            self.save_rankings(year, plant, prior, &available, &constrained, ranking, &choice, model);
        }

        self.record(year, plant, prior.clone(), choice, *switch_type, reason)
    }

    /// Commit the resources used by a plant's chosen technology.
    ///
    /// A kept technology claims its usage regardless of supply, but a new one must fit.
    fn commit_choice(
        &mut self,
        plant: &Plant,
        prior: &TechnologyID,
        choice: &TechnologyID,
        usage: &ResourceUsage,
        year: u32,
    ) -> Result<()> {
        if choice == prior {
            return self.ledger.commit_usage(usage, year, &plant.region_id);
        }
        if !self.scenario.enforce_constraints {
            return self
                .ledger
                .adopt_usage_unchecked(usage, year, &plant.region_id);
        }

        let committed = self.ledger.try_commit_usage(usage, year, &plant.region_id)?;
        ensure!(
            committed,
            "Resources for plant {} to adopt {choice} in {year} were not available",
            plant.id
        );

        Ok(())
    }

    /// Take a switching plant's capacity from the year's allowance.
    ///
    /// A plant which doesn't fit is put on the waiting list, and a main-cycle decision is deferred.
    ///
    /// # Returns
    ///
    /// Whether the switch can go ahead.
    fn claim_allowance(
        &mut self,
        plant: &Plant,
        year: u32,
        transitional: bool,
        allowance: &mut Option<Capacity>,
    ) -> Result<bool> {
        let Some(remaining) = allowance.as_mut() else {
            return Ok(true);
        };

        if plant.capacity > *remaining {
            if !transitional {
                self.tracker.defer(&plant.id, year)?;
            }
            self.waiting_list.push(plant.id.clone());
            return Ok(false);
        }

        *remaining -= plant.capacity;
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    fn save_rankings(
        &mut self,
        year: u32,
        plant: &Plant,
        prior: &TechnologyID,
        available: &[TechnologyID],
        constrained: &[TechnologyID],
        ranking: ranking::Ranking,
        choice: &TechnologyID,
        model: &Model,
    ) {
        let unavailable = model
            .switches
            .get(prior)
            .into_iter()
            .flatten()
            .filter(|technology| !available.contains(technology));
        for technology in unavailable {
            self.rank_records.push(RankRecord::excluded(
                year,
                &plant.id,
                prior,
                technology,
                ExclusionReason::Unavailable,
            ));
        }
        for technology in constrained {
            self.rank_records.push(RankRecord::excluded(
                year,
                &plant.id,
                prior,
                technology,
                ExclusionReason::ResourceConstraint,
            ));
        }
        for score in ranking.scores {
            self.rank_records.push(RankRecord {
                year,
                plant_id: plant.id.clone(),
                base_technology: prior.clone(),
                chosen: score.technology == *choice,
                technology: score.technology,
                tco: Some(score.tco.value()),
                abatement: Some(score.abatement.value()),
                tco_tier: score.tco_tier,
                abatement_tier: score.abatement_tier,
                score: Some(score.score),
                excluded: None,
            });
        }
    }
}

/// A projector sharing regional demand between the plants which are not closed
fn usage_projector<'a>(
    model: &'a Model,
    year: u32,
    plants: &[(&Plant, TechnologyID)],
) -> UsageProjector<'a> {
    let operating = plants
        .iter()
        .filter(|(_, prior)| !is_closed_technology(prior))
        .map(|(plant, _)| *plant);

    UsageProjector::new(year, operating, &model.business_cases, &model.steel_demand)
}

/// Simulate every year of the model without writing any output
pub fn simulate(model: &Model, scenario: Scenario) -> Result<SimulationContext> {
    let mut context = SimulationContext::new(model, scenario, false)?;
    for year in model.iter_years() {
        context.simulate_year(model, year)?;
    }

    Ok(context)
}

/// Run the simulation.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `scenario` - The scenario to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. candidate rankings) to file
pub fn run(
    model: &Model,
    scenario: Scenario,
    output_path: &Path,
    debug_model: bool,
) -> Result<SimulationContext> {
    info!("Running scenario '{}'", scenario.name);
    write_metadata(output_path, &model.model_path, &scenario)
        .context("Failed to save metadata")?;
    let mut writer = DataWriter::create(output_path, debug_model)?;
    let mut context = SimulationContext::new(model, scenario, debug_model)?;

    for year in model.iter_years() {
        let first_record = context.records.len();
        let first_rank_record = context.rank_records.len();
        context.simulate_year(model, year)?;

        writer.write_choices(year, context.choices.iter_year(year))?;
        writer.write_choice_records(&context.records[first_record..])?;
        writer.write_resource_usage(
            context
                .ledger
                .iter()
                .filter(|((_, entry_year, _), _)| *entry_year == year),
        )?;
        writer.write_rank_records(&context.rank_records[first_rank_record..])?;
    }

    writer.write_investment_cycles(context.tracker.iter())?;
    writer.flush()?;

    Ok(context)
}
