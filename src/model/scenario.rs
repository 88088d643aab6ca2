//! Scenario settings: the policy and solver options for a model run.
use crate::input::{input_err_msg, read_toml};
use crate::units::Capacity;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

/// The default file name for a batch of scenarios
pub const SCENARIOS_FILE_NAME: &str = "scenarios.toml";

fn default_scenario_name() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_runs_per_scenario() -> u32 {
    1
}

/// Presets for the relative weight of cost and emissions when ranking technologies
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum TechSwitchScenario {
    /// Only emissions abatement matters
    #[string = "max_abatement"]
    MaxAbatement,
    /// Only cost matters
    #[string = "lowest_cost"]
    LowestCost,
    /// Cost and abatement are weighted equally
    #[default]
    #[string = "equal_weight"]
    EqualWeight,
}

impl TechSwitchScenario {
    /// The weights for this preset
    pub fn weights(self) -> Weights {
        match self {
            Self::MaxAbatement => Weights {
                tco: 0.0,
                emissions: 1.0,
            },
            Self::LowestCost => Weights {
                tco: 1.0,
                emissions: 0.0,
            },
            Self::EqualWeight => Weights {
                tco: 0.5,
                emissions: 0.5,
            },
        }
    }
}

/// How candidate technologies are scored
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum SolverLogic {
    /// Bucket TCO and abatement into tiers and combine the tier numbers
    #[default]
    #[string = "ranked"]
    Ranked,
    /// Normalise TCO and abatement and combine the scaled values
    #[string = "scaled"]
    Scaled,
}

/// Relative weight of cost and emissions in a technology choice
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Weights {
    /// Weight applied to the TCO score
    pub tco: f64,
    /// Weight applied to the abatement score
    pub emissions: f64,
}

/// Settings for a single scenario
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Scenario {
    /// Scenario name, used for output folders
    #[serde(default = "default_scenario_name")]
    pub name: String,
    /// Whether non-end-state technologies stop being available after the moratorium year
    #[serde(default = "default_true")]
    pub tech_moratorium: bool,
    /// Whether plants may switch technology between main investment cycles
    #[serde(default = "default_true")]
    pub transitional_switch: bool,
    /// Weighting preset
    #[serde(default)]
    pub tech_switch_scenario: TechSwitchScenario,
    /// Overrides the TCO weight of the preset
    pub tco_weight: Option<f64>,
    /// Overrides the emissions weight of the preset
    pub emissions_weight: Option<f64>,
    /// How candidates are scored
    #[serde(default)]
    pub solver_logic: SolverLogic,
    /// Whether resource budgets restrict technology choices
    #[serde(default = "default_true")]
    pub enforce_constraints: bool,
    /// Seed for all random draws in the run
    #[serde(default)]
    pub random_seed: u64,
    /// Whether switching plants are processed in a random order each year
    #[serde(default = "default_true")]
    pub randomise_switch_order: bool,
    /// Whether investment cycle lengths vary randomly between plants
    #[serde(default = "default_true")]
    pub investment_cycle_randomness: bool,
    /// Maximum capacity which may change technology in a single year
    pub switch_capacity_limit: Option<Capacity>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_scenario_name(),
            tech_moratorium: true,
            transitional_switch: true,
            tech_switch_scenario: TechSwitchScenario::default(),
            tco_weight: None,
            emissions_weight: None,
            solver_logic: SolverLogic::default(),
            enforce_constraints: true,
            random_seed: 0,
            randomise_switch_order: true,
            investment_cycle_randomness: true,
            switch_capacity_limit: None,
        }
    }
}

impl Scenario {
    /// The weights used to rank technologies, with explicit values overriding the preset
    pub fn weights(&self) -> Weights {
        let preset = self.tech_switch_scenario.weights();
        Weights {
            tco: self.tco_weight.unwrap_or(preset.tco),
            emissions: self.emissions_weight.unwrap_or(preset.emissions),
        }
    }

    /// Check that the scenario settings are valid
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "Scenario name cannot be empty");

        let weights = self.weights();
        ensure!(
            [weights.tco, weights.emissions]
                .iter()
                .all(|w| w.is_finite() && *w >= 0.0),
            "Scenario {}: weights must be finite and non-negative",
            self.name
        );
        ensure!(
            weights.tco > 0.0 || weights.emissions > 0.0,
            "Scenario {}: TCO and emissions weights cannot both be zero",
            self.name
        );

        if let Some(limit) = self.switch_capacity_limit {
            ensure!(
                limit.is_finite() && limit >= Capacity(0.0),
                "Scenario {}: switch_capacity_limit must be a finite non-negative number",
                self.name
            );
        }

        Ok(())
    }
}

/// A set of scenarios to run as a batch
#[derive(Debug, Deserialize, PartialEq)]
pub struct ScenarioBatch {
    /// How many times to run each scenario, with successive random seeds
    #[serde(default = "default_runs_per_scenario")]
    pub runs_per_scenario: u32,
    /// The scenarios to run
    pub scenarios: Vec<Scenario>,
}

impl ScenarioBatch {
    /// Read a batch of scenarios from a TOML file
    pub fn from_path(file_path: &Path) -> Result<Self> {
        let batch: ScenarioBatch = read_toml(file_path)?;
        batch
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(batch)
    }

    /// Check that the batch is valid
    fn validate(&self) -> Result<()> {
        ensure!(!self.scenarios.is_empty(), "No scenarios provided");
        ensure!(
            self.runs_per_scenario > 0,
            "runs_per_scenario must be at least 1"
        );
        ensure!(
            self.scenarios.iter().map(|s| &s.name).all_unique(),
            "Scenario names must be unique"
        );
        for scenario in &self.scenarios {
            scenario.validate()?;
        }

        Ok(())
    }

    /// Iterate over every scenario run in the batch, with the seed for each run applied
    pub fn runs(&self) -> impl Iterator<Item = (u32, Scenario)> + '_ {
        self.scenarios.iter().flat_map(move |scenario| {
            (0..self.runs_per_scenario).map(move |run| {
                let mut scenario = scenario.clone();
                scenario.random_seed = scenario.random_seed.wrapping_add(u64::from(run));
                (run, scenario)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    #[case(TechSwitchScenario::MaxAbatement, None, None, 0.0, 1.0)]
    #[case(TechSwitchScenario::LowestCost, None, None, 1.0, 0.0)]
    #[case(TechSwitchScenario::EqualWeight, None, None, 0.5, 0.5)]
    #[case(TechSwitchScenario::EqualWeight, Some(0.2), None, 0.2, 0.5)]
    #[case(TechSwitchScenario::LowestCost, Some(0.3), Some(0.7), 0.3, 0.7)]
    fn test_weights(
        #[case] preset: TechSwitchScenario,
        #[case] tco_weight: Option<f64>,
        #[case] emissions_weight: Option<f64>,
        #[case] expected_tco: f64,
        #[case] expected_emissions: f64,
    ) {
        let scenario = Scenario {
            tech_switch_scenario: preset,
            tco_weight,
            emissions_weight,
            ..Scenario::default()
        };
        assert_eq!(
            scenario.weights(),
            Weights {
                tco: expected_tco,
                emissions: expected_emissions
            }
        );
    }

    #[rstest]
    #[case(Some(0.0), Some(0.0), "Scenario default: TCO and emissions weights cannot both be zero")]
    #[case(
        Some(-1.0),
        None,
        "Scenario default: weights must be finite and non-negative"
    )]
    #[case(
        Some(f64::NAN),
        None,
        "Scenario default: weights must be finite and non-negative"
    )]
    fn test_validate_invalid_weights(
        #[case] tco_weight: Option<f64>,
        #[case] emissions_weight: Option<f64>,
        #[case] msg: &str,
    ) {
        let scenario = Scenario {
            tco_weight,
            emissions_weight,
            ..Scenario::default()
        };
        assert_error!(scenario.validate(), msg);
    }

    #[test]
    fn test_batch_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SCENARIOS_FILE_NAME);
        fs::write(
            &file_path,
            "runs_per_scenario = 2

[[scenarios]]
name = \"baseline\"
random_seed = 10

[[scenarios]]
name = \"fast_abatement\"
tech_switch_scenario = \"max_abatement\"
solver_logic = \"scaled\"
",
        )
        .unwrap();

        let batch = ScenarioBatch::from_path(&file_path).unwrap();
        assert_eq!(batch.scenarios.len(), 2);
        assert_eq!(batch.scenarios[1].solver_logic, SolverLogic::Scaled);

        let runs: Vec<_> = batch
            .runs()
            .map(|(run, s)| (s.name, run, s.random_seed))
            .collect();
        assert_eq!(
            runs,
            [
                ("baseline".to_string(), 0, 10),
                ("baseline".to_string(), 1, 11),
                ("fast_abatement".to_string(), 0, 0),
                ("fast_abatement".to_string(), 1, 1),
            ]
        );
    }

    #[test]
    fn test_batch_duplicate_names() {
        let batch = ScenarioBatch {
            runs_per_scenario: 1,
            scenarios: vec![Scenario::default(), Scenario::default()],
        };
        assert_error!(batch.validate(), "Scenario names must be unique");
    }
}
