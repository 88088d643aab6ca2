//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::model::scenario::Scenario;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_tech_moratorium_year, u32, 2030);
define_param_default!(default_cycle_base_length, u32, 20);
define_param_default!(default_cycle_variance, u32, 3);
define_param_default!(default_offcycle_buffer_top, u32, 3);
define_param_default!(default_offcycle_buffer_tail, u32, 8);
define_param_default!(default_net_zero_target, u32, 2050);
define_param_default!(default_net_zero_variance, u32, 3);
define_param_default!(default_tco_tier_1_scaler, f64, 1.1);
define_param_default!(default_tco_tier_2_scaler, f64, 1.3);
// Abatement of Avg BF-BOF -> BAT BF-BOF+CCUS
define_param_default!(default_abatement_tier_1_threshold, f64, 2.376_564_616_063_11);
// Abatement of Avg BF-BOF -> BAT BF-BOF_bio PCI
define_param_default!(default_abatement_tier_2_threshold, f64, 0.932_690_243_851_946);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelParameters {
    /// The first simulated year
    pub start_year: u32,
    /// The last simulated year
    pub end_year: u32,
    /// The year from which a technology moratorium stops new non-end-state installations
    #[serde(default = "default_tech_moratorium_year")]
    pub tech_moratorium_year: u32,
    /// Parameters for generating investment cycles
    #[serde(default)]
    pub investment_cycle: InvestmentCycleParameters,
    /// Thresholds for ranking candidate technologies
    #[serde(default)]
    pub ranking: RankingParameters,
    /// The scenario run by default
    #[serde(default)]
    pub scenario: Scenario,
}

/// Parameters controlling when plants take investment decisions
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
pub struct InvestmentCycleParameters {
    /// Average number of years between main investment decisions
    #[serde(default = "default_cycle_base_length")]
    pub base_length: u32,
    /// Maximum random deviation from `base_length`
    #[serde(default = "default_cycle_variance")]
    pub variance: u32,
    /// Years after a main decision before an off-cycle switch may happen
    #[serde(default = "default_offcycle_buffer_top")]
    pub offcycle_buffer_top: u32,
    /// Years before the next main decision in which no off-cycle switch may happen
    #[serde(default = "default_offcycle_buffer_tail")]
    pub offcycle_buffer_tail: u32,
    /// The year by which the sector should reach net zero
    #[serde(default = "default_net_zero_target")]
    pub net_zero_target: u32,
    /// Decisions falling up to this many years after the net-zero target are brought forward
    #[serde(default = "default_net_zero_variance")]
    pub net_zero_variance: u32,
}

impl Default for InvestmentCycleParameters {
    fn default() -> Self {
        Self {
            base_length: default_cycle_base_length(),
            variance: default_cycle_variance(),
            offcycle_buffer_top: default_offcycle_buffer_top(),
            offcycle_buffer_tail: default_offcycle_buffer_tail(),
            net_zero_target: default_net_zero_target(),
            net_zero_variance: default_net_zero_variance(),
        }
    }
}

/// Thresholds used to bucket candidates into tiers
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
pub struct RankingParameters {
    /// Candidates with a TCO within this multiple of the cheapest are in the first tier
    #[serde(default = "default_tco_tier_1_scaler")]
    pub tco_tier_1_scaler: f64,
    /// Candidates with a TCO within this multiple of the cheapest are in the second tier
    #[serde(default = "default_tco_tier_2_scaler")]
    pub tco_tier_2_scaler: f64,
    /// Candidates abating at least this much are in the first tier
    #[serde(default = "default_abatement_tier_1_threshold")]
    pub abatement_tier_1_threshold: f64,
    /// Candidates abating at least this much are in the second tier
    #[serde(default = "default_abatement_tier_2_threshold")]
    pub abatement_tier_2_threshold: f64,
}

impl Default for RankingParameters {
    fn default() -> Self {
        Self {
            tco_tier_1_scaler: default_tco_tier_1_scaler(),
            tco_tier_2_scaler: default_tco_tier_2_scaler(),
            abatement_tier_1_threshold: default_abatement_tier_1_threshold(),
            abatement_tier_2_threshold: default_abatement_tier_2_threshold(),
        }
    }
}

/// Check that the model years are valid
fn check_years(start_year: u32, end_year: u32) -> Result<()> {
    ensure!(
        start_year <= end_year,
        "`start_year` must not be after `end_year`"
    );

    Ok(())
}

/// Check that the investment cycle parameters are valid
fn check_investment_cycle(params: &InvestmentCycleParameters) -> Result<()> {
    ensure!(
        params.base_length > params.variance,
        "investment cycle `base_length` must be greater than `variance`"
    );
    ensure!(
        params.net_zero_target > 0,
        "investment cycle `net_zero_target` must be a positive year"
    );

    Ok(())
}

/// Check that the ranking parameters are valid
fn check_ranking(params: &RankingParameters) -> Result<()> {
    ensure!(
        [
            params.tco_tier_1_scaler,
            params.tco_tier_2_scaler,
            params.abatement_tier_1_threshold,
            params.abatement_tier_2_threshold
        ]
        .iter()
        .all(|value| value.is_finite()),
        "ranking parameters must be finite numbers"
    );
    ensure!(
        params.tco_tier_1_scaler >= 1.0 && params.tco_tier_2_scaler >= params.tco_tier_1_scaler,
        "TCO scalers must satisfy 1 <= `tco_tier_1_scaler` <= `tco_tier_2_scaler`"
    );
    ensure!(
        params.abatement_tier_1_threshold >= params.abatement_tier_2_threshold,
        "`abatement_tier_1_threshold` must not be less than `abatement_tier_2_threshold`"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        check_years(self.start_year, self.end_year)?;
        check_investment_cycle(&self.investment_cycle)?;
        check_ranking(&self.ranking)?;
        self.scenario.validate()?;

        Ok(())
    }

    /// The simulated years
    pub fn years(&self) -> std::ops::RangeInclusive<u32> {
        self.start_year..=self.end_year
    }

    /// The moratorium year to apply for a scenario, if any
    pub fn moratorium_year(&self, scenario: &Scenario) -> Option<u32> {
        scenario.tech_moratorium.then_some(self.tech_moratorium_year)
    }
}
