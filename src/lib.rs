//! A technology-choice solver for simulating the transition of the steel industry.
//!
//! Each simulated year, plants reaching an investment decision choose the technology to operate
//! from those available to them, ranked by cost and emissions abatement and limited by the supply
//! of scarce resources such as scrap and biomass.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod batch;
pub mod cli;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod plant;
pub mod reference;
pub mod region;
pub mod resource;
pub mod settings;
pub mod simulation;
pub mod technology;
pub mod units;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the folder in which program configuration files are stored
pub fn get_steelsim_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("steelsim");

    path
}
