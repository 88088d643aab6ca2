//! Steelmaking technologies, their availability and the switches allowed between them.
use crate::id::{define_id_getter, define_id_type};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::ops::Range;

define_id_type! {TechnologyID}
define_id_type! {FurnaceFamilyID}

/// The pseudo-technology recorded for plants which have been closed
pub const CLOSE_PLANT: &str = "Close plant";

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Technology>;

/// The technologies each technology may switch to (always including itself)
pub type SwitchTable = IndexMap<TechnologyID, IndexSet<TechnologyID>>;

/// Where a technology sits on the decarbonisation pathway
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechnologyPhase {
    /// Current-generation technologies (e.g. the average blast furnace)
    #[string = "initial"]
    Initial,
    /// Improved technologies which do not reach net zero on their own
    #[string = "transitional"]
    Transitional,
    /// Technologies compatible with a net-zero steel sector
    #[string = "end_state"]
    EndState,
}

impl TechnologyPhase {
    /// Whether a technology moratorium restricts new installations of this phase
    pub fn is_affected_by_moratorium(self) -> bool {
        self != TechnologyPhase::EndState
    }
}

/// A steelmaking technology
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Technology {
    /// Unique identifier (e.g. "BAT BF-BOF")
    pub id: TechnologyID,
    /// The family of furnaces this technology belongs to (e.g. `blast_furnace`)
    pub furnace_family: FurnaceFamilyID,
    /// Pathway classification
    pub phase: TechnologyPhase,
    /// First year in which the technology can be installed
    pub year_available_from: u32,
    /// Year from which the technology can no longer be installed
    pub year_available_until: Option<u32>,
}
define_id_getter! {Technology, TechnologyID}

impl Technology {
    /// The years in which this technology can be installed.
    ///
    /// # Arguments
    ///
    /// * `moratorium_year` - If a technology moratorium is in force, the year from which
    ///   non-end-state technologies can no longer be installed
    pub fn availability_window(&self, moratorium_year: Option<u32>) -> Range<u32> {
        let mut until = self.year_available_until.unwrap_or(u32::MAX);
        if self.phase.is_affected_by_moratorium() {
            if let Some(moratorium_year) = moratorium_year {
                until = until.min(moratorium_year);
            }
        }

        self.year_available_from..until
    }

    /// Whether the technology can be installed in `year`
    pub fn is_available(&self, year: u32, moratorium_year: Option<u32>) -> bool {
        self.availability_window(moratorium_year).contains(&year)
    }

    /// Whether this is an end-state technology
    pub fn is_end_state(&self) -> bool {
        self.phase == TechnologyPhase::EndState
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{avg_bf_bof, dri_eaf_h2};
    use rstest::rstest;

    #[rstest]
    #[case(2019, None, false)]
    #[case(2020, None, true)]
    #[case(2100, None, true)]
    #[case(2029, Some(2030), true)]
    #[case(2030, Some(2030), false)]
    #[case(2045, Some(2030), false)]
    fn test_is_available_initial(
        avg_bf_bof: Technology,
        #[case] year: u32,
        #[case] moratorium_year: Option<u32>,
        #[case] expected: bool,
    ) {
        assert_eq!(avg_bf_bof.is_available(year, moratorium_year), expected);
    }

    #[rstest]
    #[case(2029, None, false)]
    #[case(2030, None, true)]
    #[case(2045, Some(2030), true)]
    fn test_is_available_end_state(
        dri_eaf_h2: Technology,
        #[case] year: u32,
        #[case] moratorium_year: Option<u32>,
        #[case] expected: bool,
    ) {
        assert_eq!(dri_eaf_h2.is_available(year, moratorium_year), expected);
    }

    #[rstest]
    fn test_availability_window_with_end_year(mut avg_bf_bof: Technology) {
        avg_bf_bof.year_available_until = Some(2040);
        assert_eq!(avg_bf_bof.availability_window(None), 2020..2040);
        assert_eq!(avg_bf_bof.availability_window(Some(2030)), 2020..2030);
        assert_eq!(avg_bf_bof.availability_window(Some(2045)), 2020..2040);
    }
}
