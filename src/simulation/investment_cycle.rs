//! Investment cycles determine the years in which each plant may change technology.
//!
//! A plant takes a regular ("main cycle") decision every `cycle_length` years. Between two main
//! decisions there is usually a window in which a transitional switch to a technology in the
//! same furnace family is allowed.
use crate::model::parameters::InvestmentCycleParameters;
use crate::plant::{PlantID, PlantMap};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;
use std::ops::{Range, RangeInclusive};

/// An entry in a plant's investment cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEntry {
    /// A year in which a main investment decision is taken
    Main(u32),
    /// Years in which a transitional switch is allowed
    Window(Range<u32>),
}

impl CycleEntry {
    /// The first year covered by the entry
    pub fn first_year(&self) -> u32 {
        match self {
            Self::Main(year) => *year,
            Self::Window(range) => range.start,
        }
    }
}

/// The type of decision a plant may take in a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SwitchType {
    /// A regular investment decision
    MainCycle,
    /// An optional off-cycle switch within the same furnace family
    TransSwitch,
    /// No decision is taken
    NoSwitch,
}

/// Draw the cycle length for a plant
pub fn draw_cycle_length<R: Rng>(
    rng: &mut R,
    params: &InvestmentCycleParameters,
    randomness: bool,
) -> u32 {
    if !randomness || params.variance == 0 {
        return params.base_length;
    }

    params.base_length - params.variance + rng.gen_range(0..=2 * params.variance)
}

/// Move decisions falling just after the net-zero target to the year before it
fn bring_forward(year: u32, params: &InvestmentCycleParameters) -> u32 {
    let target = params.net_zero_target;
    if year > target && year <= target + params.net_zero_variance {
        target.saturating_sub(1)
    } else {
        year
    }
}

/// The investment cycle of a single plant
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentCycle {
    cycle_length: u32,
    entries: Vec<CycleEntry>,
}

impl InvestmentCycle {
    /// Build the investment cycle for a plant.
    ///
    /// # Arguments
    ///
    /// * `start_year` - The year in which the plant started operating
    /// * `cycle_length` - Years between main investment decisions
    /// * `params` - Investment cycle parameters
    /// * `years` - The simulated years
    pub fn build(
        start_year: u32,
        cycle_length: u32,
        params: &InvestmentCycleParameters,
        years: RangeInclusive<u32>,
    ) -> Result<Self> {
        ensure!(cycle_length > 0, "Investment cycle length must be positive");
        let (model_start, model_end) = (*years.start(), *years.end());

        // Beyond this limit, bringing forward no longer changes a year
        let limit = model_end.max(params.net_zero_target + params.net_zero_variance);
        let mut main_years: Vec<u32> = Vec::new();
        let mut raw_year = start_year;
        while raw_year <= limit {
            let year = bring_forward(raw_year, params);
            if years.contains(&year) && main_years.last().is_none_or(|last| year > *last) {
                main_years.push(year);
            }
            raw_year += cycle_length;
        }

        // The first simulated year never forces a decision
        if main_years.first() == Some(&model_start) {
            main_years[0] = model_start + 1;
            if main_years.get(1) == Some(&main_years[0]) || main_years[0] > model_end {
                main_years.remove(0);
            }
        }

        let mut entries = Vec::new();
        let mut previous = None;
        for &year in &main_years {
            let window_start = previous.map_or(model_start, |prev: u32| {
                prev + params.offcycle_buffer_top.max(1)
            });
            let mut window_end = year.saturating_sub(params.offcycle_buffer_tail);
            let target = params.net_zero_target;
            if window_start < target && target < window_end {
                window_end = target;
            }
            entries.push(CycleEntry::Window(window_start..window_end));
            entries.push(CycleEntry::Main(year));
            previous = Some(year);
        }

        // Likewise for transitional windows
        for entry in &mut entries {
            if let CycleEntry::Window(range) = entry {
                if range.contains(&model_start) {
                    range.start = model_start + 1;
                }
            }
        }

        let mut cycle = Self {
            cycle_length,
            entries,
        };
        cycle.normalise();

        Ok(cycle)
    }

    /// Drop empty windows and keep entries in strictly increasing order
    fn normalise(&mut self) {
        self.entries.retain(|entry| match entry {
            CycleEntry::Main(_) => true,
            CycleEntry::Window(range) => !range.is_empty(),
        });
        self.entries.sort_by_key(CycleEntry::first_year);
        self.entries
            .dedup_by(|b, a| matches!((a, b), (CycleEntry::Main(x), CycleEntry::Main(y)) if x == y));

        // A window may not overlap the following main year
        let mut next_main = None;
        for entry in self.entries.iter_mut().rev() {
            match entry {
                CycleEntry::Main(year) => next_main = Some(*year),
                CycleEntry::Window(range) => {
                    if let Some(next_main) = next_main {
                        range.end = range.end.min(next_main);
                    }
                }
            }
        }

        self.entries.retain(|entry| match entry {
            CycleEntry::Main(_) => true,
            CycleEntry::Window(range) => !range.is_empty(),
        });
    }

    /// The number of years between main investment decisions
    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    /// The entries of the cycle, in order
    pub fn entries(&self) -> &[CycleEntry] {
        &self.entries
    }

    /// Iterate over the main-cycle years
    pub fn main_years(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            CycleEntry::Main(year) => Some(*year),
            CycleEntry::Window(_) => None,
        })
    }

    /// Classify `year` against the cycle
    pub fn switch_type(&self, year: u32) -> SwitchType {
        if self.main_years().any(|main| main == year) {
            return SwitchType::MainCycle;
        }

        let in_window = self.entries.iter().any(|entry| match entry {
            CycleEntry::Window(range) => range.contains(&year),
            CycleEntry::Main(_) => false,
        });
        if in_window {
            SwitchType::TransSwitch
        } else {
            SwitchType::NoSwitch
        }
    }

    /// Close the transitional window containing `year` so that no further off-cycle switch can
    /// happen before the next main decision
    pub fn rebase(&mut self, year: u32) {
        for entry in &mut self.entries {
            if let CycleEntry::Window(range) = entry {
                if range.contains(&year) {
                    range.end = year;
                }
            }
        }
        self.normalise();
    }

    /// Postpone all decisions from `year` onwards by one year.
    ///
    /// Main years pushed beyond `model_end` are dropped.
    pub fn defer(&mut self, year: u32, params: &InvestmentCycleParameters, model_end: u32) {
        for entry in &mut self.entries {
            match entry {
                CycleEntry::Main(main) if *main >= year => {
                    // Never bring a deferred decision forward to before the deferral
                    let shifted = bring_forward(*main + 1, params);
                    *main = if shifted > year { shifted } else { *main + 1 };
                }
                CycleEntry::Window(range) if range.start > year => {
                    *range = range.start + 1..range.end + 1;
                }
                CycleEntry::Window(range) if range.contains(&year) => range.end += 1,
                _ => {}
            }
        }
        self.entries.retain(|entry| match entry {
            CycleEntry::Main(main) => *main <= model_end,
            CycleEntry::Window(range) => range.start <= model_end,
        });
        self.normalise();
    }
}

/// The investment cycles of all plants in the model
#[derive(Debug, Clone)]
pub struct InvestmentCycleTracker {
    params: InvestmentCycleParameters,
    model_end: u32,
    cycles: IndexMap<PlantID, InvestmentCycle>,
}

impl InvestmentCycleTracker {
    /// Create investment cycles for all plants.
    ///
    /// Cycle lengths are drawn in plant roster order, so the cycles are reproducible for a given
    /// random number generator state.
    pub fn new<R: Rng>(
        plants: &PlantMap,
        params: &InvestmentCycleParameters,
        years: RangeInclusive<u32>,
        rng: &mut R,
        randomness: bool,
    ) -> Result<Self> {
        let cycles = plants
            .values()
            .map(|plant| {
                let cycle_length = draw_cycle_length(rng, params, randomness);
                let cycle = InvestmentCycle::build(
                    plant.start_of_operation,
                    cycle_length,
                    params,
                    years.clone(),
                )
                .with_context(|| format!("Invalid investment cycle for plant {}", plant.id))?;
                Ok((plant.id.clone(), cycle))
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            params: *params,
            model_end: *years.end(),
            cycles,
        })
    }

    /// Get the cycle for a plant
    pub fn get(&self, plant_id: &PlantID) -> Result<&InvestmentCycle> {
        self.cycles
            .get(plant_id)
            .with_context(|| format!("No investment cycle for plant {plant_id}"))
    }

    /// Classify `year` for a plant
    pub fn switch_type(&self, plant_id: &PlantID, year: u32) -> Result<SwitchType> {
        Ok(self.get(plant_id)?.switch_type(year))
    }

    /// Rebase a plant's cycle after a transitional switch in `year`
    pub fn rebase(&mut self, plant_id: &PlantID, year: u32) -> Result<()> {
        self.cycle_mut(plant_id)?.rebase(year);
        Ok(())
    }

    /// Postpone a plant's decisions from `year` by one year
    pub fn defer(&mut self, plant_id: &PlantID, year: u32) -> Result<()> {
        let (params, model_end) = (self.params, self.model_end);
        self.cycle_mut(plant_id)?.defer(year, &params, model_end);
        Ok(())
    }

    fn cycle_mut(&mut self, plant_id: &PlantID) -> Result<&mut InvestmentCycle> {
        self.cycles
            .get_mut(plant_id)
            .with_context(|| format!("No investment cycle for plant {plant_id}"))
    }

    /// Iterate over the cycles of all plants
    pub fn iter(&self) -> impl Iterator<Item = (&PlantID, &InvestmentCycle)> {
        self.cycles.iter()
    }
}
