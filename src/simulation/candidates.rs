//! Generating the technologies a plant may switch to.
use crate::technology::{SwitchTable, Technology, TechnologyID, TechnologyMap};
use anyhow::{Context, Result};

/// Look up a technology, failing if it is not known
pub fn get_technology<'a>(
    technologies: &'a TechnologyMap,
    technology_id: &TechnologyID,
) -> Result<&'a Technology> {
    technologies
        .get(technology_id)
        .with_context(|| format!("Unknown technology {technology_id}"))
}

/// The technologies a plant operating `base_tech` may choose in `year`.
///
/// # Arguments
///
/// * `technologies` - All technologies in the model
/// * `switches` - The technologies each technology may switch to
/// * `base_tech` - The technology the plant currently operates
/// * `year` - The year of the decision
/// * `transitional_only` - Whether this is an off-cycle switch, which cannot leave the furnace
///   family of `base_tech` (unless it is already an end-state technology)
/// * `moratorium_year` - The moratorium year, if a technology moratorium is in force
///
/// # Returns
///
/// The candidates in the order given by the switch table. The current technology is appended if
/// it was filtered out and either this is an off-cycle switch (where staying put is always an
/// option) or nothing else remains, so the result is never empty.
pub fn candidates(
    technologies: &TechnologyMap,
    switches: &SwitchTable,
    base_tech: &TechnologyID,
    year: u32,
    transitional_only: bool,
    moratorium_year: Option<u32>,
) -> Result<Vec<TechnologyID>> {
    let base = get_technology(technologies, base_tech)?;
    let allowed = switches
        .get(base_tech)
        .with_context(|| format!("No technology switches defined for {base_tech}"))?;

    let mut candidates = Vec::new();
    for candidate_id in allowed {
        let candidate = get_technology(technologies, candidate_id)?;
        if transitional_only
            && !base.is_end_state()
            && candidate.furnace_family != base.furnace_family
        {
            continue;
        }

        let keep = candidate.is_available(year, moratorium_year)
            // The current technology is kept if data say it is not yet available
            || (candidate_id == base_tech && year < base.year_available_from);
        if keep {
            candidates.push(candidate_id.clone());
        }
    }

    if !candidates.contains(base_tech) && (transitional_only || candidates.is_empty()) {
        candidates.push(base_tech.clone());
    }

    Ok(candidates)
}
