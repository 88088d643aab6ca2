//! Ranking candidate technologies by cost and emissions abatement.
use crate::model::parameters::RankingParameters;
use crate::model::scenario::{SolverLogic, Weights};
use crate::technology::TechnologyID;
use crate::units::{EmissionsPerTonne, MoneyPerTonne};
use anyhow::{Result, ensure};
use float_cmp::approx_eq;

/// Scores within this tolerance of each other are considered tied
const SCORE_TOLERANCE: f64 = 1e-9;

/// The evaluation of a single candidate technology
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    /// The candidate technology
    pub technology: TechnologyID,
    /// Total cost of ownership of switching to the candidate
    pub tco: MoneyPerTonne,
    /// Emissions abated by switching to the candidate
    pub abatement: EmissionsPerTonne,
    /// TCO tier (ranked logic only)
    pub tco_tier: Option<u8>,
    /// Abatement tier (ranked logic only)
    pub abatement_tier: Option<u8>,
    /// Combined score (lower is better)
    pub score: f64,
}

/// The outcome of ranking a set of candidates
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// The chosen technology
    pub best: TechnologyID,
    /// The scores of all candidates, in the order they were given
    pub scores: Vec<CandidateScore>,
}

/// The TCO value bounding a tier: `scaler` times the cheapest TCO, measured from the cheapest
fn tco_threshold(min_tco: f64, scaler: f64) -> f64 {
    min_tco + min_tco.abs() * (scaler - 1.0)
}

/// Bucket a TCO value into a tier relative to the cheapest candidate
pub fn tco_tier(tco: MoneyPerTonne, min_tco: MoneyPerTonne, params: &RankingParameters) -> u8 {
    let (tco, min_tco) = (tco.value(), min_tco.value());
    if tco <= tco_threshold(min_tco, params.tco_tier_1_scaler) {
        1
    } else if tco <= tco_threshold(min_tco, params.tco_tier_2_scaler) {
        2
    } else {
        3
    }
}

/// Bucket an abatement value into a tier using absolute thresholds
pub fn abatement_tier(abatement: EmissionsPerTonne, params: &RankingParameters) -> u8 {
    let abatement = abatement.value();
    if abatement >= params.abatement_tier_1_threshold {
        1
    } else if abatement >= params.abatement_tier_2_threshold {
        2
    } else {
        3
    }
}

/// Divide each value by the Euclidean norm of all values (zero if the norm is zero)
fn scale_by_norm(values: &[f64]) -> Vec<f64> {
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| v / norm).collect()
}

/// Score candidates by their TCO and abatement tiers
fn score_ranked(
    candidates: &[(TechnologyID, MoneyPerTonne, EmissionsPerTonne)],
    weights: Weights,
    params: &RankingParameters,
) -> Vec<CandidateScore> {
    let min_tco = candidates
        .iter()
        .map(|(_, tco, _)| *tco)
        .reduce(|a, b| if b < a { b } else { a })
        .unwrap_or_default();

    candidates
        .iter()
        .map(|(technology, tco, abatement)| {
            let tco_tier = tco_tier(*tco, min_tco, params);
            let abatement_tier = abatement_tier(*abatement, params);
            CandidateScore {
                technology: technology.clone(),
                tco: *tco,
                abatement: *abatement,
                tco_tier: Some(tco_tier),
                abatement_tier: Some(abatement_tier),
                score: weights.tco * f64::from(tco_tier)
                    + weights.emissions * f64::from(abatement_tier),
            }
        })
        .collect()
}

/// Score candidates by their TCO and abatement, each normalised across the candidates
fn score_scaled(
    candidates: &[(TechnologyID, MoneyPerTonne, EmissionsPerTonne)],
    weights: Weights,
) -> Vec<CandidateScore> {
    let tco: Vec<_> = candidates.iter().map(|(_, tco, _)| tco.value()).collect();
    let abatement: Vec<_> = candidates.iter().map(|(_, _, a)| a.value()).collect();
    let tco_scaled = scale_by_norm(&tco);
    let abatement_scaled = scale_by_norm(&abatement);

    candidates
        .iter()
        .zip(tco_scaled.into_iter().zip(abatement_scaled))
        .map(
            |((technology, tco, abatement), (tco_scaled, abatement_scaled))| CandidateScore {
                technology: technology.clone(),
                tco: *tco,
                abatement: *abatement,
                tco_tier: None,
                abatement_tier: None,
                // More abatement is better, so reverse it
                score: weights.tco * tco_scaled + weights.emissions * (1.0 - abatement_scaled),
            },
        )
        .collect()
}

/// Pick the best-scoring candidate.
///
/// Ties are broken in favour of `base_tech`, then by technology ID.
fn pick_best<'a>(scores: &'a [CandidateScore], base_tech: &TechnologyID) -> &'a CandidateScore {
    let min_score = scores
        .iter()
        .map(|s| s.score)
        .fold(f64::INFINITY, f64::min);
    let tied = || {
        scores
            .iter()
            .filter(move |s| approx_eq!(f64, s.score, min_score, epsilon = SCORE_TOLERANCE))
    };

    tied()
        .find(|s| s.technology == *base_tech)
        .or_else(|| tied().min_by(|a, b| a.technology.cmp(&b.technology)))
        .unwrap_or(&scores[0])
}

/// Choose the best technology among `candidates`.
///
/// # Arguments
///
/// * `candidates` - Technologies to choose between
/// * `base_tech` - The technology the plant currently operates
/// * `tco_lookup` - Gives the TCO of switching to a candidate
/// * `abatement_lookup` - Gives the emissions abated by switching to a candidate
/// * `weights` - Relative weight of cost and abatement
/// * `logic` - How candidates are scored
/// * `params` - Tier thresholds
pub fn best_choice<T, A>(
    candidates: &[TechnologyID],
    base_tech: &TechnologyID,
    tco_lookup: T,
    abatement_lookup: A,
    weights: Weights,
    logic: SolverLogic,
    params: &RankingParameters,
) -> Result<Ranking>
where
    T: Fn(&TechnologyID) -> Result<MoneyPerTonne>,
    A: Fn(&TechnologyID) -> Result<EmissionsPerTonne>,
{
    ensure!(
        !candidates.is_empty(),
        "No candidate technologies to choose from for {base_tech}"
    );

    let values = candidates
        .iter()
        .map(|technology| {
            Ok((
                technology.clone(),
                tco_lookup(technology)?,
                abatement_lookup(technology)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let scores = match logic {
        SolverLogic::Ranked => score_ranked(&values, weights, params),
        SolverLogic::Scaled => score_scaled(&values, weights),
    };
    let best = pick_best(&scores, base_tech).technology.clone();

    Ok(Ranking { best, scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;

    #[fixture]
    fn params() -> RankingParameters {
        RankingParameters::default()
    }

    const COST: Weights = Weights {
        tco: 1.0,
        emissions: 0.0,
    };

    const EQUAL: Weights = Weights {
        tco: 0.5,
        emissions: 0.5,
    };

    /// Run `best_choice` with values from a table of (technology, tco, abatement)
    fn choose(
        table: &[(&str, f64, f64)],
        base: &str,
        weights: Weights,
        logic: SolverLogic,
    ) -> Result<Ranking> {
        let values: HashMap<TechnologyID, (f64, f64)> = table
            .iter()
            .map(|(id, tco, abatement)| ((*id).into(), (*tco, *abatement)))
            .collect();
        let candidates: Vec<TechnologyID> = table.iter().map(|(id, _, _)| (*id).into()).collect();
        best_choice(
            &candidates,
            &base.into(),
            |t| Ok(MoneyPerTonne(values[t].0)),
            |t| Ok(EmissionsPerTonne(values[t].1)),
            weights,
            logic,
            &RankingParameters::default(),
        )
    }

    #[rstest]
    #[case(100.0, 1)]
    #[case(110.0, 1)]
    #[case(111.0, 2)]
    #[case(130.0, 2)]
    #[case(131.0, 3)]
    fn test_tco_tier(params: RankingParameters, #[case] tco: f64, #[case] expected: u8) {
        assert_eq!(
            tco_tier(MoneyPerTonne(tco), MoneyPerTonne(100.0), &params),
            expected
        );
    }

    #[rstest]
    #[case(-100.0, 1)]
    #[case(-91.0, 1)]
    #[case(-85.0, 2)]
    #[case(-60.0, 3)]
    fn test_tco_tier_negative_min(
        params: RankingParameters,
        #[case] tco: f64,
        #[case] expected: u8,
    ) {
        assert_eq!(
            tco_tier(MoneyPerTonne(tco), MoneyPerTonne(-100.0), &params),
            expected
        );
    }

    #[rstest]
    #[case(3.0, 1)]
    #[case(2.376_564_616_063_11, 1)]
    #[case(1.0, 2)]
    #[case(0.5, 3)]
    #[case(-1.0, 3)]
    fn test_abatement_tier(params: RankingParameters, #[case] abatement: f64, #[case] expected: u8) {
        assert_eq!(
            abatement_tier(EmissionsPerTonne(abatement), &params),
            expected
        );
    }

    #[test]
    fn test_best_choice_cheapest() {
        let table = [("A", 150.0, 0.0), ("B", 100.0, 0.0), ("C", 200.0, 0.0)];
        let ranking = choose(&table, "A", COST, SolverLogic::Ranked).unwrap();
        assert_eq!(ranking.best, "B".into());
        assert_eq!(ranking.scores[0].tco_tier, Some(3));
        assert_eq!(ranking.scores[1].tco_tier, Some(1));
    }

    #[test]
    fn test_best_choice_combined() {
        // B is cheapest but C abates far more for a modest extra cost
        let table = [("A", 100.0, 0.0), ("B", 95.0, 0.5), ("C", 120.0, 3.0)];
        let ranking = choose(&table, "A", EQUAL, SolverLogic::Ranked).unwrap();
        assert_eq!(ranking.best, "C".into());
    }

    #[test]
    fn test_best_choice_prefers_base_on_tie() {
        let table = [("A", 100.0, 0.0), ("B", 105.0, 0.0)];
        let ranking = choose(&table, "B", COST, SolverLogic::Ranked).unwrap();
        assert_eq!(ranking.best, "B".into());
    }

    #[test]
    fn test_best_choice_lexicographic_tie_break() {
        let table = [("Z", 100.0, 0.0), ("M", 101.0, 0.0), ("A", 109.0, 0.0)];
        let ranking = choose(&table, "Q", COST, SolverLogic::Ranked).unwrap();
        assert_eq!(ranking.best, "A".into());

        // Candidate order doesn't matter
        let table = [("A", 109.0, 0.0), ("M", 101.0, 0.0), ("Z", 100.0, 0.0)];
        let ranking = choose(&table, "Q", COST, SolverLogic::Ranked).unwrap();
        assert_eq!(ranking.best, "A".into());
    }

    #[test]
    fn test_best_choice_deterministic() {
        let table = [("A", 100.0, 1.0), ("B", 120.0, 2.5), ("C", 90.0, 0.0)];
        let first = choose(&table, "A", EQUAL, SolverLogic::Ranked).unwrap();
        for _ in 0..10 {
            assert_eq!(choose(&table, "A", EQUAL, SolverLogic::Ranked).unwrap(), first);
        }
    }

    #[test]
    fn test_best_choice_scaled() {
        let table = [("A", 100.0, 0.0), ("B", 90.0, 0.0), ("C", 300.0, 3.0)];
        let ranking = choose(&table, "A", COST, SolverLogic::Scaled).unwrap();
        assert_eq!(ranking.best, "B".into());
        assert!(ranking.scores.iter().all(|s| s.tco_tier.is_none()));

        let abatement_only = Weights {
            tco: 0.0,
            emissions: 1.0,
        };
        let ranking = choose(&table, "A", abatement_only, SolverLogic::Scaled).unwrap();
        assert_eq!(ranking.best, "C".into());
    }

    #[test]
    fn test_best_choice_empty() {
        assert_error!(
            choose(&[], "A", COST, SolverLogic::Ranked),
            "No candidate technologies to choose from for A"
        );
    }

    #[test]
    fn test_scale_by_norm_zero() {
        assert_eq!(scale_by_norm(&[0.0, 0.0]), [0.0, 0.0]);
    }
}
