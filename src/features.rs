use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{PlayerRecord, RatingObservation, Tier, TournamentResult};

/// All-time-high composite fantasy score used to scale `frac_of_reference`.
pub const DEFAULT_REFERENCE_SCORE: f64 = 3464.0;

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Place -> base fantasy points, keyed verbatim by the place text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsMap {
    points: HashMap<String, f64>,
}

impl PointsMap {
    pub fn new(points: HashMap<String, f64>) -> Self {
        Self { points }
    }

    /// Build from a JSON object; numeric strings are accepted as values,
    /// anything else is skipped.
    pub fn from_json(value: &Value) -> Self {
        let mut points = HashMap::new();
        if let Some(map) = value.as_object() {
            for (key, v) in map {
                let parsed = match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                if let Some(p) = parsed {
                    points.insert(key.trim().to_string(), p);
                }
            }
        }
        Self { points }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.points.get(key).copied()
    }

    pub fn for_position(&self, position: u32) -> Option<f64> {
        self.get(&position.to_string())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PointsMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Blend weights for the composite fantasy score. Used as given; keeping
/// `recent + prior <= 1` is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeWeights {
    pub recent: f64,
    pub prior: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            recent: 0.65,
            prior: 0.35,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingConfig {
    pub decay_rate: f64,
    pub horizon_years: f64,
    /// Defaults to the player's latest eligible observation.
    pub reference_date: Option<NaiveDate>,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.1,
            horizon_years: 3.0,
            reference_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    pub years: Vec<i32>,
    pub points_map: PointsMap,
    pub weights: CompositeWeights,
    pub reference_score: f64,
    pub rating: RatingConfig,
}

impl FeatureConfig {
    pub fn new(years: Vec<i32>, points_map: PointsMap) -> Self {
        let mut years = years;
        years.sort_unstable();
        years.dedup();
        Self {
            years,
            points_map,
            weights: CompositeWeights::default(),
            reference_score: DEFAULT_REFERENCE_SCORE,
            rating: RatingConfig::default(),
        }
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub fantasy_points_by_year: BTreeMap<i32, f64>,
    pub composite_fantasy_points: f64,
    pub frac_of_reference: f64,
    /// `None` when no eligible observation falls inside the horizon.
    pub composite_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTournament {
    pub date: NaiveDate,
    pub tournament_name: String,
    pub tier: Tier,
    pub place: String,
    pub points: f64,
}

pub fn compute_features(record: &PlayerRecord, cfg: &FeatureConfig) -> FeatureRow {
    let fantasy_points_by_year = cfg
        .years
        .iter()
        .map(|year| {
            (
                *year,
                fantasy_points_for_year(&record.tournaments, &cfg.points_map, *year),
            )
        })
        .collect();
    let composite = match cfg.latest_year() {
        Some(latest) => {
            composite_fantasy_points(&record.tournaments, &cfg.points_map, latest, cfg.weights)
        }
        None => 0.0,
    };
    FeatureRow {
        fantasy_points_by_year,
        composite_fantasy_points: composite,
        frac_of_reference: frac_of_reference(composite, cfg.reference_score),
        composite_rating: composite_rating(&record.ratings, &cfg.rating),
    }
}

pub fn tournament_points(result: &TournamentResult, points_map: &PointsMap) -> f64 {
    if !result.tier.is_scoring() {
        return 0.0;
    }
    let base = result
        .place
        .position()
        .and_then(|pos| points_map.for_position(pos))
        .unwrap_or(0.0);
    base * result.tier.scoring_multiplier()
}

pub fn fantasy_points_for_year(
    tournaments: &[TournamentResult],
    points_map: &PointsMap,
    year: i32,
) -> f64 {
    tournaments
        .iter()
        .filter(|t| t.tier.is_scoring() && t.date.year() == year)
        .map(|t| tournament_points(t, points_map))
        .sum()
}

pub fn composite_fantasy_points(
    tournaments: &[TournamentResult],
    points_map: &PointsMap,
    latest_year: i32,
    weights: CompositeWeights,
) -> f64 {
    let recent = fantasy_points_for_year(tournaments, points_map, latest_year);
    let prior = fantasy_points_for_year(tournaments, points_map, latest_year - 1);
    weights.recent * recent + weights.prior * prior
}

pub fn frac_of_reference(composite: f64, reference: f64) -> f64 {
    composite / reference
}

/// Decay weight for an observation `age_years` before the reference date.
/// Anything past the horizon is cut to exactly zero.
pub fn observation_weight(age_years: f64, cfg: &RatingConfig) -> f64 {
    if age_years < 0.0 || age_years > cfg.horizon_years {
        return 0.0;
    }
    (-cfg.decay_rate * age_years).exp()
}

pub fn composite_rating(ratings: &[RatingObservation], cfg: &RatingConfig) -> Option<f64> {
    let eligible: Vec<&RatingObservation> = ratings
        .iter()
        .filter(|r| r.tier.is_rating_eligible())
        .collect();
    let reference = cfg
        .reference_date
        .or_else(|| eligible.iter().map(|r| r.date).max())?;

    let mut weighted = 0.0;
    let mut total = 0.0;
    for obs in eligible {
        let age_secs = (reference - obs.date).num_seconds() as f64;
        let weight = observation_weight(age_secs / SECONDS_PER_YEAR, cfg);
        weighted += weight * obs.rating;
        total += weight;
    }
    if total <= 0.0 {
        return None;
    }
    Some(round1(weighted / total))
}

/// Round ratings filtered by tier and a strict `date > after` cutoff.
pub fn rating_values(
    ratings: &[RatingObservation],
    tiers: Option<&[Tier]>,
    after: Option<NaiveDate>,
) -> Vec<f64> {
    ratings
        .iter()
        .filter(|r| after.is_none_or(|cutoff| r.date > cutoff))
        .filter(|r| tiers.is_none_or(|tiers| tiers.contains(&r.tier)))
        .map(|r| r.rating)
        .collect()
}

/// Per-tournament points in date order.
pub fn scoring_history(
    tournaments: &[TournamentResult],
    points_map: &PointsMap,
) -> Vec<ScoredTournament> {
    tournaments
        .iter()
        .map(|t| ScoredTournament {
            date: t.date,
            tournament_name: t.tournament_name.clone(),
            tier: t.tier.clone(),
            place: t.place.to_string(),
            points: tournament_points(t, points_map),
        })
        .collect()
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Place;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn result(place: Place, tier: Tier, d: NaiveDate) -> TournamentResult {
        TournamentResult {
            date: d,
            place,
            tier,
            tournament_name: "Test Open".to_string(),
        }
    }

    fn obs(rating: f64, tier: Tier, d: NaiveDate) -> RatingObservation {
        RatingObservation {
            rating,
            date: d,
            tier,
            tournament_name: "Test Open".to_string(),
            round: None,
        }
    }

    fn points() -> PointsMap {
        [("1", 100.0), ("2", 80.0), ("10", 5.0)].into_iter().collect()
    }

    #[test]
    fn non_scoring_tiers_score_zero() {
        let map = points();
        for tier in [Tier::A, Tier::B, Tier::Other("L".into())] {
            let r = result(Place::Finished(1), tier, date(2024, 1, 1));
            assert_eq!(tournament_points(&r, &map), 0.0);
        }
    }

    #[test]
    fn tier_multipliers() {
        let map = points();
        let d = date(2024, 1, 1);
        assert_eq!(tournament_points(&result(Place::Finished(1), Tier::M, d), &map), 150.0);
        assert_eq!(tournament_points(&result(Place::Finished(1), Tier::XM, d), &map), 150.0);
        assert_eq!(tournament_points(&result(Place::Finished(1), Tier::ES, d), &map), 100.0);
    }

    #[test]
    fn non_placing_and_unmapped_score_zero() {
        let map = points();
        let d = date(2024, 1, 1);
        let dnf = result(Place::NonPlacing("DNF".into()), Tier::M, d);
        let far = result(Place::Finished(97), Tier::M, d);
        assert_eq!(tournament_points(&dnf, &map), 0.0);
        assert_eq!(tournament_points(&far, &map), 0.0);
    }

    #[test]
    fn composite_blends_latest_and_prior_year() {
        let map = points();
        let rows = vec![
            result(Place::Finished(2), Tier::ES, date(2023, 6, 1)),
            result(Place::Finished(1), Tier::ES, date(2024, 6, 1)),
            result(Place::Finished(1), Tier::ES, date(2021, 6, 1)),
        ];
        let composite = composite_fantasy_points(&rows, &map, 2024, CompositeWeights::default());
        assert!((composite - (0.65 * 100.0 + 0.35 * 80.0)).abs() < 1e-9);
        let custom = CompositeWeights {
            recent: 1.0,
            prior: 1.0,
        };
        assert_eq!(composite_fantasy_points(&rows, &map, 2024, custom), 180.0);
        assert!((frac_of_reference(1732.0, DEFAULT_REFERENCE_SCORE) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weight_boundaries() {
        let cfg = RatingConfig::default();
        assert_eq!(observation_weight(0.0, &cfg), 1.0);
        assert_eq!(observation_weight(3.01, &cfg), 0.0);
        let no_decay = RatingConfig {
            decay_rate: 0.0,
            ..cfg
        };
        assert_eq!(observation_weight(3.5, &no_decay), 0.0);
        assert_eq!(observation_weight(2.5, &no_decay), 1.0);
    }

    #[test]
    fn old_ratings_are_cut_not_decayed() {
        let ratings = vec![
            obs(1000.0, Tier::A, date(2020, 1, 1)),
            obs(950.0, Tier::M, date(2024, 1, 1)),
        ];
        let cfg = RatingConfig {
            decay_rate: 0.0,
            ..RatingConfig::default()
        };
        assert_eq!(composite_rating(&ratings, &cfg), Some(950.0));
    }

    #[test]
    fn composite_rating_weights_recent_rounds_more() {
        let ratings = vec![
            obs(900.0, Tier::A, date(2022, 1, 1)),
            obs(1000.0, Tier::A, date(2024, 1, 1)),
        ];
        let value = composite_rating(&ratings, &RatingConfig::default()).unwrap();
        assert!(value > 950.0 && value < 1000.0);
        assert_eq!(value, round1(value));
    }

    #[test]
    fn composite_rating_absent_without_eligible_data() {
        let cfg = RatingConfig::default();
        assert_eq!(composite_rating(&[], &cfg), None);
        let only_b = vec![obs(1000.0, Tier::B, date(2024, 1, 1))];
        assert_eq!(composite_rating(&only_b, &cfg), None);
        let stale = RatingConfig {
            reference_date: Some(date(2030, 1, 1)),
            ..cfg
        };
        let ratings = vec![obs(1000.0, Tier::A, date(2024, 1, 1))];
        assert_eq!(composite_rating(&ratings, &stale), None);
    }

    #[test]
    fn rating_values_filters_tier_and_cutoff() {
        let ratings = vec![
            obs(900.0, Tier::A, date(2023, 1, 1)),
            obs(950.0, Tier::B, date(2024, 1, 1)),
            obs(1000.0, Tier::M, date(2024, 2, 1)),
        ];
        assert_eq!(rating_values(&ratings, None, None).len(), 3);
        assert_eq!(
            rating_values(&ratings, Some(&[Tier::A, Tier::M]), Some(date(2023, 1, 1))),
            vec![1000.0]
        );
    }
}
