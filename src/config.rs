use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;

use crate::dataset::{DatasetConfig, PlayerSource, default_stat_columns};
use crate::features::{
    CompositeWeights, DEFAULT_REFERENCE_SCORE, FeatureConfig, PointsMap, RatingConfig,
};

/// Load `.env.local` then `.env`; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn load_points_map(path: &Path) -> Result<PointsMap> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read points map {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse points map {}", path.display()))?;
    if !value.is_object() {
        return Err(anyhow!("points map {} is not a JSON object", path.display()));
    }
    Ok(PointsMap::from_json(&value))
}

pub fn load_player_sources(path: &Path) -> Result<Vec<PlayerSource>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read player sources {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse player sources {}", path.display()))
}

impl DatasetConfig {
    /// Defaults overridden by `FANTASY_*`, `RATING_*` and `DATASET_*` env vars.
    /// `years` is used when `FANTASY_YEARS` is unset.
    pub fn from_env(years: Vec<i32>, points_map: PointsMap) -> Self {
        let years = env::var("FANTASY_YEARS")
            .ok()
            .map(|raw| parse_years(&raw))
            .filter(|parsed| !parsed.is_empty())
            .unwrap_or(years);

        let defaults = CompositeWeights::default();
        let mut features = FeatureConfig::new(years, points_map);
        features.weights = CompositeWeights {
            recent: env_f64("FANTASY_WEIGHT_RECENT").unwrap_or(defaults.recent),
            prior: env_f64("FANTASY_WEIGHT_PRIOR").unwrap_or(defaults.prior),
        };
        features.reference_score = env_f64("FANTASY_REFERENCE_SCORE")
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_REFERENCE_SCORE);

        let rating = RatingConfig::default();
        features.rating = RatingConfig {
            decay_rate: env_f64("RATING_DECAY_RATE")
                .unwrap_or(rating.decay_rate)
                .max(0.0),
            horizon_years: env_f64("RATING_HORIZON_YEARS")
                .unwrap_or(rating.horizon_years)
                .clamp(0.0, 50.0),
            reference_date: env::var("RATING_REFERENCE_DATE")
                .ok()
                .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()),
        };

        let stat_columns = env::var("DATASET_STAT_COLUMNS")
            .ok()
            .map(|raw| parse_list(&raw))
            .filter(|cols| !cols.is_empty())
            .unwrap_or_else(default_stat_columns);
        let threads = env::var("DATASET_THREADS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .map(|n| n.clamp(1, 64));

        Self {
            features,
            stat_columns,
            threads,
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub fn parse_years(raw: &str) -> Vec<i32> {
    let mut years = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<i32>().ok())
        .filter(|year| (1900..=2200).contains(year))
        .collect::<Vec<_>>();
    years.sort_unstable();
    years.dedup();
    years
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
