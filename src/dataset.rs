use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::career::PlayerIdentity;
use crate::cohort::{self, CohortStat, CohortTable};
use crate::error::{PipelineError, Result};
use crate::features::{self, FeatureConfig, FeatureRow};
use crate::normalize::{self, RawRecord};
use crate::record::PlayerRecord;
use crate::table;

pub const COMPOSITE_FANTASY_COLUMN: &str = "composite_fantasy_points";
pub const FRAC_OF_REFERENCE_COLUMN: &str = "frac_of_reference";
pub const COMPOSITE_RATING_COLUMN: &str = "composite_rating";
pub const RATING_CURRENT_COLUMN: &str = "rating_current";

pub fn fantasy_column(year: i32) -> String {
    format!("fantasy_points_{year}")
}

/// One player as delivered by the data-acquisition side.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSource {
    pub player: String,
    #[serde(default)]
    pub pdga_number: Option<u32>,
    #[serde(default)]
    pub career: BTreeMap<String, String>,
    pub stats_data: RawRecord,
    #[serde(default)]
    pub ratings_data: Option<RawRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub features: FeatureConfig,
    /// Columns that get percentile / percent-of-max / rank attached.
    pub stat_columns: Vec<String>,
    /// Dedicated worker pool size; `None` runs on rayon's global pool.
    pub threads: Option<usize>,
}

impl DatasetConfig {
    pub fn new(features: FeatureConfig) -> Self {
        Self {
            features,
            stat_columns: default_stat_columns(),
            threads: None,
        }
    }
}

pub fn default_stat_columns() -> Vec<String> {
    vec![
        COMPOSITE_FANTASY_COLUMN.to_string(),
        COMPOSITE_RATING_COLUMN.to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub identity: PlayerIdentity,
    pub features: FeatureRow,
    /// Aligned with `Dataset::stat_columns`.
    pub stats: Vec<Option<CohortStat>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub player: String,
    pub error: PipelineError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub years: Vec<i32>,
    pub stat_columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
    pub exclusions: Vec<Exclusion>,
}

pub fn load_player_record(source: &PlayerSource) -> Result<PlayerRecord> {
    let stats = normalize::normalize_record(&source.stats_data)?;
    let ratings = source
        .ratings_data
        .as_ref()
        .map(normalize::normalize_record)
        .transpose()?;
    table::build_player_record(&stats, ratings.as_ref())
}

fn build_row(source: &PlayerSource, cfg: &FeatureConfig) -> Result<DatasetRow> {
    let record = load_player_record(source)?;
    Ok(DatasetRow {
        identity: PlayerIdentity::from_career(&source.player, source.pdga_number, &source.career),
        features: features::compute_features(&record, cfg),
        stats: Vec::new(),
    })
}

/// Normalize, build and score every player, then attach cohort statistics.
/// Players with bad data are excluded and logged; unknown stat columns fail
/// the whole call.
pub fn assemble_dataset(sources: &[PlayerSource], cfg: &DatasetConfig) -> Result<Dataset> {
    info!(players = sources.len(), years = ?cfg.features.years, "assembling dataset");

    let pool = build_pool(cfg.threads);
    let outcomes: Vec<Result<DatasetRow>> = with_pool(&pool, || {
        sources
            .par_iter()
            .map(|source| build_row(source, &cfg.features))
            .collect()
    });

    let mut rows = Vec::with_capacity(sources.len());
    let mut exclusions = Vec::new();
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(row) => rows.push(row),
            Err(error) => {
                log_exclusion(&source.player, &error);
                exclusions.push(Exclusion {
                    player: source.player.clone(),
                    error,
                });
            }
        }
    }

    let mut dataset = Dataset {
        years: cfg.features.years.clone(),
        stat_columns: Vec::new(),
        rows,
        exclusions,
    };
    dataset.attach_stats(&cfg.stat_columns)?;
    dataset.rows.sort_by(|a, b| {
        b.features
            .composite_fantasy_points
            .total_cmp(&a.features.composite_fantasy_points)
    });

    info!(
        included = dataset.rows.len(),
        excluded = dataset.exclusions.len(),
        "dataset assembled"
    );
    Ok(dataset)
}

fn log_exclusion(player: &str, error: &PipelineError) {
    match error {
        PipelineError::MalformedRecord {
            offset,
            context,
            message,
        } => warn!(
            player,
            offset,
            context = %context,
            "excluding player: malformed record: {message}"
        ),
        other => warn!(player, "excluding player: {other}"),
    }
}

impl Dataset {
    /// Snapshot of every numeric column, aligned with `rows`.
    pub fn cohort_table(&self) -> CohortTable {
        let players = self.rows.iter().map(|r| r.identity.player.clone()).collect();
        let mut table = CohortTable::new(players);
        for year in &self.years {
            let values = self
                .rows
                .iter()
                .map(|r| r.features.fantasy_points_by_year.get(year).copied())
                .collect();
            table = table.with_column(fantasy_column(*year), values);
        }
        table
            .with_column(
                COMPOSITE_FANTASY_COLUMN,
                self.column_values(|r| Some(r.features.composite_fantasy_points)),
            )
            .with_column(
                FRAC_OF_REFERENCE_COLUMN,
                self.column_values(|r| Some(r.features.frac_of_reference)),
            )
            .with_column(
                COMPOSITE_RATING_COLUMN,
                self.column_values(|r| r.features.composite_rating),
            )
            .with_column(
                RATING_CURRENT_COLUMN,
                self.column_values(|r| r.identity.rating_current),
            )
    }

    fn column_values(&self, pick: impl Fn(&DatasetRow) -> Option<f64>) -> Vec<Option<f64>> {
        self.rows.iter().map(pick).collect()
    }

    /// Recompute the statistics columns from the current rows.
    pub fn attach_stats(&mut self, columns: &[String]) -> Result<()> {
        let snapshot = self.cohort_table();
        let per_column: Vec<Vec<Option<CohortStat>>> = columns
            .par_iter()
            .map(|column| cohort::column_stats(&snapshot, column))
            .collect::<Result<_>>()?;

        for (idx, row) in self.rows.iter_mut().enumerate() {
            row.stats = per_column.iter().map(|stats| stats[idx].clone()).collect();
        }
        self.stat_columns = columns.to_vec();
        Ok(())
    }

    pub fn row(&self, player: &str) -> Result<&DatasetRow> {
        self.rows
            .iter()
            .find(|r| r.identity.player == player)
            .ok_or_else(|| PipelineError::PlayerNotFound(player.to_string()))
    }

    pub fn stat(&self, column: &str, player: &str) -> Result<Option<&CohortStat>> {
        let idx = self
            .stat_columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| PipelineError::ColumnNotFound(column.to_string()))?;
        Ok(self.row(player)?.stats[idx].as_ref())
    }

    /// Flat column names: identity, per-year fantasy points, composites, then
    /// cohort statistics.
    pub fn header(&self) -> Vec<String> {
        let mut out: Vec<String> = PlayerIdentity::COLUMNS.iter().map(|c| c.to_string()).collect();
        out.extend(self.years.iter().map(|y| fantasy_column(*y)));
        out.push(COMPOSITE_FANTASY_COLUMN.to_string());
        out.push(FRAC_OF_REFERENCE_COLUMN.to_string());
        out.push(COMPOSITE_RATING_COLUMN.to_string());
        for column in &self.stat_columns {
            out.push(format!("{column}_percentile"));
            out.push(format!("{column}_percent_of_max"));
            out.push(format!("{column}_rank"));
        }
        out
    }

    pub fn table_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| self.flat_row(row)).collect()
    }

    fn flat_row(&self, row: &DatasetRow) -> Vec<String> {
        let id = &row.identity;
        let mut out = vec![
            id.player.clone(),
            opt_to_string(id.pdga_number),
            opt_to_string(id.rating_current),
            opt_to_string(id.career_events),
            opt_to_string(id.career_wins),
        ];
        for year in &self.years {
            out.push(opt_fixed(row.features.fantasy_points_by_year.get(year).copied(), 2));
        }
        out.push(format!("{:.2}", row.features.composite_fantasy_points));
        out.push(format!("{:.4}", row.features.frac_of_reference));
        out.push(opt_fixed(row.features.composite_rating, 1));
        for stat in &row.stats {
            match stat {
                Some(stat) => {
                    out.push(format!("{:.1}", stat.percentile));
                    out.push(opt_fixed(stat.percent_of_max, 1));
                    out.push(stat.rank_label());
                }
                None => out.extend([String::new(), String::new(), String::new()]),
            }
        }
        out
    }
}

fn build_pool(threads: Option<usize>) -> Option<rayon::ThreadPool> {
    let threads = threads?.clamp(1, 64);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_fixed(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}
