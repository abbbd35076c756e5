//! Percentile / percent-of-max / rank of a player's value within a cohort.
//!
//! Statistics are always computed from a `CohortTable` snapshot; missing
//! values (`None`) are left out of the column distribution.

use crate::error::{PipelineError, Result};
use crate::features::round1;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CohortTable {
    players: Vec<String>,
    columns: Vec<(String, Vec<Option<f64>>)>,
}

impl CohortTable {
    pub fn new(players: Vec<String>) -> Self {
        Self {
            players,
            columns: Vec::new(),
        }
    }

    /// Add or replace a column. Values are aligned with the player list;
    /// a short column is padded with `None` and a long one truncated.
    pub fn with_column(mut self, name: impl Into<String>, mut values: Vec<Option<f64>>) -> Self {
        let name = name.into();
        values.resize(self.players.len(), None);
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
        self
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| PipelineError::ColumnNotFound(name.to_string()))
    }

    pub fn player_index(&self, player: &str) -> Result<usize> {
        self.players
            .iter()
            .position(|p| p == player)
            .ok_or_else(|| PipelineError::PlayerNotFound(player.to_string()))
    }

    pub fn value(&self, column: &str, player: &str) -> Result<Option<f64>> {
        let values = self.column(column)?;
        let idx = self.player_index(player)?;
        Ok(values.get(idx).copied().flatten())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortStat {
    pub value: f64,
    pub percentile: f64,
    /// Absent when the column maximum is zero.
    pub percent_of_max: Option<f64>,
    pub rank: usize,
    pub cohort_size: usize,
}

impl CohortStat {
    pub fn rank_label(&self) -> String {
        format!("{}/{}", self.rank, self.cohort_size)
    }
}

/// Dashboard summary card for one player and one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub column: String,
    pub player: String,
    pub stat: Option<CohortStat>,
}

/// Percentile rank of `score` in `values`, scipy's "rank" convention.
pub fn percentile_of_score(values: &[f64], score: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let below = values.iter().filter(|v| **v < score).count();
    let at_or_below = values.iter().filter(|v| **v <= score).count();
    let plus_one = usize::from(below < at_or_below);
    let pct = (below + at_or_below + plus_one) as f64 * 50.0 / values.len() as f64;
    round1(pct)
}

/// `count(values > score) + 1`; ties share a rank.
pub fn rank_of(values: &[f64], score: f64) -> usize {
    values.iter().filter(|v| **v > score).count() + 1
}

pub fn percent_of_max(values: &[f64], score: f64) -> Option<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() || max == 0.0 {
        return None;
    }
    Some(round1(score / max * 100.0))
}

fn stat_for(present: &[f64], value: f64) -> CohortStat {
    CohortStat {
        value,
        percentile: percentile_of_score(present, value),
        percent_of_max: percent_of_max(present, value),
        rank: rank_of(present, value),
        cohort_size: present.len(),
    }
}

/// Statistics for every player in a column, aligned with `table.players()`.
pub fn column_stats(table: &CohortTable, column: &str) -> Result<Vec<Option<CohortStat>>> {
    let values = table.column(column)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    Ok(values
        .iter()
        .map(|v| v.map(|value| stat_for(&present, value)))
        .collect())
}

pub fn player_stat(table: &CohortTable, column: &str, player: &str) -> Result<Option<CohortStat>> {
    let values = table.column(column)?;
    let idx = table.player_index(player)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    Ok(values
        .get(idx)
        .copied()
        .flatten()
        .map(|value| stat_for(&present, value)))
}

pub fn player_summary(table: &CohortTable, column: &str, player: &str) -> Result<PlayerSummary> {
    Ok(PlayerSummary {
        column: column.to_string(),
        player: player.to_string(),
        stat: player_stat(table, column, player)?,
    })
}
