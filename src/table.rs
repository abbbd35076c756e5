use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::normalize::ColumnRecord;
use crate::record::{Place, PlayerRecord, RatingObservation, Tier, TournamentResult};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

pub fn build_player_record(
    stats: &ColumnRecord,
    ratings: Option<&ColumnRecord>,
) -> Result<PlayerRecord> {
    let tournaments = build_tournaments(stats)?;
    let ratings = match ratings {
        Some(ratings) => build_ratings(ratings)?,
        None => Vec::new(),
    };
    Ok(PlayerRecord {
        tournaments,
        ratings,
    })
}

/// Typed tournament rows sorted by date. Any row whose date cannot be read
/// fails the whole table.
pub fn build_tournaments(record: &ColumnRecord) -> Result<Vec<TournamentResult>> {
    if record.is_empty() {
        return Ok(Vec::new());
    }
    let places = required_column(record, &["Place"])?;
    let tiers = required_column(record, &["Tier"])?;
    let dates = required_column(record, &["Date", "Dates"])?;
    let names = required_column(record, &["Tournament"])?;
    let rows = same_length(&[places, tiers, dates, names])?;

    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        out.push(TournamentResult {
            date: row_date(&dates[i], i)?,
            place: parse_place(&places[i]),
            tier: Tier::from_code(&cell_text(&tiers[i])),
            tournament_name: cell_text(&names[i]),
        });
    }
    out.sort_by_key(|row| row.date);
    Ok(out)
}

pub fn build_ratings(record: &ColumnRecord) -> Result<Vec<RatingObservation>> {
    if record.is_empty() {
        return Ok(Vec::new());
    }
    let ratings = required_column(record, &["Rating"])?;
    let dates = required_column(record, &["Date"])?;
    let tiers = required_column(record, &["Tier"])?;
    let names = required_column(record, &["Tournament"])?;
    let rounds = record.column("Round");
    let mut columns = vec![ratings, dates, tiers, names];
    columns.extend(rounds);
    let rows = same_length(&columns)?;

    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        let rating = parse_rating(&ratings[i]).ok_or_else(|| {
            PipelineError::unparseable(format!("row {i}: rating {} is not numeric", ratings[i]))
        })?;
        let round = rounds
            .map(|col| cell_text(&col[i]))
            .filter(|s| !s.is_empty());
        out.push(RatingObservation {
            rating,
            date: row_date(&dates[i], i)?,
            tier: Tier::from_code(&cell_text(&tiers[i])),
            tournament_name: cell_text(&names[i]),
            round,
        });
    }
    out.sort_by_key(|row| row.date);
    Ok(out)
}

/// Tournaments grouped by tier, groups in first-seen order.
pub fn partition_by_tier(tournaments: &[TournamentResult]) -> Vec<(Tier, Vec<&TournamentResult>)> {
    let mut groups: Vec<(Tier, Vec<&TournamentResult>)> = Vec::new();
    for row in tournaments {
        match groups.iter_mut().find(|(tier, _)| *tier == row.tier) {
            Some((_, rows)) => rows.push(row),
            None => groups.push((row.tier.clone(), vec![row])),
        }
    }
    groups
}

pub fn parse_place(value: &Value) -> Place {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .or_else(|| n.as_f64().and_then(integral_position))
            .map(Place::Finished)
            .unwrap_or_else(|| Place::NonPlacing(n.to_string())),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .or_else(|| t.parse::<f64>().ok().and_then(integral_position))
                .map(Place::Finished)
                .unwrap_or_else(|| Place::NonPlacing(t.to_string()))
        }
        Value::Null => Place::NonPlacing(String::new()),
        other => Place::NonPlacing(other.to_string()),
    }
}

fn integral_position(v: f64) -> Option<u32> {
    if v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

fn parse_rating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_text(s),
        // Dataframe exports write datetimes as epoch milliseconds.
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

/// Accepts the formats seen in scraped tables, including ranges such as
/// `15-Mar to 17-Mar-2024` where the final day wins.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let text = raw.rsplit(" to ").next()?.trim();
    if text.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

fn row_date(value: &Value, row: usize) -> Result<NaiveDate> {
    parse_date(value)
        .ok_or_else(|| PipelineError::unparseable(format!("row {row}: unparseable date {value}")))
}

fn required_column<'a>(record: &'a ColumnRecord, names: &[&str]) -> Result<&'a [Value]> {
    names
        .iter()
        .find_map(|name| record.column(name))
        .ok_or_else(|| PipelineError::unparseable(format!("missing column '{}'", names[0])))
}

fn same_length(columns: &[&[Value]]) -> Result<usize> {
    let rows = columns.first().map(|c| c.len()).unwrap_or(0);
    if columns.iter().any(|c| c.len() != rows) {
        let lengths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
        return Err(PipelineError::unparseable(format!(
            "column lengths differ: {lengths:?}"
        )));
    }
    Ok(rows)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn place_coercion() {
        assert_eq!(parse_place(&json!("1")), Place::Finished(1));
        assert_eq!(parse_place(&json!(" 3 ")), Place::Finished(3));
        assert_eq!(parse_place(&json!(4.0)), Place::Finished(4));
        assert_eq!(parse_place(&json!("12.0")), Place::Finished(12));
        assert_eq!(parse_place(&json!("DNF")), Place::NonPlacing("DNF".into()));
        assert_eq!(parse_place(&json!("0")), Place::NonPlacing("0".into()));
        assert_eq!(parse_place(&Value::Null), Place::NonPlacing(String::new()));
    }

    #[test]
    fn date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(parse_date_text("2024-03-17"), Some(d));
        assert_eq!(parse_date_text("2024-03-17 00:00:00"), Some(d));
        assert_eq!(parse_date_text("2024-03-17T00:00:00.000"), Some(d));
        assert_eq!(parse_date_text("17-Mar-2024"), Some(d));
        assert_eq!(parse_date_text("15-Mar to 17-Mar-2024"), Some(d));
        assert_eq!(parse_date_text("03/17/2024"), Some(d));
        assert_eq!(parse_date_text("Mar 17, 2024"), Some(d));
        assert_eq!(parse_date_text("soon"), None);
        assert_eq!(parse_date(&json!(1710633600000_i64)), Some(d));
    }

    #[test]
    fn bad_date_fails_the_table() {
        let mut record = ColumnRecord::default();
        record.insert("Place", vec![json!("1"), json!("2")]);
        record.insert("Tier", vec![json!("M"), json!("A")]);
        record.insert("Date", vec![json!("2024-03-01"), json!("someday")]);
        record.insert("Tournament", vec![json!("One"), json!("Two")]);
        assert!(matches!(
            build_tournaments(&record),
            Err(PipelineError::UnparseableRecord(_))
        ));
    }

    #[test]
    fn sort_is_stable_for_equal_dates() {
        let mut record = ColumnRecord::default();
        record.insert("Place", vec![json!("5"), json!("1"), json!("2")]);
        record.insert("Tier", vec![json!("A"), json!("B"), json!("M")]);
        record.insert(
            "Dates",
            vec![json!("2024-05-01"), json!("2024-01-01"), json!("2024-01-01")],
        );
        record.insert(
            "Tournament",
            vec![json!("Late"), json!("First"), json!("Second")],
        );
        let rows = build_tournaments(&record).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.tournament_name.as_str()).collect();
        assert_eq!(names, ["First", "Second", "Late"]);
    }

    #[test]
    fn mismatched_columns_are_unparseable() {
        let mut record = ColumnRecord::default();
        record.insert("Rating", vec![json!("1000")]);
        record.insert("Date", vec![json!("2024-01-01"), json!("2024-01-02")]);
        record.insert("Tier", vec![json!("A")]);
        record.insert("Tournament", vec![json!("X")]);
        assert!(build_ratings(&record).is_err());
    }

    #[test]
    fn empty_mapping_is_an_empty_table() {
        let record = ColumnRecord::default();
        assert!(build_tournaments(&record).unwrap().is_empty());
        assert!(build_ratings(&record).unwrap().is_empty());
    }

    #[test]
    fn partition_keeps_first_seen_order() {
        let mut record = ColumnRecord::default();
        record.insert("Place", vec![json!("1"), json!("2"), json!("3")]);
        record.insert("Tier", vec![json!("M"), json!("A"), json!("M")]);
        record.insert(
            "Date",
            vec![json!("2024-01-01"), json!("2024-02-01"), json!("2024-03-01")],
        );
        record.insert("Tournament", vec![json!("a"), json!("b"), json!("c")]);
        let rows = build_tournaments(&record).unwrap();
        let groups = partition_by_tier(&rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Tier::M);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, Tier::A);
    }
}
