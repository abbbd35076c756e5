use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

// Last number following a ':', '$' or '#' ("Career Earnings: $12,345.67").
static LABELLED_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r".*[:$#]\s?((\d{1,5}(?:,\d{3})*|\d+)(\.\d+)?)").expect("number pattern is valid")
});

/// Number text from a profile snippet, thousands separators intact.
pub fn extract_number(raw: &str) -> Option<String> {
    LABELLED_NUMBER
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_f64(raw: &str) -> Option<f64> {
    extract_number(raw)?.replace(',', "").parse::<f64>().ok()
}

fn extract_u32(raw: &str) -> Option<u32> {
    let value = extract_f64(raw)?;
    if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

/// Identity columns that lead every dataset row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerIdentity {
    pub player: String,
    pub pdga_number: Option<u32>,
    pub rating_current: Option<f64>,
    pub career_events: Option<u32>,
    pub career_wins: Option<u32>,
}

impl PlayerIdentity {
    pub const COLUMNS: [&'static str; 5] = [
        "player",
        "pdga_number",
        "rating_current",
        "career_events",
        "career_wins",
    ];

    /// `career` holds the raw profile snippets keyed by field, with or
    /// without the `_raw` suffix the scraper uses.
    pub fn from_career(
        player: &str,
        pdga_number: Option<u32>,
        career: &BTreeMap<String, String>,
    ) -> Self {
        let field = |name: &str| {
            career
                .get(&format!("{name}_raw"))
                .or_else(|| career.get(name))
                .map(String::as_str)
        };
        Self {
            player: player.to_string(),
            pdga_number,
            rating_current: field("rating_current").and_then(extract_f64),
            career_events: field("career_events").and_then(extract_u32),
            career_wins: field("career_wins").and_then(extract_u32),
        }
    }
}
