use std::fmt;

use chrono::NaiveDate;

/// Tournament significance classification as printed on PDGA result tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tier {
    A,
    B,
    ES,
    M,
    XM,
    Other(String),
}

impl Tier {
    pub fn from_code(raw: &str) -> Self {
        match raw.trim() {
            "A" => Tier::A,
            "B" => Tier::B,
            "ES" => Tier::ES,
            "M" => Tier::M,
            "XM" => Tier::XM,
            other => Tier::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Tier::A => "A",
            Tier::B => "B",
            Tier::ES => "ES",
            Tier::M => "M",
            Tier::XM => "XM",
            Tier::Other(code) => code,
        }
    }

    /// Tiers that earn fantasy points.
    pub fn is_scoring(&self) -> bool {
        matches!(self, Tier::M | Tier::ES | Tier::XM)
    }

    pub fn scoring_multiplier(&self) -> f64 {
        match self {
            Tier::M | Tier::XM => 1.5,
            Tier::ES => 1.0,
            _ => 0.0,
        }
    }

    /// Tiers whose round ratings feed the composite rating.
    pub fn is_rating_eligible(&self) -> bool {
        matches!(self, Tier::A | Tier::ES | Tier::M | Tier::XM)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    Finished(u32),
    /// DNF, WD, blanks and anything else that isn't a finishing position.
    NonPlacing(String),
}

impl Place {
    pub fn position(&self) -> Option<u32> {
        match self {
            Place::Finished(n) => Some(*n),
            Place::NonPlacing(_) => None,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Finished(n) => write!(f, "{n}"),
            Place::NonPlacing(raw) if raw.is_empty() => f.write_str("-"),
            Place::NonPlacing(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentResult {
    pub date: NaiveDate,
    pub place: Place,
    pub tier: Tier,
    pub tournament_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingObservation {
    pub rating: f64,
    pub date: NaiveDate,
    pub tier: Tier,
    pub tournament_name: String,
    pub round: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerRecord {
    pub tournaments: Vec<TournamentResult>,
    pub ratings: Vec<RatingObservation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tier_codes_are_preserved() {
        let tier = Tier::from_code(" C ");
        assert_eq!(tier, Tier::Other("C".to_string()));
        assert_eq!(tier.code(), "C");
        assert!(!tier.is_scoring());
        assert!(!tier.is_rating_eligible());
    }

    #[test]
    fn multipliers_by_tier() {
        assert_eq!(Tier::M.scoring_multiplier(), 1.5);
        assert_eq!(Tier::XM.scoring_multiplier(), 1.5);
        assert_eq!(Tier::ES.scoring_multiplier(), 1.0);
        assert!(Tier::A.is_rating_eligible());
        assert!(!Tier::B.is_rating_eligible());
    }
}
