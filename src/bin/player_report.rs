use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use dg_fantasy::cohort;
use dg_fantasy::config::{self, parse_years};
use dg_fantasy::dataset::{self, DatasetConfig, fantasy_column};
use dg_fantasy::features;
use dg_fantasy::record::Tier;

fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt::init();

    let players_path = parse_path_arg("--players").context("missing --players <file.json>")?;
    let points_path = parse_path_arg("--points-map").context("missing --points-map <file.json>")?;
    let player = parse_string_arg("--player").context("missing --player <name>")?;
    let years = parse_string_arg("--years")
        .map(|raw| parse_years(&raw))
        .unwrap_or_default();

    let points_map = config::load_points_map(&points_path)?;
    let sources = config::load_player_sources(&players_path)?;
    let cfg = DatasetConfig::from_env(years, points_map);
    let latest = cfg
        .features
        .latest_year()
        .ok_or_else(|| anyhow!("no years given (use --years 2023,2024 or FANTASY_YEARS)"))?;

    let source = sources
        .iter()
        .find(|s| s.player == player)
        .ok_or_else(|| anyhow!("player '{player}' not in {}", players_path.display()))?;
    let record = dataset::load_player_record(source)
        .with_context(|| format!("player '{player}' has an unusable record"))?;

    println!("Player: {player}");
    println!();
    println!("Fantasy scoring history");
    for item in features::scoring_history(&record.tournaments, &cfg.features.points_map) {
        println!(
            "  {}  {:<4} {:>5}  {:>7.1}  {}",
            item.date, item.tier, item.place, item.points, item.tournament_name
        );
    }

    let eligible = [Tier::A, Tier::ES, Tier::M, Tier::XM];
    let ratings = features::rating_values(&record.ratings, Some(&eligible[..]), None);
    println!();
    println!("Rated rounds (A/ES/M/XM): {}", ratings.len());
    if !ratings.is_empty() {
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
        let best = ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!("  Mean: {mean:.1}  Best: {best:.1}");
    }
    match features::composite_rating(&record.ratings, &cfg.features.rating) {
        Some(rating) => println!("  Composite: {rating:.1}"),
        None => println!("  Composite: n/a"),
    }

    let dataset = dataset::assemble_dataset(&sources, &cfg)?;
    let table = dataset.cohort_table();
    let columns = [
        dataset::COMPOSITE_FANTASY_COLUMN.to_string(),
        dataset::COMPOSITE_RATING_COLUMN.to_string(),
        fantasy_column(latest),
    ];
    for column in columns {
        let summary = cohort::player_summary(&table, &column, &player)?;
        println!();
        println!("{column}");
        match summary.stat {
            Some(stat) => {
                println!("  Value: {:.1}", stat.value);
                println!("  Rank: {}", stat.rank_label());
                println!("  Percentile: {:.1}", stat.percentile);
                match stat.percent_of_max {
                    Some(pct) => println!("  Percent of Max: {pct:.1}%"),
                    None => println!("  Percent of Max: n/a"),
                }
            }
            None => println!("  unavailable"),
        }
    }

    Ok(())
}

fn parse_string_arg(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix)
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    parse_string_arg(flag).map(PathBuf::from)
}
