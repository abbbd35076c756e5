use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dg_fantasy::config::{self, parse_years};
use dg_fantasy::dataset::{self, DatasetConfig};
use dg_fantasy::dataset_export;

const DEFAULT_OUT: &str = "dataset.xlsx";
const DEFAULT_TOP: usize = 20;

fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let players_path = path_arg("players").context("missing --players <file.json>")?;
    let points_path = path_arg("points-map").context("missing --points-map <file.json>")?;
    let out_path = path_arg("out").unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));
    let years = string_arg("years").map(|raw| parse_years(&raw)).unwrap_or_default();
    let top = string_arg("top")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TOP);

    let points_map = config::load_points_map(&points_path)?;
    let sources = config::load_player_sources(&players_path)?;
    let cfg = DatasetConfig::from_env(years, points_map);
    if cfg.features.years.is_empty() {
        return Err(anyhow!("no years given (use --years 2023,2024 or FANTASY_YEARS)"));
    }
    info!(
        players = sources.len(),
        points_entries = cfg.features.points_map.len(),
        "inputs loaded"
    );

    let dataset = dataset::assemble_dataset(&sources, &cfg)?;
    let report = dataset_export::export_dataset(&out_path, &dataset)?;

    println!("Dataset built");
    println!("Output: {}", out_path.display());
    println!("Players: {} (excluded {})", report.players, report.excluded);

    let header = dataset.header();
    let composite_idx = header
        .iter()
        .position(|c| c == dataset::COMPOSITE_FANTASY_COLUMN)
        .unwrap_or(0);
    let rating_idx = header
        .iter()
        .position(|c| c == dataset::COMPOSITE_RATING_COLUMN)
        .unwrap_or(0);
    println!();
    println!("{:<4} {:<28} {:>12} {:>10}", "#", "Player", "Composite", "Rating");
    println!("{}", "-".repeat(58));
    for (idx, row) in dataset.table_rows().iter().take(top).enumerate() {
        println!(
            "{:<4} {:<28} {:>12} {:>10}",
            idx + 1,
            row[0],
            row[composite_idx],
            if row[rating_idx].is_empty() { "n/a" } else { row[rating_idx].as_str() }
        );
    }

    if !dataset.exclusions.is_empty() {
        println!();
        println!("Excluded: {}", dataset.exclusions.len());
        for ex in dataset.exclusions.iter().take(6) {
            println!("   - {}: {}", ex.player, ex.error);
        }
    }

    Ok(())
}

fn string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let flag = format!("--{name}");
    let prefix = format!("--{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if *arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn path_arg(name: &str) -> Option<PathBuf> {
    string_arg(name).map(PathBuf::from)
}
