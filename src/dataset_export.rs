use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::dataset::Dataset;

pub struct ExportReport {
    pub players: usize,
    pub excluded: usize,
}

/// Write the dataset to a workbook: a `Players` sheet in dataset column
/// order and an `Excluded` sheet listing skipped players with the reason.
pub fn export_dataset(path: &Path, dataset: &Dataset) -> Result<ExportReport> {
    let mut players_rows = vec![dataset.header()];
    players_rows.extend(dataset.table_rows());

    let mut excluded_rows = vec![vec!["Player".to_string(), "Reason".to_string()]];
    excluded_rows.extend(
        dataset
            .exclusions
            .iter()
            .map(|ex| vec![ex.player.clone(), ex.error.to_string()]),
    );

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Players")?;
        write_rows(sheet, &players_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Excluded")?;
        write_rows(sheet, &excluded_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        players: players_rows.len().saturating_sub(1),
        excluded: excluded_rows.len().saturating_sub(1),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
