//! xlsx output. One worksheet per table, bold header row, hyperlink cells
//! written as formulas so they stay clickable in the spreadsheet.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Formula, Workbook};

use crate::table::Table;

/// Write the named tables to a single workbook at `destination`, creating
/// parent directories as needed. Sheet order follows the slice order.
pub fn write_workbook(sheets: &[(&str, &Table)], destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for (name, table) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(*name)
            .with_context(|| format!("invalid sheet name {name}"))?;

        for (col, header) in table.columns.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, header, &header_format)
                .with_context(|| format!("sheet {name}: header write failed"))?;
        }

        for (row, cells) in table.rows.iter().enumerate() {
            let row = row as u32 + 1;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                if cell.starts_with("=HYPERLINK(") {
                    worksheet
                        .write_formula(row, col, Formula::new(cell))
                        .with_context(|| format!("sheet {name}: formula write failed"))?;
                } else {
                    worksheet
                        .write_string(row, col, cell)
                        .with_context(|| format!("sheet {name}: cell write failed"))?;
                }
            }
        }

        worksheet.autofit();
    }

    workbook
        .save(destination)
        .with_context(|| format!("failed to write {}", destination.display()))?;
    log::info!("workbook written to {}", destination.display());
    Ok(())
}
