use std::fs::File;
use std::io::Write;

use anyhow::Result;
use csv::Writer;
use tracing::{debug, info};

use crate::investment::{InvestmentRow, INVESTMENT_COLUMNS, NO_LINK};

/// Flat CSV export of the detail table, alongside the workbook.
pub fn export_csv(rows: &[InvestmentRow], output_path: &str) -> Result<()> {
    debug!("Exporting {} rows to CSV: {}", rows.len(), output_path);

    let file = File::create(output_path)?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(INVESTMENT_COLUMNS)?;
    for row in rows {
        wtr.write_record(&[
            row.uii.as_str(),
            row.bureau.as_str(),
            row.title.as_str(),
            row.spending.as_str(),
            row.kind.as_str(),
            row.cio_rating.as_str(),
            row.project_count.as_str(),
            row.summary_link.as_deref().unwrap_or(NO_LINK),
        ])?;
    }

    wtr.flush()?;
    info!("Successfully exported {} rows to CSV: {}", rows.len(), output_path);
    Ok(())
}

#[derive(serde::Serialize)]
struct JsonExport<'a> {
    summary: ExportSummary,
    rows: &'a [InvestmentRow],
}

#[derive(serde::Serialize)]
struct ExportSummary {
    total_rows: usize,
    rows_with_summary_link: usize,
}

/// JSON export of the detail table with a small roll-up header.
pub fn export_json(rows: &[InvestmentRow], output_path: &str) -> Result<()> {
    debug!("Exporting {} rows to JSON: {}", rows.len(), output_path);

    let json_output = JsonExport {
        summary: ExportSummary {
            total_rows: rows.len(),
            rows_with_summary_link: rows.iter().filter(|r| r.summary_link.is_some()).count(),
        },
        rows,
    };

    let json_string = serde_json::to_string_pretty(&json_output)?;
    let mut file = File::create(output_path)?;
    file.write_all(json_string.as_bytes())?;

    info!("Successfully exported {} rows to JSON: {}", rows.len(), output_path);
    Ok(())
}
