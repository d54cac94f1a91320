//! Spreadsheet persistence seam.

use std::path::Path;

use anyhow::{anyhow, Result};
use rust_xlsxwriter::Workbook;
use tracing::{debug, info};

/// Narrow writer interface the pipeline persists through. Sheet creation
/// makes the new sheet current; cell writes and row appends target the
/// current sheet.
pub trait SpreadsheetWriter {
    fn create_sheet(&mut self, name: &str) -> Result<()>;

    /// Write one cell (0-based row/column) on the current sheet.
    fn set_cell(&mut self, row: u32, col: u16, value: &str) -> Result<()>;

    /// Append rows below everything written to the current sheet so far.
    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<()>;

    fn save(&mut self, path: &Path) -> Result<()>;
}

/// XLSX-backed implementation. One append cursor per sheet tracks the next
/// free row.
pub struct XlsxWorkbook {
    workbook: Workbook,
    cursors: Vec<u32>,
    current: Option<usize>,
}

impl XlsxWorkbook {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            cursors: Vec::new(),
            current: None,
        }
    }

    fn current_index(&self) -> Result<usize> {
        self.current
            .ok_or_else(|| anyhow!("no sheet created yet"))
    }
}

impl Default for XlsxWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetWriter for XlsxWorkbook {
    fn create_sheet(&mut self, name: &str) -> Result<()> {
        let sheet = self.workbook.add_worksheet();
        sheet
            .set_name(name)
            .map_err(|e| anyhow!("invalid sheet name '{}': {}", name, e))?;
        self.current = Some(self.cursors.len());
        self.cursors.push(0);
        debug!("created sheet '{}'", name);
        Ok(())
    }

    fn set_cell(&mut self, row: u32, col: u16, value: &str) -> Result<()> {
        let idx = self.current_index()?;
        let sheet = self
            .workbook
            .worksheet_from_index(idx)
            .map_err(|e| anyhow!("sheet lookup failed: {}", e))?;
        sheet
            .write_string(row, col, value)
            .map_err(|e| anyhow!("cell write failed: {}", e))?;
        self.cursors[idx] = self.cursors[idx].max(row + 1);
        Ok(())
    }

    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        let idx = self.current_index()?;
        let sheet = self
            .workbook
            .worksheet_from_index(idx)
            .map_err(|e| anyhow!("sheet lookup failed: {}", e))?;

        let mut cursor = self.cursors[idx];
        for row in rows {
            for (col, value) in row.iter().enumerate() {
                sheet
                    .write_string(cursor, col as u16, value)
                    .map_err(|e| anyhow!("cell write failed: {}", e))?;
            }
            cursor += 1;
        }
        self.cursors[idx] = cursor;
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.workbook
            .save(path)
            .map_err(|e| anyhow!("failed to save workbook {}: {}", path.display(), e))?;
        info!("workbook saved: {}", path.display());
        Ok(())
    }
}
