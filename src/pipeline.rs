//! End-to-end run sequencing.
//!
//! The pipeline owns no I/O of its own; every side effect goes through an
//! injected seam (browser driver, text provider, spreadsheet writer), so the
//! full flow is exercisable in tests without Chrome or poppler. Per-row
//! failures downgrade to skips; only structural page failures abort the run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use crate::browser::BrowserDriver;
use crate::config::AppConfig;
use crate::download::{DownloadError, DownloadOrchestrator};
use crate::fields;
use crate::findings::FindingsLog;
use crate::investment::{InvestmentRow, INVESTMENT_COLUMNS};
use crate::logger::TaskLogger;
use crate::pdftext::DocumentTextProvider;
use crate::reconcile::reconcile;
use crate::scrape::TableScraper;
use crate::watcher::DownloadWatcher;
use crate::workbook::SpreadsheetWriter;

/// Landing page link that reveals the agency tiles.
const DIVE_IN: &str = "DIVE IN";
const AGENCIES_SHEET: &str = "Agencies";
/// XLSX sheet name ceiling.
const MAX_SHEET_NAME: usize = 31;

/// Counters and outputs of one complete run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub agencies_captured: usize,
    pub rows: Vec<InvestmentRow>,
    pub documents_downloaded: usize,
    pub downloads_skipped: usize,
    pub documents_unreadable: usize,
    pub extraction_faults: usize,
    pub mismatches: usize,
    pub full_matches: usize,
    pub workbook_path: PathBuf,
}

pub struct Pipeline<'a> {
    driver: &'a dyn BrowserDriver,
    text_provider: &'a dyn DocumentTextProvider,
    writer: &'a mut dyn SpreadsheetWriter,
    logger: &'a TaskLogger,
    findings: &'a FindingsLog,
    config: &'a AppConfig,
    output_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        text_provider: &'a dyn DocumentTextProvider,
        writer: &'a mut dyn SpreadsheetWriter,
        logger: &'a TaskLogger,
        findings: &'a FindingsLog,
        config: &'a AppConfig,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            driver,
            text_provider,
            writer,
            logger,
            findings,
            config,
            output_dir,
        }
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        self.logger.record_started();
        let mut summary = RunSummary::default();

        let visibility_timeout = Duration::from_secs(self.config.browser.visibility_timeout_secs);

        // One long-lived tab for the table pages; downloads get their own.
        let page = self
            .driver
            .open_page(&self.config.target.url)
            .map_err(|e| anyhow!("Failed to open dashboard: {}", e))?;
        self.logger
            .info(&format!("Opened {}", self.config.target.url));

        page.click_link_by_text(DIVE_IN, visibility_timeout)
            .map_err(|e| anyhow!("Landing page link failed: {}", e))?;

        let scraper = TableScraper::new(page.as_ref(), visibility_timeout);

        let amounts = scraper
            .scrape_spending_amounts()
            .context("Failed to capture agency spending tiles")?;
        summary.agencies_captured = amounts.len();
        self.logger.record_agencies_captured(amounts.len());
        self.logger
            .info(&format!("Captured {} agency spending amounts", amounts.len()));

        self.writer.create_sheet(AGENCIES_SHEET)?;
        self.writer.set_cell(0, 0, "Agency")?;
        self.writer.set_cell(0, 1, "Total FY2021 Spending")?;
        let amount_rows: Vec<Vec<String>> = amounts.iter().map(|a| a.to_sheet_row()).collect();
        self.writer.append_rows(&amount_rows)?;

        page.click_link_by_text(&self.config.target.agency, visibility_timeout)
            .map_err(|e| {
                anyhow!(
                    "Could not reach agency page for '{}': {}",
                    self.config.target.agency,
                    e
                )
            })?;

        let table = scraper
            .scrape_investments()
            .context("Failed to capture investments table")?;
        if table.rows.len() != table.expected_total {
            self.logger.warn(&format!(
                "wrong number of rows extracted: expected: {}, received: {}",
                table.expected_total,
                table.rows.len()
            ));
        }
        self.logger.record_rows_scraped(table.rows.len());

        self.writer.create_sheet(&sheet_name(&self.config.target.agency))?;
        let header: Vec<String> = INVESTMENT_COLUMNS.iter().map(|c| c.to_string()).collect();
        self.writer.append_rows(&[header])?;

        let watcher = DownloadWatcher::new(
            Duration::from_millis(self.config.download.poll_interval_ms),
            self.config.download.partial_suffix.clone(),
        );
        let orchestrator = DownloadOrchestrator::new(
            self.driver,
            watcher,
            self.output_dir.clone(),
            visibility_timeout,
            self.config.download.timeout_secs,
        );

        self.logger.start_progress(table.rows.len() as u64);
        for row in &table.rows {
            self.logger
                .update_progress(&format!("Processing {}", row.uii));
            self.process_row(&orchestrator, row, &mut summary);
            self.logger.advance_progress(1);
        }
        self.logger.finish_progress(&format!(
            "Processed {} investments ({} documents verified)",
            table.rows.len(),
            summary.documents_downloaded
        ));

        // Every scraped row lands in the workbook, verified or not.
        let sheet_rows: Vec<Vec<String>> = table.rows.iter().map(|r| r.to_sheet_row()).collect();
        self.writer.append_rows(&sheet_rows)?;

        let workbook_path = self.output_dir.join(&self.config.output.workbook);
        self.writer.save(&workbook_path)?;
        self.logger
            .record_output_file(&workbook_path.to_string_lossy());
        info!("workbook saved to {}", workbook_path.display());

        summary.rows = table.rows;
        summary.workbook_path = workbook_path;
        self.logger.record_finished();
        Ok(summary)
    }

    /// Download, extract and reconcile one row. Never aborts the run: every
    /// failure mode here downgrades to a counted skip.
    fn process_row(
        &self,
        orchestrator: &DownloadOrchestrator<'_>,
        row: &InvestmentRow,
        summary: &mut RunSummary,
    ) {
        let link = match &row.summary_link {
            Some(link) => link,
            None => {
                debug!("row {} has no summary link", row.uii);
                summary.downloads_skipped += 1;
                self.logger.record_download_skipped();
                return;
            }
        };

        let file_name = match orchestrator.download_document(link) {
            Ok(name) => name,
            Err(e) => {
                self.logger.warn(&format!(
                    "Skipping {}: download failed ({})",
                    row.uii, e
                ));
                if matches!(e, DownloadError::TriggerTimeout(_)) {
                    debug!("summary page for {} had no download trigger", row.uii);
                }
                summary.downloads_skipped += 1;
                self.logger.record_download_skipped();
                return;
            }
        };
        summary.documents_downloaded += 1;
        self.logger.record_document_downloaded();

        // Business case PDFs arrive named <UII>.pdf; a different name means
        // the latest-file heuristic picked up something unexpected.
        let expected = format!("{}.pdf", row.uii);
        if file_name != expected {
            warn!(
                "downloaded file '{}' does not match expected '{}'",
                file_name, expected
            );
        }

        let pdf_path = self.output_dir.join(&file_name);
        let text = match self
            .text_provider
            .page_text(&pdf_path, self.config.pdf.page_number)
        {
            Ok(text) => text,
            Err(e) => {
                self.logger.warn(&format!(
                    "Skipping {}: could not read {} ({})",
                    row.uii,
                    pdf_path.display(),
                    e
                ));
                summary.documents_unreadable += 1;
                self.logger.record_document_unreadable();
                return;
            }
        };

        let extracted = match fields::extract(&text, &file_name) {
            Ok(fields) => fields,
            Err(fault) => {
                self.logger
                    .warn(&format!("Extraction fault for {}: {}", row.uii, fault));
                self.findings.log_extraction_fault(&row.uii, &fault);
                summary.extraction_faults += 1;
                self.logger.record_extraction_fault();
                return;
            }
        };

        let verdict = reconcile(&extracted, row);
        if verdict.is_full_match() {
            summary.full_matches += 1;
        } else {
            self.findings.log_mismatch(row, &verdict);
            summary.mismatches += 1;
            self.logger.record_mismatch();
        }
    }
}

/// XLSX caps sheet names at 31 characters.
fn sheet_name(agency: &str) -> String {
    agency.chars().take(MAX_SHEET_NAME).collect()
}
