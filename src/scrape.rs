//! Table and tile scraping against the dashboard pages.
//!
//! The investments table is a DataTables widget that renders asynchronously
//! and paginates client-side. A fixed sleep is unreliable and an unbounded
//! "wait for N rows" can stall forever when rendering legitimately tops out
//! below N (filtered subsets do this), so every wait here is bounded, and
//! the final-row wait falls back to proceed-with-warning rather than
//! failing the run over partial data.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::{DriverError, PageHandle};
use crate::investment::{InvestmentRow, SpendingAmount};

/// Agency tiles revealed by the "DIVE IN" link on the landing page.
const AGENCY_TILES: &str = "#agency-tiles-widget .col-sm-12 > div:nth-child(2) > a";
/// DataTables wrapper around the investments table.
const TABLE_WRAPPER: &str = "#investments-table-object_wrapper";
/// "Showing 1 to 10 of 1,234 entries" status line.
const TABLE_INFO: &str = "#investments-table-object_info";
/// Page-length control; its "-1" option renders all rows at once.
const TABLE_LENGTH: &str = "select[name='investments-table-object_length']";
const TABLE_ROWS: &str = "#investments-table-object > tbody > tr";
const SHOW_ALL: &str = "-1";

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A structural page element never appeared. Fatal to the run: the
    /// page's assumed shape is unverified, so nothing scraped after this
    /// point could be trusted.
    #[error("page structure not visible: {0}")]
    VisibilityTimeout(String),

    #[error("could not parse entry total from '{text}'")]
    MalformedTotal { text: String },

    #[error(transparent)]
    Driver(DriverError),
}

impl From<DriverError> for ScrapeError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::VisibilityTimeout { ref locator, .. } => {
                ScrapeError::VisibilityTimeout(locator.clone())
            }
            other => ScrapeError::Driver(other),
        }
    }
}

/// Everything captured from one pass over the investments table.
#[derive(Debug)]
pub struct InvestmentTable {
    pub rows: Vec<InvestmentRow>,
    /// Total the table reported before capture; differs from `rows.len()`
    /// when rendering topped out early.
    pub expected_total: usize,
}

pub struct TableScraper<'a> {
    page: &'a dyn PageHandle,
    visibility_timeout: Duration,
}

impl<'a> TableScraper<'a> {
    pub fn new(page: &'a dyn PageHandle, visibility_timeout: Duration) -> Self {
        Self {
            page,
            visibility_timeout,
        }
    }

    /// Capture `(agency, amount)` from every tile on the summary page.
    /// Tile text renders as agency name on the first line and the spending
    /// amount on the last.
    pub fn scrape_spending_amounts(&self) -> Result<Vec<SpendingAmount>, ScrapeError> {
        self.page.wait_visible(AGENCY_TILES, self.visibility_timeout)?;

        let tiles = self.page.get_texts(AGENCY_TILES)?;
        info!("number of agency tiles: {}", tiles.len());

        let amounts = tiles
            .iter()
            .filter_map(|text| {
                let mut lines = text.lines().filter(|l| !l.trim().is_empty());
                let agency = lines.next()?.trim().to_string();
                // A one-line tile yields the same string for both columns
                // rather than being dropped.
                let amount = lines
                    .last()
                    .map(|l| l.trim().to_string())
                    .unwrap_or_else(|| agency.clone());
                Some(SpendingAmount::new(agency, amount))
            })
            .collect();
        Ok(amounts)
    }

    /// Capture the full "Individual Investments" table.
    pub fn scrape_investments(&self) -> Result<InvestmentTable, ScrapeError> {
        self.page.wait_visible(TABLE_WRAPPER, self.visibility_timeout)?;

        let info_text = self.page.get_text(TABLE_INFO)?;
        let expected_total = parse_entry_total(&info_text)
            .ok_or_else(|| ScrapeError::MalformedTotal { text: info_text })?;
        debug!("table reports {} entries", expected_total);

        self.page.select_value(TABLE_LENGTH, SHOW_ALL)?;

        // Liveness signal that re-rendering finished: the last expected row
        // is in the DOM. On timeout we proceed anyway; whatever rendered is
        // still worth capturing.
        let last_row = format!("{}:nth-child({})", TABLE_ROWS, expected_total);
        if let Err(e) = self.page.wait_visible(&last_row, self.visibility_timeout) {
            warn!("final row did not render within bound: {}", e);
        }

        // A capture shorter than expected_total is the caller's warning to
        // raise; it is reported exactly once, through the operator log.
        let scraped = self.page.scrape_rows(TABLE_ROWS)?;

        let rows: Vec<InvestmentRow> = scraped
            .iter()
            .filter_map(|r| {
                let row = InvestmentRow::from_cells(&r.cells, r.link.clone());
                if row.is_none() {
                    debug!("skipping short row: {:?}", r.cells);
                }
                row
            })
            .collect();
        info!("extracted {} rows", rows.len());

        Ok(InvestmentTable {
            rows,
            expected_total,
        })
    }
}

/// Pull the reported total out of the DataTables info line, stripping
/// thousands separators: "Showing 1 to 10 of 1,234 entries" -> 1234.
fn parse_entry_total(info_text: &str) -> Option<usize> {
    let tokens: Vec<&str> = info_text.split_whitespace().collect();
    let raw = tokens.get(tokens.len().checked_sub(2)?)?;
    raw.replace(',', "").parse().ok()
}
