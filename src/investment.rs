use serde::{Deserialize, Serialize};

/// Empty-cell sentinel the dashboard renders for investments without a
/// business case link. Persisted verbatim so the workbook mirrors the site.
pub const NO_LINK: &str = "--";

/// One agency tile from the summary page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpendingAmount {
    pub agency: String,
    pub amount: String,
}

impl SpendingAmount {
    pub fn new(agency: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            amount: amount.into(),
        }
    }

    pub fn to_sheet_row(&self) -> Vec<String> {
        vec![self.agency.clone(), self.amount.clone()]
    }
}

/// Column headers of the per-agency detail sheet, in table column order.
pub const INVESTMENT_COLUMNS: [&str; 8] = [
    "UII",
    "Bureau",
    "Investment Title",
    "Total FY2021 Spending ($M)",
    "Type",
    "CIO Rating",
    "# of Projects",
    "Link to Summary",
];

/// One row of the "Individual Investments" table.
///
/// `summary_link` is `None` for rows whose UII cell carries no hyperlink;
/// downstream processing branches on it, and persistence writes [`NO_LINK`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentRow {
    pub uii: String,
    pub bureau: String,
    pub title: String,
    pub spending: String,
    pub kind: String,
    pub cio_rating: String,
    pub project_count: String,
    pub summary_link: Option<String>,
}

impl InvestmentRow {
    /// Build a row from cell texts in table column order plus the first-cell
    /// hyperlink, if any. Returns `None` when the row is too short to carry
    /// the expected columns (e.g. a DataTables "no data" placeholder row).
    pub fn from_cells(cells: &[String], link: Option<String>) -> Option<Self> {
        if cells.len() < 7 {
            return None;
        }
        Some(Self {
            uii: cells[0].clone(),
            bureau: cells[1].clone(),
            title: cells[2].clone(),
            spending: cells[3].clone(),
            kind: cells[4].clone(),
            cio_rating: cells[5].clone(),
            project_count: cells[6].clone(),
            summary_link: link,
        })
    }

    pub fn to_sheet_row(&self) -> Vec<String> {
        vec![
            self.uii.clone(),
            self.bureau.clone(),
            self.title.clone(),
            self.spending.clone(),
            self.kind.clone(),
            self.cio_rating.clone(),
            self.project_count.clone(),
            self.summary_link.clone().unwrap_or_else(|| NO_LINK.to_string()),
        ]
    }
}

/// The two fields pulled out of a business case PDF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentFields {
    pub investment_name: String,
    pub uii: String,
}

/// Verdict of comparing a document's fields against its table row.
/// Derived, never persisted on its own; a mismatch is a finding, not a fault.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ReconciliationResult {
    pub name_matches: bool,
    pub uii_matches: bool,
}

impl ReconciliationResult {
    pub fn is_full_match(&self) -> bool {
        self.name_matches && self.uii_matches
    }
}
