//! Cross-source reconciliation of document fields against table cells.

use tracing::{info, warn};

use crate::investment::{DocumentFields, InvestmentRow, ReconciliationResult};

/// Compare a document's extracted fields against its table row.
///
/// Both comparisons are exact string equality, no normalization: the title
/// text is expected to be reproduced verbatim between the table and the
/// document, and any deviation is exactly what the verdict exists to
/// surface. Deterministic and infallible; mismatches are data findings, not
/// faults.
pub fn reconcile(fields: &DocumentFields, row: &InvestmentRow) -> ReconciliationResult {
    let name_matches = fields.investment_name == row.title;
    let uii_matches = fields.uii == row.uii;

    if !name_matches || !uii_matches {
        warn!("values did not match for {}", row.uii);
    }
    info!(
        "\"Name of this Investment\" is expected to match \"Investment Title\": {}",
        name_matches
    );
    info!(
        "\"Unique Investment Identifier (UII)\" is expected to match \"UII\": {}",
        uii_matches
    );

    ReconciliationResult {
        name_matches,
        uii_matches,
    }
}
