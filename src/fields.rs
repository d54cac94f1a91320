//! Anchored field extraction from business case page text.
//!
//! The business case PDFs carry no structured data; the two fields of
//! interest sit between literal text anchors that have stayed stable across
//! document revisions. All layout assumptions live here: the anchor strings,
//! the boundary-token variants, and the exactly-one-match policy.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::investment::DocumentFields;

/// Investment name sits between its label and the first of two boundary
/// tokens. Observed revisions disagree on the boundary: some run straight
/// into the "2." item number, others into the "Section B:" heading, so both
/// are accepted and the first one encountered wins.
static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)name of this investment:\s*(.*?)\s*(?:(2\.)|(section b:))")
        .expect("name anchor pattern is valid")
});

/// UII sits between its label and the "Section B" heading. The captured span
/// can wrap and pick up stray item numbering, so the last whitespace
/// delimited token is the canonical value.
static UII_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)unique investment identifier \(uii\):\s*(.*?)\s*section b")
        .expect("uii anchor pattern is valid")
});

/// A document that yielded zero or multiple matches for a required field.
/// Both raw match sets ride along for diagnosis; a zero-match document is
/// malformed or of an unexpected layout, a multi-match one is ambiguous.
/// Never silently resolved to a best guess.
#[derive(Debug, Error)]
pub enum ExtractionFault {
    // The field holding the document name must not be called `source`:
    // thiserror would wire a field of that name into Error::source().
    #[error(
        "field '{field}' not found in {document} (name matches: {name_matches:?}, uii matches: {uii_matches:?})"
    )]
    MissingField {
        document: String,
        field: &'static str,
        name_matches: Vec<String>,
        uii_matches: Vec<String>,
    },

    #[error(
        "field '{field}' is ambiguous in {document} (name matches: {name_matches:?}, uii matches: {uii_matches:?})"
    )]
    AmbiguousField {
        document: String,
        field: &'static str,
        name_matches: Vec<String>,
        uii_matches: Vec<String>,
    },
}

const FIELD_NAME: &str = "Name of this Investment";
const FIELD_UII: &str = "Unique Investment Identifier (UII)";

/// Extract both fields from the raw text of one document page.
///
/// `document` names the source file for diagnostics only. Labels are matched
/// case-insensitively; captured spans are trimmed, and the UII is reduced to
/// the last whitespace-delimited token of its span. Exactly one match per
/// field is required. No I/O happens here; text conversion is the
/// [`DocumentTextProvider`](crate::pdftext::DocumentTextProvider)'s job.
pub fn extract(page_text: &str, document: &str) -> Result<DocumentFields, ExtractionFault> {
    let name_matches: Vec<String> = NAME_RE
        .captures_iter(page_text)
        .map(|caps| {
            let boundary = if caps.get(2).is_some() { "2." } else { "Section B:" };
            debug!("investment name span in {} terminated by '{}'", document, boundary);
            caps[1].trim().to_string()
        })
        .collect();

    let uii_matches: Vec<String> = UII_RE
        .captures_iter(page_text)
        .map(|caps| {
            caps[1]
                .split_whitespace()
                .last()
                .unwrap_or_default()
                .to_string()
        })
        .collect();

    let fault = |field, ambiguous: bool| {
        let (document, name_matches, uii_matches) =
            (document.to_string(), name_matches.clone(), uii_matches.clone());
        if ambiguous {
            ExtractionFault::AmbiguousField { document, field, name_matches, uii_matches }
        } else {
            ExtractionFault::MissingField { document, field, name_matches, uii_matches }
        }
    };

    let investment_name = match name_matches.as_slice() {
        [] => return Err(fault(FIELD_NAME, false)),
        [one] => one.clone(),
        _ => return Err(fault(FIELD_NAME, true)),
    };

    let uii = match uii_matches.as_slice() {
        [] => return Err(fault(FIELD_UII, false)),
        [one] if !one.is_empty() => one.clone(),
        [_] => return Err(fault(FIELD_UII, false)),
        _ => return Err(fault(FIELD_UII, true)),
    };

    Ok(DocumentFields { investment_name, uii })
}
