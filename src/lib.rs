// Allow dead code for public API functions that may not be used internally
// but are part of the library's exposed interface
#![allow(dead_code)]

pub mod browser;
pub mod cli;
pub mod config;
pub mod download;
pub mod export;
pub mod fields;
pub mod findings;
pub mod investment;
pub mod logger;
pub mod pdftext;
pub mod pipeline;
pub mod reconcile;
pub mod scrape;
pub mod watcher;
pub mod workbook;

pub use investment::{DocumentFields, InvestmentRow, ReconciliationResult, SpendingAmount};
pub use pipeline::{Pipeline, RunSummary};
