mod common;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use common::{investment_cells, DownloadBehavior, DownloadPage, ScriptedPage};
use spendrecon::browser::{BrowserDriver, DriverError, PageHandle, ScrapedRow};
use spendrecon::config::AppConfig;
use spendrecon::findings::FindingsLog;
use spendrecon::investment::{INVESTMENT_COLUMNS, NO_LINK};
use spendrecon::logger::{TaskLogger, VerbosityLevel};
use spendrecon::pdftext::DocumentTextProvider;
use spendrecon::pipeline::Pipeline;
use spendrecon::workbook::SpreadsheetWriter;

const DASHBOARD: &str = "https://itdashboard.gov/";
const AGENCY: &str = "National Science Foundation";

/// Serves the scripted dashboard page for the landing URL and a download
/// page named after the link's last segment for every other URL.
struct FullDriver {
    tiles: Vec<String>,
    info: String,
    rows: Vec<ScrapedRow>,
    download_dir: PathBuf,
    hidden: Vec<String>,
}

impl BrowserDriver for FullDriver {
    fn open_page(&self, url: &str) -> Result<Box<dyn PageHandle + '_>, DriverError> {
        if url == DASHBOARD {
            let mut texts = HashMap::new();
            texts.insert("agency-tiles", self.tiles.clone());
            texts.insert("_info", vec![self.info.clone()]);
            Ok(Box::new(ScriptedPage {
                texts,
                rows: self.rows.clone(),
                hidden: self.hidden.clone(),
                ..Default::default()
            }))
        } else {
            let uii = url.rsplit('/').next().unwrap_or("download");
            Ok(Box::new(DownloadPage::new(
                self.download_dir.clone(),
                DownloadBehavior::Complete {
                    file_name: format!("{}.pdf", uii),
                    delay_ms: 30,
                },
                true,
            )))
        }
    }
}

/// Returns canned page text keyed on the PDF's filename.
struct StubTextProvider {
    by_file: HashMap<String, String>,
}

impl DocumentTextProvider for StubTextProvider {
    fn page_text(&self, path: &Path, _page: u32) -> Result<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.by_file
            .get(&name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no text scripted for {}", name))
    }
}

/// Captures every sheet write so assertions can inspect the grid directly.
#[derive(Default)]
struct RecordingWriter {
    sheets: Vec<(String, Vec<Vec<String>>)>,
    saved_to: Option<PathBuf>,
}

impl RecordingWriter {
    fn current(&mut self) -> Result<&mut Vec<Vec<String>>> {
        self.sheets
            .last_mut()
            .map(|(_, grid)| grid)
            .ok_or_else(|| anyhow::anyhow!("no sheet created yet"))
    }
}

impl SpreadsheetWriter for RecordingWriter {
    fn create_sheet(&mut self, name: &str) -> Result<()> {
        self.sheets.push((name.to_string(), Vec::new()));
        Ok(())
    }

    fn set_cell(&mut self, row: u32, col: u16, value: &str) -> Result<()> {
        let grid = self.current()?;
        while grid.len() <= row as usize {
            grid.push(Vec::new());
        }
        let cells = &mut grid[row as usize];
        while cells.len() <= col as usize {
            cells.push(String::new());
        }
        cells[col as usize] = value.to_string();
        Ok(())
    }

    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        let grid = self.current()?;
        grid.extend(rows.iter().cloned());
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.saved_to = Some(path.to_path_buf());
        Ok(())
    }
}

fn test_config(output_dir: &Path) -> AppConfig {
    let toml = format!(
        r#"
[target]
url = "{DASHBOARD}"
agency = "{AGENCY}"

[browser]
visibility_timeout_secs = 1

[download]
timeout_secs = 100
poll_interval_ms = 10
partial_suffix = ".crdownload"

[pdf]
page_number = 1

[output]
directory = "{}"
workbook = "spending_amounts.xlsx"
"#,
        output_dir.to_string_lossy()
    );
    toml::from_str(&toml).expect("test config should parse")
}

fn document_text(title: &str, uii: &str) -> String {
    format!(
        "Section A: General Information\n\
         1. Name of this Investment: {title} 2. Unique Investment Identifier (UII): {uii} Section B: Summary",
    )
}

#[test]
fn test_full_run_reconciles_and_persists_every_row() {
    let dir = tempfile::tempdir().unwrap();

    let rows = vec![
        ScrapedRow {
            cells: investment_cells("004-000001", "Payroll Modernization"),
            link: Some("https://itdashboard.gov/drupal/summary/004/004-000001".to_string()),
        },
        ScrapedRow {
            cells: investment_cells("004-000002", "Grants Portal"),
            link: Some("https://itdashboard.gov/drupal/summary/004/004-000002".to_string()),
        },
        ScrapedRow {
            cells: investment_cells("004-000003", "Legacy Mainframe"),
            link: None,
        },
    ];
    let driver = FullDriver {
        tiles: vec![
            "Department of Commerce\n$1.99 B".to_string(),
            format!("{}\n$0.51 B", AGENCY),
        ],
        info: "Showing 1 to 3 of 3 entries".to_string(),
        rows,
        download_dir: dir.path().to_path_buf(),
        hidden: Vec::new(),
    };

    let mut by_file = HashMap::new();
    by_file.insert(
        "004-000001.pdf".to_string(),
        document_text("Payroll Modernization", "004-000001"),
    );
    // Document disagrees with the table on the second row's UII.
    by_file.insert(
        "004-000002.pdf".to_string(),
        document_text("Grants Portal", "999-999999"),
    );
    let text_provider = StubTextProvider { by_file };

    let config = test_config(dir.path());
    let logger = TaskLogger::new(VerbosityLevel::Silent);
    let findings = FindingsLog::new(&config.output.directory, AGENCY, false);
    let mut writer = RecordingWriter::default();

    let mut pipeline = Pipeline::new(
        &driver,
        &text_provider,
        &mut writer,
        &logger,
        &findings,
        &config,
        dir.path().to_path_buf(),
    );
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.agencies_captured, 2);
    assert_eq!(summary.documents_downloaded, 2);
    assert_eq!(summary.downloads_skipped, 1);
    assert_eq!(summary.full_matches, 1);
    assert_eq!(summary.mismatches, 1);
    assert_eq!(summary.rows.len(), 3);

    // Both summary PDFs landed under their UII names.
    assert!(dir.path().join("004-000001.pdf").exists());
    assert!(dir.path().join("004-000002.pdf").exists());

    // Agencies sheet: header plus one row per tile.
    let (agencies_name, agencies) = &writer.sheets[0];
    assert_eq!(agencies_name, "Agencies");
    assert_eq!(agencies[0], vec!["Agency", "Total FY2021 Spending"]);
    assert_eq!(agencies.len(), 3);
    assert_eq!(agencies[2], vec![AGENCY, "$0.51 B"]);

    // Agency sheet: every scraped row persisted, link-less ones included.
    let (agency_name, detail) = &writer.sheets[1];
    assert_eq!(agency_name, AGENCY);
    let header: Vec<String> = INVESTMENT_COLUMNS.iter().map(|c| c.to_string()).collect();
    assert_eq!(detail[0], header);
    assert_eq!(detail.len(), 4);
    assert_eq!(detail[3][0], "004-000003");
    assert_eq!(detail[3][7], NO_LINK);

    assert_eq!(
        writer.saved_to.as_deref(),
        Some(dir.path().join("spending_amounts.xlsx").as_path())
    );
}

#[test]
fn test_extraction_fault_skips_reconciliation_but_keeps_row() {
    let dir = tempfile::tempdir().unwrap();

    let rows = vec![ScrapedRow {
        cells: investment_cells("004-000001", "Payroll Modernization"),
        link: Some("https://itdashboard.gov/drupal/summary/004/004-000001".to_string()),
    }];
    let driver = FullDriver {
        tiles: vec![format!("{}\n$0.51 B", AGENCY)],
        info: "Showing 1 to 1 of 1 entries".to_string(),
        rows,
        download_dir: dir.path().to_path_buf(),
        hidden: Vec::new(),
    };

    // Page text without the expected anchors.
    let mut by_file = HashMap::new();
    by_file.insert(
        "004-000001.pdf".to_string(),
        "Exhibit 300: attachment cover sheet".to_string(),
    );
    let text_provider = StubTextProvider { by_file };

    let config = test_config(dir.path());
    let logger = TaskLogger::new(VerbosityLevel::Silent);
    let findings = FindingsLog::new(&config.output.directory, AGENCY, false);
    let mut writer = RecordingWriter::default();

    let mut pipeline = Pipeline::new(
        &driver,
        &text_provider,
        &mut writer,
        &logger,
        &findings,
        &config,
        dir.path().to_path_buf(),
    );
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.extraction_faults, 1);
    assert_eq!(summary.mismatches, 0);
    assert_eq!(summary.full_matches, 0);

    // The faulted row still reaches the workbook.
    let (_, detail) = &writer.sheets[1];
    assert_eq!(detail.len(), 2);
    assert_eq!(detail[1][0], "004-000001");
}

#[test]
fn test_unreadable_document_is_counted_not_dropped() {
    let dir = tempfile::tempdir().unwrap();

    let rows = vec![ScrapedRow {
        cells: investment_cells("004-000001", "Payroll Modernization"),
        link: Some("https://itdashboard.gov/drupal/summary/004/004-000001".to_string()),
    }];
    let driver = FullDriver {
        tiles: vec![format!("{}\n$0.51 B", AGENCY)],
        info: "Showing 1 to 1 of 1 entries".to_string(),
        rows,
        download_dir: dir.path().to_path_buf(),
        hidden: Vec::new(),
    };

    // No text scripted for the downloaded file, so the page read errors.
    let text_provider = StubTextProvider {
        by_file: HashMap::new(),
    };

    let config = test_config(dir.path());
    let logger = TaskLogger::new(VerbosityLevel::Silent);
    let findings = FindingsLog::new(&config.output.directory, AGENCY, false);
    let mut writer = RecordingWriter::default();

    let mut pipeline = Pipeline::new(
        &driver,
        &text_provider,
        &mut writer,
        &logger,
        &findings,
        &config,
        dir.path().to_path_buf(),
    );
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.documents_downloaded, 1);
    assert_eq!(summary.documents_unreadable, 1);
    assert_eq!(summary.extraction_faults, 0);
    assert_eq!(summary.mismatches, 0);

    // The unreadable row still reaches the workbook.
    let (_, detail) = &writer.sheets[1];
    assert_eq!(detail.len(), 2);
    assert_eq!(detail[1][0], "004-000001");
}

#[test]
fn test_short_capture_is_warned_exactly_once() {
    let dir = tempfile::tempdir().unwrap();

    let rows = vec![ScrapedRow {
        cells: investment_cells("004-000001", "Payroll Modernization"),
        link: None,
    }];
    let driver = FullDriver {
        tiles: vec![format!("{}\n$0.51 B", AGENCY)],
        info: "Showing 1 to 1 of 5 entries".to_string(),
        rows,
        download_dir: dir.path().to_path_buf(),
        hidden: Vec::new(),
    };
    let text_provider = StubTextProvider {
        by_file: HashMap::new(),
    };

    let config = test_config(dir.path());
    let log_path = dir.path().join("run.log");
    let logger = TaskLogger::with_log_file(
        VerbosityLevel::Detailed,
        log_path.to_string_lossy().to_string(),
    );
    let findings = FindingsLog::new(&config.output.directory, AGENCY, false);
    let mut writer = RecordingWriter::default();

    let mut pipeline = Pipeline::new(
        &driver,
        &text_provider,
        &mut writer,
        &logger,
        &findings,
        &config,
        dir.path().to_path_buf(),
    );
    pipeline.run().unwrap();
    logger.export_logs().unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    let warnings = log.matches("wrong number of rows extracted").count();
    assert_eq!(warnings, 1);
}

#[test]
fn test_structural_failure_surfaces_as_error() {
    // A missing table wrapper aborts the run through an Err return, never
    // through a process exit, so owned resources unwind in the caller.
    let dir = tempfile::tempdir().unwrap();

    let driver = FullDriver {
        tiles: vec![format!("{}\n$0.51 B", AGENCY)],
        info: "Showing 1 to 1 of 1 entries".to_string(),
        rows: Vec::new(),
        download_dir: dir.path().to_path_buf(),
        hidden: vec!["_wrapper".to_string()],
    };
    let text_provider = StubTextProvider {
        by_file: HashMap::new(),
    };

    let config = test_config(dir.path());
    let logger = TaskLogger::new(VerbosityLevel::Silent);
    let findings = FindingsLog::new(&config.output.directory, AGENCY, false);
    let mut writer = RecordingWriter::default();

    let mut pipeline = Pipeline::new(
        &driver,
        &text_provider,
        &mut writer,
        &logger,
        &findings,
        &config,
        dir.path().to_path_buf(),
    );
    let err = pipeline.run().unwrap_err();
    assert!(err.to_string().contains("investments table"));
}
