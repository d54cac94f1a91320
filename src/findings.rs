use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use tracing::warn;

use crate::fields::ExtractionFault;
use crate::investment::{InvestmentRow, ReconciliationResult};

/// CSV log of data-quality findings: reconciliation mismatches and
/// extraction faults, one row per finding, for diagnosis after the run.
pub struct FindingsLog {
    file_path: String,
    writer: Mutex<Option<std::fs::File>>,
    enabled: bool,
}

impl FindingsLog {
    pub fn new(output_dir: &str, agency: &str, enabled: bool) -> Self {
        let file_path = if enabled {
            let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
            Path::new(output_dir)
                .join(format!(
                    "reconciliation_findings_{}_{}.csv",
                    agency.replace(' ', "_").to_lowercase(),
                    timestamp
                ))
                .to_string_lossy()
                .to_string()
        } else {
            String::new()
        };

        Self {
            file_path,
            writer: Mutex::new(None),
            enabled,
        }
    }

    /// Create the log file and write its header.
    pub fn initialize(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut writer_guard = self.writer.lock().unwrap();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.file_path)?;

        writeln!(file, "Timestamp,UII,Finding,Detail")?;
        *writer_guard = Some(file);
        Ok(())
    }

    pub fn log_mismatch(&self, row: &InvestmentRow, verdict: &ReconciliationResult) {
        let detail = format!(
            "name_matches={} uii_matches={} (title: {})",
            verdict.name_matches, verdict.uii_matches, row.title
        );
        self.write_finding(&row.uii, "mismatch", &detail);
    }

    pub fn log_extraction_fault(&self, uii: &str, fault: &ExtractionFault) {
        self.write_finding(uii, "extraction_fault", &fault.to_string());
    }

    fn write_finding(&self, uii: &str, finding: &str, detail: &str) {
        if !self.enabled {
            return;
        }

        let line = format!(
            "{},{},{},\"{}\"\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            uii,
            finding,
            detail.replace('"', "\"\"")
        );

        if let Ok(mut writer_guard) = self.writer.lock() {
            if let Some(ref mut file) = *writer_guard {
                if let Err(e) = file.write_all(line.as_bytes()) {
                    warn!("failed to write to findings log: {}", e);
                }
            }
        }
    }

    pub fn close(&self) {
        if let Ok(mut writer_guard) = self.writer.lock() {
            if let Some(ref mut file) = *writer_guard {
                let _ = file.flush();
            }
            *writer_guard = None;
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for FindingsLog {
    fn drop(&mut self) {
        self.close();
    }
}
