use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,   // Only progress bar and final summary
    Summary = 1,  // High-level run progress (default)
    Detailed = 2, // Per-row steps, warnings
    Debug = 3,    // Everything
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

/// Operator-facing run log: timestamped messages routed around the progress
/// bar, buffered for optional export to a log file, plus run metadata for
/// the final summary.
pub struct TaskLogger {
    verbosity: VerbosityLevel,
    progress_bar: Mutex<Option<ProgressBar>>,
    metadata: Mutex<RunMetadata>,
    log_buffer: Mutex<Vec<String>>,
    log_file_path: Option<String>,
}

#[derive(Default)]
struct RunMetadata {
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    agencies_captured: usize,
    rows_scraped: usize,
    documents_downloaded: usize,
    downloads_skipped: usize,
    documents_unreadable: usize,
    extraction_faults: usize,
    mismatches: usize,
    output_file: String,
}

impl TaskLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Mutex::new(None),
            metadata: Mutex::new(RunMetadata::default()),
            log_buffer: Mutex::new(Vec::new()),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: String) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    pub fn error(&self, message: &str) {
        // Errors are never hidden, regardless of verbosity.
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!(
            "[{}] {}: {}",
            Local::now().format("%H:%M:%S%.3f"),
            level,
            message
        );

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Route through the progress bar when active so the bar keeps its
        // fixed position.
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }
        eprintln!("{}", msg);
    }

    pub fn start_progress(&self, total_steps: u64) {
        let pb = ProgressBar::new(total_steps);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("Processing rows...");

        if let Ok(mut guard) = self.progress_bar.lock() {
            *guard = Some(pb);
        }
    }

    pub fn update_progress(&self, message: &str) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message.to_string());
            }
        }
    }

    pub fn advance_progress(&self, steps: u64) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(steps);
            }
        }
    }

    pub fn finish_progress(&self, final_message: &str) {
        if let Ok(mut guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", final_message);
        }
    }

    pub fn record_started(&self) {
        self.metadata.lock().unwrap().start_time = Some(SystemTime::now());
    }

    pub fn record_finished(&self) {
        self.metadata.lock().unwrap().end_time = Some(SystemTime::now());
    }

    pub fn record_agencies_captured(&self, count: usize) {
        self.metadata.lock().unwrap().agencies_captured = count;
    }

    pub fn record_rows_scraped(&self, count: usize) {
        self.metadata.lock().unwrap().rows_scraped = count;
    }

    pub fn record_document_downloaded(&self) {
        self.metadata.lock().unwrap().documents_downloaded += 1;
    }

    pub fn record_download_skipped(&self) {
        self.metadata.lock().unwrap().downloads_skipped += 1;
    }

    pub fn record_document_unreadable(&self) {
        self.metadata.lock().unwrap().documents_unreadable += 1;
    }

    pub fn record_extraction_fault(&self) {
        self.metadata.lock().unwrap().extraction_faults += 1;
    }

    pub fn record_mismatch(&self) {
        self.metadata.lock().unwrap().mismatches += 1;
    }

    pub fn record_output_file(&self, path: &str) {
        self.metadata.lock().unwrap().output_file = path.to_string();
    }

    pub fn print_final_summary(&self) {
        let metadata = self.metadata.lock().unwrap();

        println!("\n=== RUN SUMMARY ===");
        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            let duration = end.duration_since(start).unwrap_or_default();
            println!("Run Duration: {:.2}s", duration.as_secs_f64());
        }
        println!("Agencies Captured: {}", metadata.agencies_captured);
        println!("Investment Rows Scraped: {}", metadata.rows_scraped);
        println!("Documents Downloaded: {}", metadata.documents_downloaded);
        println!("Downloads Skipped (timeout): {}", metadata.downloads_skipped);
        println!("Documents Unreadable: {}", metadata.documents_unreadable);
        println!("Extraction Faults: {}", metadata.extraction_faults);
        println!("Reconciliation Mismatches: {}", metadata.mismatches);
        if !metadata.output_file.is_empty() {
            println!("Workbook Saved: {}", metadata.output_file);
        }
        println!("===================\n");

        if metadata.mismatches == 0 && metadata.extraction_faults == 0 {
            println!("✅ Run completed. All reconciled documents matched their table rows.");
        } else {
            println!(
                "✅ Run completed with findings: {} mismatches, {} extraction faults.",
                metadata.mismatches, metadata.extraction_faults
            );
        }
    }

    /// Export all buffered messages to the configured log file.
    pub fn export_logs(&self) -> anyhow::Result<()> {
        if let Some(ref log_file_path) = self.log_file_path {
            if let Ok(buffer) = self.log_buffer.lock() {
                if let Some(parent) = Path::new(log_file_path).parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(log_file_path)?;
                for entry in buffer.iter() {
                    writeln!(file, "{}", entry)?;
                }
                file.flush()?;
            }
        }
        Ok(())
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }
}
