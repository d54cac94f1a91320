//! Per-row business case download.
//!
//! Each download runs in its own tab so the investments table page keeps its
//! state, and downloads are issued strictly one at a time: the watcher's
//! latest-file heuristic is only meaningful while the browser is the sole
//! writer in the directory and at most one download is in flight. Callers
//! must not overlap calls to [`DownloadOrchestrator::download_document`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::browser::{BrowserDriver, DriverError};
use crate::watcher::{latest_entry, DownloadWatcher, WatchError};

/// Download link on a business case summary page.
const PDF_TRIGGER: &str = "#business-case-pdf a";

/// Non-fatal: the affected row is skipped and the run continues.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download trigger not visible: {0}")]
    TriggerTimeout(String),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Driver(DriverError),
}

pub struct DownloadOrchestrator<'a> {
    driver: &'a dyn BrowserDriver,
    watcher: DownloadWatcher,
    download_dir: PathBuf,
    visibility_timeout: Duration,
    download_timeout_secs: u64,
}

impl<'a> DownloadOrchestrator<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        watcher: DownloadWatcher,
        download_dir: PathBuf,
        visibility_timeout: Duration,
        download_timeout_secs: u64,
    ) -> Self {
        Self {
            driver,
            watcher,
            download_dir,
            visibility_timeout,
            download_timeout_secs,
        }
    }

    /// Navigate to `link` in an isolated tab, trigger the PDF download and
    /// block until it lands in the download directory. Returns the final
    /// filename. The tab is torn down on every path, including timeouts.
    pub fn download_document(&self, link: &str) -> Result<String, DownloadError> {
        // Snapshot before navigating: the baseline for the watcher's
        // fast-completion fallback.
        let prior_latest = latest_entry(&self.download_dir).map_err(WatchError::Io)?;
        debug!("latest file before download: {:?}", prior_latest);

        let page = self
            .driver
            .open_page(link)
            .map_err(DownloadError::Driver)?;

        page.wait_visible(PDF_TRIGGER, self.visibility_timeout)
            .map_err(|e| DownloadError::TriggerTimeout(e.to_string()))?;
        page.click(PDF_TRIGGER).map_err(DownloadError::Driver)?;

        let name = self.watcher.await_completion(
            &self.download_dir,
            prior_latest.as_deref(),
            self.download_timeout_secs,
        )?;

        info!("downloaded {} from {}", name, link);
        Ok(name)
        // `page` drops here (and on every early return), closing the tab.
    }
}
