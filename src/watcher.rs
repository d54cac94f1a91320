//! Download completion detection.
//!
//! Chrome offers no completion event for navigations that end in a file
//! download, so the watcher infers completion by polling the download
//! directory: an in-flight download carries the browser's partial-download
//! suffix, and the suffix disappearing (or a new unsuffixed name showing up)
//! means the write finished. Only sound while there is exactly one writer in
//! the directory, which the orchestrator guarantees by issuing downloads
//! strictly one at a time.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Suffix Chrome appends to in-progress downloads.
pub const PARTIAL_SUFFIX: &str = ".crdownload";

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("download did not complete within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("failed to read download directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Polls a directory for the completion of one asynchronous download.
#[derive(Debug, Clone)]
pub struct DownloadWatcher {
    poll_interval: Duration,
    marker_suffix: String,
}

impl Default for DownloadWatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), PARTIAL_SUFFIX)
    }
}

impl DownloadWatcher {
    pub fn new(poll_interval: Duration, marker_suffix: impl Into<String>) -> Self {
        Self {
            poll_interval,
            marker_suffix: marker_suffix.into(),
        }
    }

    /// Block until the download in `dir` completes, returning the final
    /// filename.
    ///
    /// `prior_latest` is the name of the most-recently-modified entry
    /// observed *before* the download was triggered; it anchors the fallback
    /// path for downloads that finish between polls, too fast for their
    /// partial-suffixed name to be seen at all.
    ///
    /// The countdown decrements once per poll, so with the default
    /// one-second interval `timeout_secs` is a wall-clock budget. The
    /// directory is only ever read, never mutated; an empty directory means
    /// "no file yet" and polling continues.
    pub fn await_completion(
        &self,
        dir: &Path,
        prior_latest: Option<&str>,
        timeout_secs: u64,
    ) -> Result<String, WatchError> {
        let mut remaining = timeout_secs as i64;
        let mut started = false;

        loop {
            if let Some(name) = latest_entry(dir)? {
                if name.ends_with(&self.marker_suffix) {
                    if !started {
                        debug!("download started: {}", name);
                    }
                    started = true;
                } else if started {
                    debug!("download finished: {}", name);
                    return Ok(name);
                } else if prior_latest != Some(name.as_str()) {
                    // Completed between polls; the marker was never observed.
                    debug!("download finished (fast path): {}", name);
                    return Ok(name);
                }
            }

            if remaining <= 0 {
                return Err(WatchError::Timeout {
                    seconds: timeout_secs,
                });
            }
            std::thread::sleep(self.poll_interval);
            remaining -= 1;
        }
    }
}

/// Name of the most-recently-modified file in `dir`, or `None` when the
/// directory is empty. Subdirectories are ignored.
pub fn latest_entry(dir: &Path) -> std::io::Result<Option<String>> {
    let mut latest: Option<(std::time::SystemTime, String)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        let name = entry.file_name().to_string_lossy().to_string();
        match &latest {
            Some((t, _)) if *t >= modified => {}
            _ => latest = Some((modified, name)),
        }
    }

    Ok(latest.map(|(_, name)| name))
}
