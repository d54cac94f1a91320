//! Document-to-text conversion.
//!
//! Field extraction works on raw page text; turning a PDF into that text is
//! isolated behind [`DocumentTextProvider`]. The production implementation
//! shells out to poppler's pdftotext with `-f/-l` bounds so only the page of
//! interest is converted.

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Result};

pub trait DocumentTextProvider {
    /// Raw text of one page (1-based) of the document at `path`.
    fn page_text(&self, path: &Path, page: u32) -> Result<String>;
}

pub struct Pdftotext {
    binary: std::path::PathBuf,
}

impl Pdftotext {
    /// Resolve the pdftotext binary, preferring an explicitly configured
    /// path over PATH lookup.
    pub fn locate(configured: Option<&str>) -> Result<Self> {
        let binary = which::which(configured.unwrap_or("pdftotext")).map_err(|_| {
            anyhow!(
                "pdftotext not installed (poppler-utils); install with: \
                 apt install poppler-utils / brew install poppler"
            )
        })?;
        Ok(Self { binary })
    }
}

impl DocumentTextProvider for Pdftotext {
    fn page_text(&self, path: &Path, page: u32) -> Result<String> {
        let file = path
            .to_str()
            .ok_or_else(|| anyhow!("invalid file path: {}", path.display()))?;
        let page_arg = page.to_string();

        let output = Command::new(&self.binary)
            .args(["-f", &page_arg, "-l", &page_arg, "-layout", file, "-"])
            .output()
            .map_err(|e| anyhow!("failed to run pdftotext: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "pdftotext failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        if text.trim().is_empty() {
            return Err(anyhow!(
                "{}: page {} yielded no text (scanned/image-only?)",
                path.display(),
                page
            ));
        }

        Ok(text)
    }
}
