//! Browser automation seam.
//!
//! The pipeline talks to the page through the [`BrowserDriver`] and
//! [`PageHandle`] traits; `ChromeDriver` is the production implementation
//! over headless Chrome. Tests substitute scripted implementations, so no
//! component beyond this module touches the CDP directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("element '{locator}' not visible within {seconds}s")]
    VisibilityTimeout { locator: String, seconds: u64 },

    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),
}

/// Cell texts and optional first-cell hyperlink of one table row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedRow {
    pub cells: Vec<String>,
    pub link: Option<String>,
}

/// One open page (tab). Dropping the handle tears the tab down, so an
/// isolated download context is released on every exit path.
pub trait PageHandle {
    /// Bounded wait until `css` matches a rendered element.
    fn wait_visible(&self, css: &str, timeout: Duration) -> Result<(), DriverError>;

    fn click(&self, css: &str) -> Result<(), DriverError>;

    /// Bounded wait for a link containing `text`, then click it.
    fn click_link_by_text(&self, text: &str, timeout: Duration) -> Result<(), DriverError>;

    fn get_text(&self, css: &str) -> Result<String, DriverError>;

    /// Inner text of every element matching `css`, in document order.
    fn get_texts(&self, css: &str) -> Result<Vec<String>, DriverError>;

    /// Set a `<select>` control's value and fire its change event.
    fn select_value(&self, css: &str, value: &str) -> Result<(), DriverError>;

    /// Capture every row matching `row_css`: cell texts in column order plus
    /// the first cell's hyperlink, if any.
    fn scrape_rows(&self, row_css: &str) -> Result<Vec<ScrapedRow>, DriverError>;
}

pub trait BrowserDriver {
    /// Open a new tab navigated to `url`, with downloads routed to the
    /// driver's download directory.
    fn open_page(&self, url: &str) -> Result<Box<dyn PageHandle + '_>, DriverError>;
}

/// Production driver over a single headless Chrome process. The process dies
/// with the driver, so an aborted run never leaks a browser.
pub struct ChromeDriver {
    browser: Browser,
    download_dir: PathBuf,
}

impl ChromeDriver {
    /// Launch headless Chrome. Disables the sandbox inside containers
    /// (detected via /.dockerenv or SPENDRECON_CONTAINER) and honors a
    /// CHROME_PATH override; each instance gets its own debug port to avoid
    /// conflicts with a concurrently running browser.
    pub fn launch(download_dir: &Path) -> anyhow::Result<Self> {
        let is_container = std::env::var("SPENDRECON_CONTAINER").is_ok()
            || Path::new("/.dockerenv").exists();

        let chrome_path: Option<PathBuf> = std::env::var("CHROME_PATH").ok().map(PathBuf::from);

        static PORT_COUNTER: std::sync::atomic::AtomicU16 =
            std::sync::atomic::AtomicU16::new(9222);
        let debug_port = PORT_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let options = LaunchOptions::default_builder()
            .sandbox(!is_container)
            .path(chrome_path)
            .port(Some(debug_port))
            .build()
            .map_err(|e| anyhow!("Failed to build Chrome launch options: {}", e))?;

        let browser = Browser::new(options)
            .map_err(|e| anyhow!("Failed to launch headless Chrome: {}", e))?;

        Ok(Self {
            browser,
            download_dir: download_dir.to_path_buf(),
        })
    }
}

impl BrowserDriver for ChromeDriver {
    fn open_page(&self, url: &str) -> Result<Box<dyn PageHandle + '_>, DriverError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create browser tab: {}", e))?;

        // Route downloads triggered from this tab into the output directory.
        tab.call_method(Page::SetDownloadBehavior {
            behavior: Page::SetDownloadBehaviorBehaviorOption::Allow,
            download_path: Some(self.download_dir.to_string_lossy().to_string()),
        })
        .map_err(|e| anyhow!("Failed to set download behavior: {}", e))?;

        tab.navigate_to(url)
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
        tab.wait_until_navigated()
            .map_err(|e| anyhow!("Page failed to load for {}: {}", url, e))?;

        debug!("opened tab at {}", url);
        Ok(Box::new(ChromePage { tab }))
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    fn wait_for(&self, css: &str, timeout: Duration) -> Result<Element<'_>, DriverError> {
        self.tab
            .wait_for_element_with_custom_timeout(css, timeout)
            .map_err(|_| DriverError::VisibilityTimeout {
                locator: css.to_string(),
                seconds: timeout.as_secs(),
            })
    }

    fn element_attr(element: &Element<'_>, name: &str) -> Option<String> {
        let attributes = element.get_attributes().ok()??;
        // CDP returns a flat [name, value, name, value, ...] list.
        attributes
            .chunks(2)
            .find(|pair| pair.first().map(String::as_str) == Some(name))
            .and_then(|pair| pair.get(1).cloned())
    }
}

impl PageHandle for ChromePage {
    fn wait_visible(&self, css: &str, timeout: Duration) -> Result<(), DriverError> {
        self.wait_for(css, timeout).map(|_| ())
    }

    fn click(&self, css: &str) -> Result<(), DriverError> {
        let element = self
            .tab
            .find_element(css)
            .map_err(|e| anyhow!("Element '{}' not found: {}", css, e))?;
        element
            .click()
            .map_err(|e| anyhow!("Failed to click '{}': {}", css, e))?;
        Ok(())
    }

    fn click_link_by_text(&self, text: &str, timeout: Duration) -> Result<(), DriverError> {
        let xpath = format!("//a[contains(normalize-space(.), '{}')]", text);
        self.tab.set_default_timeout(timeout);
        let element = self
            .tab
            .wait_for_xpath(&xpath)
            .map_err(|_| DriverError::VisibilityTimeout {
                locator: format!("link:{}", text),
                seconds: timeout.as_secs(),
            })?;
        element
            .click()
            .map_err(|e| anyhow!("Failed to click link '{}': {}", text, e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| anyhow!("Navigation after clicking '{}' failed: {}", text, e))?;
        Ok(())
    }

    fn get_text(&self, css: &str) -> Result<String, DriverError> {
        let element = self
            .tab
            .find_element(css)
            .map_err(|e| anyhow!("Element '{}' not found: {}", css, e))?;
        let text = element
            .get_inner_text()
            .map_err(|e| anyhow!("Failed to read text of '{}': {}", css, e))?;
        Ok(text)
    }

    fn get_texts(&self, css: &str) -> Result<Vec<String>, DriverError> {
        let elements = self
            .tab
            .find_elements(css)
            .map_err(|e| anyhow!("Elements '{}' not found: {}", css, e))?;
        let mut texts = Vec::with_capacity(elements.len());
        for element in &elements {
            texts.push(
                element
                    .get_inner_text()
                    .map_err(|e| anyhow!("Failed to read element text: {}", e))?,
            );
        }
        Ok(texts)
    }

    fn select_value(&self, css: &str, value: &str) -> Result<(), DriverError> {
        let element = self
            .tab
            .find_element(css)
            .map_err(|e| anyhow!("Select '{}' not found: {}", css, e))?;
        // DataTables listens for a change event on its length control.
        let js = format!(
            "function() {{ this.value = '{}'; this.dispatchEvent(new Event('change', {{ bubbles: true }})); }}",
            value
        );
        element
            .call_js_fn(&js, vec![], false)
            .map_err(|e| anyhow!("Failed to set '{}' to '{}': {}", css, value, e))?;
        Ok(())
    }

    fn scrape_rows(&self, row_css: &str) -> Result<Vec<ScrapedRow>, DriverError> {
        let rows = self
            .tab
            .find_elements(row_css)
            .map_err(|e| anyhow!("Rows '{}' not found: {}", row_css, e))?;

        let mut scraped = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells = row
                .find_elements("td")
                .map_err(|e| anyhow!("Failed to read row cells: {}", e))?;

            let mut texts = Vec::with_capacity(cells.len());
            for cell in &cells {
                texts.push(
                    cell.get_inner_text()
                        .map_err(|e| anyhow!("Failed to read cell text: {}", e))?,
                );
            }

            let link = cells
                .first()
                .and_then(|cell| cell.find_elements("a").ok())
                .and_then(|anchors| {
                    anchors
                        .first()
                        .and_then(|a| Self::element_attr(a, "href"))
                });

            scraped.push(ScrapedRow { cells: texts, link });
        }
        Ok(scraped)
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        // Teardown must run on every path, including timeouts mid-download.
        let _ = self.tab.close(true);
    }
}
