//! Shared scripted doubles for the browser seam.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use spendrecon::browser::{BrowserDriver, DriverError, PageHandle, ScrapedRow};

/// Page whose responses are scripted up front. Selector matching is by
/// substring so tests do not need to repeat full CSS paths.
#[derive(Default)]
pub struct ScriptedPage {
    /// Substrings of selectors that never become visible.
    pub hidden: Vec<String>,
    /// Substring-keyed texts returned by get_text / get_texts.
    pub texts: HashMap<&'static str, Vec<String>>,
    pub rows: Vec<ScrapedRow>,
    pub clicked: Mutex<Vec<String>>,
}

impl ScriptedPage {
    fn lookup(&self, css: &str) -> Option<&Vec<String>> {
        self.texts
            .iter()
            .find(|(key, _)| css.contains(*key))
            .map(|(_, v)| v)
    }
}

impl PageHandle for ScriptedPage {
    fn wait_visible(&self, css: &str, timeout: Duration) -> Result<(), DriverError> {
        if self.hidden.iter().any(|h| css.contains(h.as_str())) {
            return Err(DriverError::VisibilityTimeout {
                locator: css.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        Ok(())
    }

    fn click(&self, css: &str) -> Result<(), DriverError> {
        self.clicked.lock().unwrap().push(css.to_string());
        Ok(())
    }

    fn click_link_by_text(&self, text: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.clicked.lock().unwrap().push(format!("link:{}", text));
        Ok(())
    }

    fn get_text(&self, css: &str) -> Result<String, DriverError> {
        Ok(self
            .lookup(css)
            .and_then(|v| v.first().cloned())
            .unwrap_or_default())
    }

    fn get_texts(&self, css: &str) -> Result<Vec<String>, DriverError> {
        Ok(self.lookup(css).cloned().unwrap_or_default())
    }

    fn select_value(&self, css: &str, value: &str) -> Result<(), DriverError> {
        self.clicked
            .lock()
            .unwrap()
            .push(format!("select:{}={}", css, value));
        Ok(())
    }

    fn scrape_rows(&self, _row_css: &str) -> Result<Vec<ScrapedRow>, DriverError> {
        Ok(self.rows.clone())
    }
}

/// How a scripted download page behaves once its trigger is clicked.
#[derive(Clone)]
pub enum DownloadBehavior {
    /// Write a partial marker, then rename to the final file.
    Complete { file_name: String, delay_ms: u64 },
    /// Write the final file directly, no marker ever appears.
    CompleteWithoutMarker { file_name: String },
    /// Write a partial marker that never resolves.
    Stall { file_name: String },
    /// Do nothing at all.
    Nothing,
}

pub struct DownloadPage {
    download_dir: PathBuf,
    behavior: DownloadBehavior,
    trigger_visible: bool,
}

impl DownloadPage {
    pub fn new(download_dir: PathBuf, behavior: DownloadBehavior, trigger_visible: bool) -> Self {
        Self {
            download_dir,
            behavior,
            trigger_visible,
        }
    }
}

impl PageHandle for DownloadPage {
    fn wait_visible(&self, css: &str, timeout: Duration) -> Result<(), DriverError> {
        if self.trigger_visible {
            Ok(())
        } else {
            Err(DriverError::VisibilityTimeout {
                locator: css.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    }

    fn click(&self, _css: &str) -> Result<(), DriverError> {
        let dir = self.download_dir.clone();
        match self.behavior.clone() {
            DownloadBehavior::Complete { file_name, delay_ms } => {
                std::thread::spawn(move || {
                    let partial = dir.join(format!("{}.crdownload", file_name));
                    fs::write(&partial, b"partial").unwrap();
                    std::thread::sleep(Duration::from_millis(delay_ms));
                    fs::rename(&partial, dir.join(&file_name)).unwrap();
                });
            }
            DownloadBehavior::CompleteWithoutMarker { file_name } => {
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    fs::write(dir.join(&file_name), b"%PDF-1.4").unwrap();
                });
            }
            DownloadBehavior::Stall { file_name } => {
                let partial = dir.join(format!("{}.crdownload", file_name));
                fs::write(partial, b"partial").unwrap();
            }
            DownloadBehavior::Nothing => {}
        }
        Ok(())
    }

    fn click_link_by_text(&self, _text: &str, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    fn get_text(&self, _css: &str) -> Result<String, DriverError> {
        Ok(String::new())
    }

    fn get_texts(&self, _css: &str) -> Result<Vec<String>, DriverError> {
        Ok(Vec::new())
    }

    fn select_value(&self, _css: &str, _value: &str) -> Result<(), DriverError> {
        Ok(())
    }

    fn scrape_rows(&self, _row_css: &str) -> Result<Vec<ScrapedRow>, DriverError> {
        Ok(Vec::new())
    }
}

/// Driver that opens [`DownloadPage`]s scripted with one behavior.
pub struct DownloadDriver {
    pub download_dir: PathBuf,
    pub behavior: DownloadBehavior,
    pub trigger_visible: bool,
    pub opened: Mutex<Vec<String>>,
}

impl DownloadDriver {
    pub fn new(download_dir: PathBuf, behavior: DownloadBehavior) -> Self {
        Self {
            download_dir,
            behavior,
            trigger_visible: true,
            opened: Mutex::new(Vec::new()),
        }
    }
}

impl BrowserDriver for DownloadDriver {
    fn open_page(&self, url: &str) -> Result<Box<dyn PageHandle + '_>, DriverError> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(Box::new(DownloadPage {
            download_dir: self.download_dir.clone(),
            behavior: self.behavior.clone(),
            trigger_visible: self.trigger_visible,
        }))
    }
}

/// Eight-column investment row with a summary link in the first cell.
pub fn investment_cells(uii: &str, title: &str) -> Vec<String> {
    vec![
        uii.to_string(),
        "Bureau of Fiscal Service".to_string(),
        title.to_string(),
        "12.34".to_string(),
        "02 - IT Infrastructure".to_string(),
        "4".to_string(),
        "3".to_string(),
    ]
}
