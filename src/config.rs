//! Configuration management for spendrecon
//!
//! All configuration is loaded from `./config/spendrecon.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the
//! config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/spendrecon.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/spendrecon.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' must be greater than zero")]
    ZeroBound { field: String },

    #[error("Configuration field '{field}' is malformed: {reason}")]
    Malformed { field: String, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub browser: BrowserConfig,
    pub download: DownloadConfig,
    pub pdf: PdfConfig,
    pub output: OutputConfig,
}

/// Dashboard target: landing page and the agency whose table is scraped
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    pub agency: String,
}

/// Page-element wait bounds
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    pub visibility_timeout_secs: u64,
}

/// Download completion detection bounds
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub partial_suffix: String,
}

/// Business case PDF extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    pub page_number: u32,
    #[serde(default)]
    pub pdftotext_path: Option<String>,
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
    pub workbook: String,
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target.url.starts_with("http://") && !self.target.url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl {
                field: "target.url".to_string(),
                url: self.target.url.clone(),
            });
        }
        if self.target.agency.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "target.agency".to_string(),
            });
        }

        if self.browser.visibility_timeout_secs == 0 {
            return Err(ConfigError::ZeroBound {
                field: "browser.visibility_timeout_secs".to_string(),
            });
        }
        if self.download.timeout_secs == 0 {
            return Err(ConfigError::ZeroBound {
                field: "download.timeout_secs".to_string(),
            });
        }
        if self.download.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroBound {
                field: "download.poll_interval_ms".to_string(),
            });
        }
        if !self.download.partial_suffix.starts_with('.') {
            return Err(ConfigError::Malformed {
                field: "download.partial_suffix".to_string(),
                reason: "must start with '.'".to_string(),
            });
        }

        if self.pdf.page_number == 0 {
            return Err(ConfigError::ZeroBound {
                field: "pdf.page_number".to_string(),
            });
        }

        if self.output.directory.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.directory".to_string(),
            });
        }
        if !self.output.workbook.ends_with(".xlsx") {
            return Err(ConfigError::Malformed {
                field: "output.workbook".to_string(),
                reason: "must end with .xlsx".to_string(),
            });
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        atty::is(atty::Stream::Stdin)
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
