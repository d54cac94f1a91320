use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "spendrecon")]
#[command(
    about = "Scrapes IT Dashboard agency spending, downloads business case PDFs, and cross-checks them against the table"
)]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/spendrecon.toml
    #[arg(long)]
    pub init: bool,

    /// Dashboard landing page URL (overrides config)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Agency whose investment table is scraped (overrides config)
    #[arg(short, long)]
    pub agency: Option<String>,

    /// Output directory for workbook, PDFs and exports (overrides config)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Workbook filename, must end in .xlsx (overrides config)
    #[arg(long)]
    pub workbook: Option<String>,

    /// Additional export format alongside the workbook: 'csv' or 'json'
    #[arg(short = 'f', long)]
    pub export: Option<String>,

    /// Log reconciliation findings to a separate CSV file
    #[arg(long, default_value = "false")]
    pub log_findings: bool,

    /// Export detailed run log to a file
    #[arg(long)]
    pub log_file: Option<String>,

    /// Verbose logging (use -v for INFO, -vv for DEBUG with page details)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(format) = &self.export {
            if format != "csv" && format != "json" {
                return Err(format!(
                    "Invalid export format '{}'. Must be 'csv' or 'json'",
                    format
                ));
            }
        }
        if let Some(workbook) = &self.workbook {
            if !workbook.ends_with(".xlsx") {
                return Err(format!(
                    "Invalid workbook name '{}'. Must end with .xlsx",
                    workbook
                ));
            }
        }
        if let Some(url) = &self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("Invalid URL '{}'. Must start with http(s)://", url));
            }
        }
        Ok(())
    }
}
