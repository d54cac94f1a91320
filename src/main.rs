// Allow dead code for functions that are part of the API surface but not used in all code paths
#![allow(dead_code)]

use anyhow::Result;
use clap::Parser;
use std::fs;
use std::path::Path;

mod browser;
mod cli;
mod config;
mod download;
mod export;
mod fields;
mod findings;
mod investment;
mod logger;
mod pdftext;
mod pipeline;
mod reconcile;
mod scrape;
mod watcher;
mod workbook;

use browser::ChromeDriver;
use cli::Cli;
use config::AppConfig;
use findings::FindingsLog;
use logger::{TaskLogger, VerbosityLevel};
use pdftext::Pdftotext;
use pipeline::Pipeline;
use workbook::XlsxWorkbook;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init flag first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run spendrecon again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(msg) = cli.validate() {
        eprintln!("❌ {}", msg);
        std::process::exit(1);
    }

    // Load configuration
    let mut app_config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            // Config not found - prompt to create if interactive
            match AppConfig::prompt_create_config() {
                Ok(Some(created_path)) => {
                    println!("✅ Created default configuration file at: {}", created_path.display());
                    println!("   Edit this file to customize settings, then run spendrecon again.");
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", path.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // CLI flags override config values
    if let Some(url) = cli.url {
        app_config.target.url = url;
    }
    if let Some(agency) = cli.agency {
        app_config.target.agency = agency;
    }
    if let Some(output_dir) = cli.output_dir {
        app_config.output.directory = output_dir;
    }
    if let Some(workbook) = cli.workbook {
        app_config.output.workbook = workbook;
    }
    if let Err(e) = app_config.validate() {
        eprintln!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    // Route tracing through the environment filter; -v levels widen it.
    let default_filter = match cli.verbose {
        0 => "spendrecon=warn",
        1 => "spendrecon=info",
        _ => "spendrecon=debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    let logger = match &cli.log_file {
        Some(path) => TaskLogger::with_log_file(verbosity, path.clone()),
        None => TaskLogger::new(verbosity),
    };

    let output_dir = Path::new(&app_config.output.directory);
    fs::create_dir_all(output_dir)?;

    // Fail fast on missing external tooling before touching the network.
    let text_provider = match Pdftotext::locate(app_config.pdf.pdftotext_path.as_deref()) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    eprintln!("✅ ENABLED: PDF text extraction (pdftotext)");

    // Open the findings log before launching Chrome so an early exit here
    // has no browser process to tear down.
    let findings = FindingsLog::new(
        &app_config.output.directory,
        &app_config.target.agency,
        cli.log_findings,
    );
    if findings.is_enabled() {
        if let Err(e) = findings.initialize() {
            eprintln!("❌ Failed to create findings log: {}", e);
            std::process::exit(1);
        }
        eprintln!("✅ ENABLED: Findings log at {}", findings.file_path());
    }

    let driver = match ChromeDriver::launch(output_dir) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("❌ Failed to launch browser: {}", e);
            std::process::exit(1);
        }
    };
    eprintln!("✅ ENABLED: Headless Chrome automation");
    eprintln!();

    let mut writer = XlsxWorkbook::new();
    let result = {
        let mut pipeline = Pipeline::new(
            &driver,
            &text_provider,
            &mut writer,
            &logger,
            &findings,
            &app_config,
            output_dir.to_path_buf(),
        );
        pipeline.run()
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            logger.error(&format!("Run failed: {}", e));
            if logger.is_log_export_enabled() {
                let _ = logger.export_logs();
            }
            findings.close();
            // exit() skips Drop; the Chrome process dies with the driver,
            // so it must go down before the process does.
            drop(driver);
            std::process::exit(1);
        }
    };

    // Optional flat exports next to the workbook
    if let Some(format) = &cli.export {
        let stem = app_config.output.workbook.trim_end_matches(".xlsx");
        let export_path = output_dir.join(format!("{}.{}", stem, format));
        let export_path = export_path.to_string_lossy();
        let result = match format.as_str() {
            "csv" => export::export_csv(&summary.rows, &export_path),
            "json" => export::export_json(&summary.rows, &export_path),
            _ => unreachable!("validated by Cli::validate"),
        };
        match result {
            Ok(()) => logger.info(&format!("Exported {} to {}", format, export_path)),
            Err(e) => logger.error(&format!("Export failed: {}", e)),
        }
    }

    findings.close();
    logger.print_final_summary();

    if logger.is_log_export_enabled() {
        if let Err(e) = logger.export_logs() {
            eprintln!("⚠️  Failed to export logs: {}", e);
        }
    }

    Ok(())
}
