//! Command-line surface for the `magpie` binary.

use clap::{Parser, Subcommand, ValueEnum};
use magpie_common::RunDefaults;
use std::path::PathBuf;
use url::Url;

#[derive(Parser)]
#[command(name = "magpie")]
#[command(about = "Keyword research across social platforms and the open web", version)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./magpie.yaml, then
    /// ~/.config/magpie/magpie.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory for daily log files (overrides MAGPIE_LOG_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    /// Emit logs as JSON lines instead of text
    #[arg(long, global = true)]
    pub json_logs: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect, analyze and export posts for one or more keywords
    Run {
        /// Keywords to research
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,
        /// Seed URL to crawl alongside the keyword search (repeatable)
        #[arg(long = "site", value_name = "URL")]
        sites: Vec<Url>,
        /// How many trailing days of posts to cover
        #[arg(long, default_value_t = RunDefaults::default().days_back)]
        days_back: u32,
        /// Cap on collected posts per keyword, per platform
        #[arg(long, default_value_t = RunDefaults::default().max_items_per_keyword)]
        max_items: u32,
        /// Export format for the results files
        #[arg(long, value_enum, default_value_t = ExportFormat::Both)]
        format: ExportFormat,
    },
    /// Search previously stored posts
    Report {
        /// Full-text query over stored post text
        query: String,
        /// Maximum number of rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// Show per-keyword and per-platform rollups from the store
    Stats,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
    Both,
}

impl ExportFormat {
    pub fn wants_json(self) -> bool {
        matches!(self, ExportFormat::Json | ExportFormat::Both)
    }

    pub fn wants_csv(self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::Both)
    }
}
