//! CLI parser and dispatch.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};
use crate::shutdown::ShutdownFlag;

#[derive(Parser)]
#[command(name = "lc0acquire")]
#[command(about = "Mirror and normalize the Lc0 match PGN archive")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, short = 't', global = true, env = "LC0ACQUIRE_TARGET")]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the listing pages and record every match found
    Scrape {
        /// Number of listing pages to walk
        #[arg(long)]
        pages: Option<u32>,
        /// Concurrent listing requests
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Download pending match payloads
    Download {
        /// Maximum entries to attempt (0 = all pending)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Concurrent downloads
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Rewrite downloaded games into monthly aggregate files
    Process,

    /// Scrape, download and process in sequence
    All {
        /// Maximum entries to download (0 = all pending)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Show counts by status
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read-only reports over the store and artifact directories
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Totals, date range and status distribution
    Overview,
    /// Per-month totals
    Monthly,
    /// Failure counts and the most recent failed attempts
    Failures {
        /// Number of recent failures to list
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Sizes of downloaded and processed files
    Files,
    /// Look up matches by id or date fragment
    Lookup {
        /// Match id
        #[arg(long, conflicts_with = "date", required_unless_present = "date")]
        id: Option<i64>,
        /// Substring of the scraped date, e.g. 2021-03
        #[arg(long)]
        date: Option<String>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        target: cli.target,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    let shutdown = ShutdownFlag::new();
    if matches!(
        cli.command,
        Commands::Scrape { .. } | Commands::Download { .. } | Commands::Process | Commands::All { .. }
    ) {
        shutdown.install_signal_handler();
    }

    match cli.command {
        Commands::Scrape { pages, concurrency } => {
            commands::scrape::cmd_scrape(&settings, pages, concurrency, &shutdown).await
        }
        Commands::Download { limit, concurrency } => {
            commands::download::cmd_download(&settings, limit, concurrency, &shutdown).await
        }
        Commands::Process => commands::process::cmd_process(&settings, &shutdown).await,
        Commands::All { limit } => {
            commands::scrape::cmd_scrape(&settings, None, None, &shutdown).await?;
            if shutdown.is_requested() {
                return Ok(());
            }
            commands::download::cmd_download(&settings, limit, None, &shutdown).await?;
            if shutdown.is_requested() {
                return Ok(());
            }
            commands::process::cmd_process(&settings, &shutdown).await
        }
        Commands::Stats { json } => commands::stats::cmd_stats(&settings, json).await,
        Commands::Report { command } => match command {
            ReportCommands::Overview => commands::report::cmd_overview(&settings).await,
            ReportCommands::Monthly => commands::report::cmd_monthly(&settings).await,
            ReportCommands::Failures { limit } => {
                commands::report::cmd_failures(&settings, limit).await
            }
            ReportCommands::Files => commands::report::cmd_files(&settings).await,
            ReportCommands::Lookup { id, date } => {
                commands::report::cmd_lookup(&settings, id, date.as_deref()).await
            }
        },
    }
}
