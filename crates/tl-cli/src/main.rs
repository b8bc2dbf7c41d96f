//! ttylog CLI
//!
//! Follows a device's TTY log over SSH (`tail -f`), reconnecting when the
//! link drops, and manages the recordings and snapshots it saves.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttylog::commands::{self, StreamOptions};

#[derive(Parser)]
#[command(name = "ttylog")]
#[command(author, version, about = "Stream a device's TTY log over SSH")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "TTYLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the remote log file, reconnecting automatically
    Stream {
        /// Device host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// SSH port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// SSH username (overrides config)
        #[arg(short, long)]
        user: Option<String>,
        /// Remote file to follow (overrides config)
        #[arg(short, long)]
        file: Option<String>,
        /// Record the stream into rotating files in the logs directory
        #[arg(short, long)]
        record: bool,
        /// Print lines without arrival timestamps
        #[arg(long)]
        no_timestamps: bool,
        /// Save a snapshot of the buffered lines when streaming ends
        #[arg(long)]
        save_on_exit: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage saved recordings and snapshots
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show config file path
    Path,
    /// Get specific config value
    Get { key: String },
}

#[derive(Subcommand)]
enum LogsAction {
    /// List saved logs, newest first
    List,
    /// Print a saved log
    Show { name: String },
    /// Copy a saved log to another location
    Export { name: String, dest: PathBuf },
    /// Delete a saved log
    Delete { name: String },
    /// Show the logs directory
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    // stdout carries streamed lines; diagnostics go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Stream {
            host,
            port,
            user,
            file,
            record,
            no_timestamps,
            save_on_exit,
        } => {
            let config = commands::load_effective_config(config_path)?;
            let options = StreamOptions {
                host,
                port,
                user,
                file,
                record,
                no_timestamps,
                save_on_exit,
            };
            commands::stream_command(config, options).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(config_path)?,
            ConfigAction::Init { force } => commands::config_init(config_path, force)?,
            ConfigAction::Path => commands::config_path(config_path)?,
            ConfigAction::Get { key } => commands::config_get(config_path, &key)?,
        },

        Commands::Logs { action } => match action {
            LogsAction::List => commands::logs_list(config_path)?,
            LogsAction::Show { name } => commands::logs_show(config_path, &name)?,
            LogsAction::Export { name, dest } => {
                commands::logs_export(config_path, &name, &dest)?
            }
            LogsAction::Delete { name } => commands::logs_delete(config_path, &name)?,
            LogsAction::Path => commands::logs_path(config_path)?,
        },
    }

    Ok(())
}
