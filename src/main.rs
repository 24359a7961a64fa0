mod commands;
mod config;
mod feed;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{FilterArgs, RangeArgs, SourceArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clubcal", version)]
#[command(about = "Preview the club calendar the way members and visitors see it")]
struct Cli {
    /// Log engine decisions (refresh, backfill, ingestion) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the events the viewer can see
    Events {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Print JSON instead of an agenda
        #[arg(long)]
        json: bool,

        /// Also count the events each filter stage hid
        #[arg(long)]
        explain: bool,
    },
    /// Export the visible events as an .ics file
    Export {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// File to write (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Keep polling the feed, refetching once data is stale
    Watch {
        #[command(flatten)]
        filters: FilterArgs,

        /// How often to check, e.g. "30s" or "2m"
        #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
        every: Duration,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Events {
            range,
            filters,
            json,
            explain,
        } => commands::events::run(&cli.source, range, filters, json, explain).await,
        Commands::Export {
            range,
            filters,
            output,
        } => commands::export::run(&cli.source, range, filters, output).await,
        Commands::Watch { filters, every } => commands::watch::run(&cli.source, filters, every).await,
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config::init(&cli.source, force),
            ConfigAction::Show => commands::config::show(&cli.source),
        },
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
