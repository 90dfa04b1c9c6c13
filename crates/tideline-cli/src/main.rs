#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, coded, render_error};
use std::env;
use tideline_core::config::resolve_config;
use tideline_core::error::ErrorCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tl: casino offer reconciliation and cruise ledger",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Offers",
        about = "Sync and list casino offers",
        long_about = "Prune offer payloads (exclusions, TIER night cap), refetch empty offers, and store them per profile."
    )]
    Offers(cmd::offers::OffersArgs),

    #[command(
        next_help_heading = "Offers",
        about = "Manage favorite sailings",
        long_about = "Add, remove, toggle, and check saved sailings across profiles and the combined view."
    )]
    Favorites(cmd::favorites::FavoritesArgs),

    #[command(
        next_help_heading = "Ledger",
        about = "Reconcile cruise financials",
        long_about = "Merge receipt analytics, the statement cross reference, and the financial summary into one record per cruise."
    )]
    Financials(cmd::financials::FinancialsArgs),

    #[command(
        next_help_heading = "Profiles",
        about = "Profile ids and linked accounts",
        long_about = "Assign stable numeric profile ids, link accounts, and rebuild the combined profile."
    )]
    Profiles(cmd::profiles::ProfilesArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TIDELINE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "tideline=debug,info"
        } else {
            "tideline=info,warn"
        })
    });

    let format = env::var("TIDELINE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = match resolve_config(&project_root, cli.json) {
        Ok(config) => config,
        Err(err) => {
            let mode = if cli.json { OutputMode::Json } else { OutputMode::Text };
            let err = coded(
                ErrorCode::ConfigParseError,
                format!("{}: {err:#}", ErrorCode::ConfigParseError.message()),
            );
            render_error(mode, &CliError::from(&err))?;
            std::process::exit(1);
        }
    };
    let output = OutputMode::from_resolved(&config.resolved_output);

    let command_result = match &cli.command {
        Commands::Offers(args) => cmd::offers::run_offers(args, output, &config, cli.quiet),
        Commands::Favorites(args) => cmd::favorites::run_favorites(args, output, &config),
        Commands::Financials(args) => cmd::financials::run_financials(args, output),
        Commands::Profiles(args) => cmd::profiles::run_profiles(args, output, &config),
    };

    if let Err(err) = command_result {
        render_error(output, &CliError::from(&err))?;
        std::process::exit(1);
    }
    Ok(())
}
