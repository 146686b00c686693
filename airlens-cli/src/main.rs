//! AirLens CLI
//!
//! Runs the PM2.5 estimation engine from the command line:
//!
//! ```text
//! airlens estimate --image sky.jpg --lat 37.5665 --lon 126.978 \
//!     --stations stations.json --aod 0.2 --humidity 70
//! airlens features --image sky.jpg
//! airlens config show
//! ```

mod commands;
mod error;
mod output;

use std::path::{Path, PathBuf};

use airlens::config::ConfigFile;
use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::estimate::EstimateArgs;
use commands::features::FeaturesArgs;
use error::CliError;

/// Log filter used with `--verbose`.
const VERBOSE_FILTER: &str = "airlens=debug";

#[derive(Debug, Parser)]
#[command(name = "airlens", version, about = "Estimate PM2.5 from a sky photo, nearby stations and satellite AOD")]
struct Cli {
    /// Verbose logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one estimation across all tiers with input
    Estimate(EstimateArgs),

    /// Print the features extracted from an image and the camera tier result
    Features(FeaturesArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {}", console::style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;

    let filter = if cli.verbose {
        VERBOSE_FILTER
    } else {
        config.logging.filter.as_str()
    };
    let _log_guard = airlens::logging::init_logging(filter, config.logging.directory.as_deref())?;

    match cli.command {
        Commands::Estimate(args) => commands::estimate::run(args, &config),
        Commands::Features(args) => commands::features::run(args, &config),
        Commands::Config { action } => commands::config::run(action, &config, cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load()?),
    }
}
