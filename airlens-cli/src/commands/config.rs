//! `airlens config`: show where configuration lives and what is in effect.

use std::path::Path;

use airlens::config::{config_file_path, ConfigFile};
use clap::Subcommand;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print every effective setting, defaults included, as INI
    Show,
}

/// Run a config subcommand.
///
/// `override_path` is the global `--config` flag, if given.
pub fn run(
    command: ConfigCommands,
    config: &ConfigFile,
    override_path: Option<&Path>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(override_path),
        ConfigCommands::Show => run_show(config),
    }
}

fn run_path(override_path: Option<&Path>) -> Result<(), CliError> {
    let path = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("(file does not exist; defaults are in effect)");
    }
    Ok(())
}

fn run_show(config: &ConfigFile) -> Result<(), CliError> {
    // Surface invalid combinations before printing them as if usable
    config.to_engine_config()?;

    let mut stdout = std::io::stdout();
    config
        .to_ini()
        .write_to(&mut stdout)
        .map_err(|e| CliError::Output(e.to_string()))
}
