//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use clap::Subcommand;
use volgate::config::{config_file_path, ConfigFile};

use super::common::GlobalArgs;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration (file plus command-line overrides)
    Show,

    /// Write a default configuration file if none exists
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, global: &GlobalArgs) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Init { force } => run_init(global, force),
    }
}

fn target_path(global: &GlobalArgs) -> std::path::PathBuf {
    global.config.clone().unwrap_or_else(config_file_path)
}

fn run_path(global: &GlobalArgs) -> Result<(), CliError> {
    let path = target_path(global);
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist, defaults are in effect)");
    }
    Ok(())
}

fn run_show(global: &GlobalArgs) -> Result<(), CliError> {
    let config = global.load_config()?;

    println!("[server]");
    println!("listen = {}", config.server.listen);
    println!("url = {}", config.server.url);
    println!();
    println!("[admission]");
    println!("max_concurrent = {}", config.admission.max_concurrent);
    println!("cleanup_interval_secs = {}", config.admission.cleanup_interval_secs);
    println!("entry_ttl_secs = {}", config.admission.entry_ttl_secs);
    println!();
    println!("[client]");
    println!("user = {}", config.client.user);
    println!(
        "secret = {}",
        if config.client.secret.is_some() { "(set)" } else { "(not set)" }
    );
    println!("max_retries = {}", config.client.max_retries);
    println!("backoff_min_ms = {}", config.client.backoff_min_ms);
    println!("backoff_max_ms = {}", config.client.backoff_max_ms);
    println!("poll_interval_ms = {}", config.client.poll_interval_ms);
    println!("max_concurrent_requests = {}", config.client.max_concurrent_requests);
    println!();
    println!("[logging]");
    println!("directory = {}", config.logging.directory);
    println!("file = {}", config.logging.file);
    Ok(())
}

fn run_init(global: &GlobalArgs, force: bool) -> Result<(), CliError> {
    let path = target_path(global);
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    ConfigFile::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
