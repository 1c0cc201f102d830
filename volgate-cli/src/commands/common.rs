//! Common types and utilities shared across CLI commands.

use clap::Args;
use std::path::PathBuf;
use volgate::client::ClusterClient;
use volgate::config::ConfigFile;

use crate::error::CliError;

/// Connection options shared by every command.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Config file to use instead of ~/.volgate/config.ini
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides [server] url)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Token issuer (overrides [client] user)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Signing secret (overrides [client] secret)
    #[arg(long, global = true, env = "VOLGATE_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

impl GlobalArgs {
    /// Loads the config file and applies command-line overrides.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        let mut config = match &self.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        if let Some(server) = &self.server {
            config.server.url = server.trim_end_matches('/').to_string();
        }
        if let Some(user) = &self.user {
            config.client.user = user.clone();
        }
        if let Some(secret) = &self.secret {
            config.client.secret = Some(secret.clone());
        }
        Ok(config)
    }
}

/// Builds a client from the loaded config; unsigned when no secret is set.
pub fn build_client(config: &ConfigFile) -> Result<ClusterClient, CliError> {
    let client_config = config.client_config();
    let client = match &config.client.secret {
        Some(secret) => ClusterClient::new(
            &config.server.url,
            &config.client.user,
            secret,
            client_config,
        )?,
        None => ClusterClient::without_auth(&config.server.url, client_config)?,
    };
    Ok(client)
}
