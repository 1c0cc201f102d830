//! Client commands against a running server.

use clap::Args;
use volgate::client::TransportResponse;

use super::common::{build_client, GlobalArgs};
use crate::error::CliError;

/// Arguments for `volgate submit`.
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Resource path to POST to, e.g. /volumes
    #[arg(long, default_value = "/volumes")]
    pub path: String,

    /// JSON request body
    #[arg(long, default_value = "{}")]
    pub body: String,
}

/// Arguments for `volgate delete`.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Resource path to DELETE, e.g. /volumes/<id>
    #[arg(long)]
    pub path: String,
}

/// Check that the server answers.
pub async fn run_hello(global: &GlobalArgs) -> Result<(), CliError> {
    let config = global.load_config()?;
    let client = build_client(&config)?;
    client.hello().await?;
    println!("Server at {} is up", config.server.url);
    Ok(())
}

/// POST a request and wait for its job.
pub async fn run_submit(args: SubmitArgs, global: &GlobalArgs) -> Result<(), CliError> {
    serde_json::from_str::<serde_json::Value>(&args.body)
        .map_err(|e| CliError::Config(format!("--body is not valid JSON: {}", e)))?;

    let config = global.load_config()?;
    let client = build_client(&config)?;
    let response = client.create(&args.path, args.body.into()).await?;
    print_response(&response);
    Ok(())
}

/// DELETE a resource and wait for its job.
pub async fn run_delete(args: DeleteArgs, global: &GlobalArgs) -> Result<(), CliError> {
    let config = global.load_config()?;
    let client = build_client(&config)?;
    let response = client.delete(&args.path).await?;
    print_response(&response);
    Ok(())
}

fn print_response(response: &TransportResponse) {
    let body = response.text();
    if body.is_empty() {
        println!("{}", response.status);
        return;
    }
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or(body)
        ),
        Err(_) => println!("{}", body),
    }
}
