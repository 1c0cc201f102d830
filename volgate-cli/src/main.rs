//! volgate CLI - Command-line interface
//!
//! Runs the admission-gated volume service, and talks to one as a client.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::common::GlobalArgs;
use commands::config::ConfigCommands;
use commands::remote::{DeleteArgs, SubmitArgs};
use commands::serve::ServeArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "volgate")]
#[command(version = volgate::VERSION)]
#[command(about = "Admission control and async job tracking for storage orchestration", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the volume service behind the admission gate
    Serve(ServeArgs),

    /// Check that the server is reachable
    Hello,

    /// Submit a create request and wait for the job to finish
    Submit(SubmitArgs),

    /// Delete a resource and wait for the job to finish
    Delete(DeleteArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &global).await,
        Commands::Hello => commands::remote::run_hello(&global).await,
        Commands::Submit(args) => commands::remote::run_submit(args, &global).await,
        Commands::Delete(args) => commands::remote::run_delete(args, &global).await,
        Commands::Config { command } => commands::config::run(command, &global),
    }
}
