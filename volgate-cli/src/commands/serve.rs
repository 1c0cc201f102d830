//! `volgate serve`: the volume service behind the admission gate.

use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use volgate::admission::AdmissionController;
use volgate::auth::TokenVerifier;
use volgate::jobs::{self, JobService};
use volgate::logging::init_logging;

use super::common::GlobalArgs;
use crate::error::CliError;

/// Arguments for `volgate serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server] listen)
    #[arg(long)]
    pub listen: Option<String>,

    /// Simulated cluster capacity in GB
    #[arg(long, default_value = "1024")]
    pub capacity_gb: u64,

    /// How long each simulated job runs, in milliseconds
    #[arg(long, default_value = "2000")]
    pub work_ms: u64,

    /// Accept requests without a signed token even if a secret is configured
    #[arg(long)]
    pub insecure: bool,
}

/// Run the server until Ctrl-C.
pub async fn run(args: ServeArgs, global: &GlobalArgs) -> Result<(), CliError> {
    let config = global.load_config()?;
    let _logging_guard = init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let listen = args.listen.unwrap_or_else(|| config.server.listen.clone());
    let admission = config.admission_config();
    info!(
        version = volgate::VERSION,
        max_concurrent = admission.max_concurrent(),
        entry_ttl_secs = admission.entry_ttl().as_secs(),
        "Starting volgate"
    );

    let verifier = match (&config.client.secret, args.insecure) {
        (Some(secret), false) => Some(Arc::new(
            TokenVerifier::new().with_key(config.client.user.clone(), secret),
        )),
        _ => {
            warn!("No token verification, every request is accepted unauthenticated");
            None
        }
    };

    let controller = Arc::new(AdmissionController::new(admission));
    let sweeper = controller.start_sweeper();
    let service = Arc::new(JobService::new(
        args.capacity_gb,
        Duration::from_millis(args.work_ms),
    ));
    let app = jobs::app(Arc::clone(&service), Arc::clone(&controller), verifier);

    let listener = TcpListener::bind(&listen).await.map_err(CliError::Serve)?;
    println!("volgate listening on {}", listen);

    jobs::serve(listener, app, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    })
    .await
    .map_err(CliError::Serve)?;

    sweeper.join().await;
    let stats = controller.stats();
    info!(
        admitted = stats.admitted,
        rejected = stats.rejected,
        completed = stats.completed,
        purged = stats.purged,
        rejection_rate = %format!("{:.1}%", stats.rejection_rate() * 100.0),
        uncollected_jobs = service.job_count(),
        "Admission totals"
    );
    Ok(())
}
